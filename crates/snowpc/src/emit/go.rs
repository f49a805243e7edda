//! The Go target.
//!
//! For every declaration this emits the visible type, its positional
//! internal twin, the `Export`/`Import` converters between them, the codec
//! hooks the runtime calls, and the RPC client/server plumbing for
//! protocols. Generated code links against the snowpack RPC runtime.

use std::io::Write;

use crate::ast::{
    Case, Decorators, DerivedType, Enum, Import, Language, Method, Protocol, Root, Struct, Type,
    TypeDecl, Typedef, Variant,
};
use crate::emit::{b64_encode, BaseEmitter, Emitter, Metadata};
use crate::inventory::Inventory;

const NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");
const URL: &str = env!("CARGO_PKG_REPOSITORY");

pub struct GoEmitter<W: Write> {
    base: BaseEmitter<W>,
}

impl<W: Write> GoEmitter<W> {
    pub fn new(md: Metadata, dst: W) -> GoEmitter<W> {
        GoEmitter {
            base: BaseEmitter::new(md, dst),
        }
    }

    /// Emit a whole file: preamble, every statement, postamble.
    pub fn emit(&mut self, r: &Root) {
        self.emit_preamble(r);
        r.emit(self);
        self.emit_postamble();
    }

    fn output_line(&mut self, s: &str) {
        self.base.output_line(s);
    }

    fn output_frag(&mut self, s: &str) {
        self.base.output_frag(s);
    }

    fn empty_line(&mut self) {
        self.base.empty_line();
    }

    fn tab(&mut self) {
        self.base.tab();
    }

    fn untab(&mut self) {
        self.base.untab();
    }

    fn emit_decorators(&mut self, dec: &Decorators) {
        self.base.emit_doc(&dec.doc);
    }

    fn emit_preamble(&mut self, r: &Root) {
        self.output_line(&format!(
            "// Auto-generated to Go types and interfaces using {} {} ({})",
            NAME, VERSION, URL
        ));
        let inv = Inventory::collect(r);
        let input_name = self.base.metadata().input_name.clone();
        let package = self.base.metadata().package.clone();
        self.output_line(&format!("//  Input file:{}", input_name));
        self.empty_line();
        self.output_line(&format!("package {}", package));
        self.empty_line();
        self.output_line("import (");
        self.tab();
        for imp in inv.imports() {
            self.output_line(&format!("\"{}\"", imp));
        }
        self.untab();
        self.output_line(")");
        self.empty_line();
    }

    fn emit_postamble(&mut self) {
        if self.base.uniques().is_empty() {
            return;
        }
        self.empty_line();
        self.output_line("func init() {");
        self.tab();
        let uniques = self.base.uniques().to_vec();
        for u in uniques {
            self.output_line(&format!("rpc.AddUnique({})", u));
        }
        self.untab();
        self.output_line("}");
    }

    fn export_symbol(&self, s: &str) -> String {
        let mut chars = s.chars();
        match chars.next() {
            None => String::new(),
            Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        }
    }

    fn private_symbol(&self, s: &str) -> String {
        let mut chars = s.chars();
        match chars.next() {
            None => String::new(),
            Some(c) => c.to_lowercase().collect::<String>() + chars.as_str(),
        }
    }

    fn internal_struct_name(&self, s: &str) -> String {
        format!("{}Internal__", s)
    }

    /// The receiver variable: the first letter of the type name,
    /// lower-cased.
    fn this_variable_name(&self, s: &str) -> String {
        s.chars()
            .next()
            .map(|c| c.to_lowercase().to_string())
            .unwrap_or_default()
    }

    fn snake_to_camel_case(&self, s: &str) -> String {
        s.to_lowercase()
            .split('_')
            .map(|p| self.export_symbol(p))
            .collect()
    }

    fn base_type_names(&self, decl: &TypeDecl) -> (String, String, String) {
        let nm = &decl.name;
        (
            self.this_variable_name(nm),
            self.internal_struct_name(nm),
            self.export_symbol(nm),
        )
    }

    fn emit_enum_constants(&mut self, e: &Enum) {
        let exsym = self.export_symbol(&e.decl.name);
        self.output_line("const (");
        self.tab();
        for v in &e.values {
            self.output_line(&format!("{}_{} {} = {}", exsym, v.name, exsym, v.num));
        }
        self.untab();
        self.output_line(")");
    }

    fn emit_enum_map(&mut self, e: &Enum) {
        let exsym = self.export_symbol(&e.decl.name);
        self.output_line(&format!("var {}Map = map[string]{}{{", exsym, exsym));
        self.tab();
        for v in &e.values {
            self.output_line(&format!("\"{}\" : {},", v.name, v.num));
        }
        self.untab();
        self.output_line("}");
    }

    fn emit_enum_rev_map(&mut self, e: &Enum) {
        let exsym = self.export_symbol(&e.decl.name);
        self.output_line(&format!("var {}RevMap = map[{}]string{{", exsym, exsym));
        self.tab();
        for v in &e.values {
            self.output_line(&format!("{} : \"{}\",", v.num, v.name));
        }
        self.untab();
        self.output_line("}");
    }

    fn emit_enum_import(&mut self, e: &Enum) {
        let (tv, isn, es) = self.base_type_names(&e.decl);
        self.output_line(&format!("func ({} {}) Import() {} {{", tv, isn, es));
        self.tab();
        self.output_line(&format!("return {}({})", es, tv));
        self.untab();
        self.output_line("}");
    }

    fn emit_enum_export(&mut self, e: &Enum) {
        let (tv, isn, es) = self.base_type_names(&e.decl);
        self.output_line(&format!("func ({} {}) Export() *{} {{", tv, es, isn));
        self.tab();
        self.output_line(&format!("return ((*{})(&{}))", isn, tv));
        self.untab();
        self.output_line("}");
    }

    fn emit_derived_prefix(&mut self, d: &DerivedType) {
        if let Some(from) = &d.imported_from {
            let frag = format!("{}.", from);
            self.output_frag(&frag);
        }
    }

    fn emit_typedef_internal(&mut self, t: &Typedef) {
        let isn = self.internal_struct_name(&t.decl.name);
        self.output_frag(&format!("type {} ", isn));
        t.ty.emit_internal(self);
        self.empty_line();
    }

    fn emit_typedef_export(&mut self, t: &Typedef) {
        let (tv, isn, exsym) = self.base_type_names(&t.decl);
        self.output_line(&format!("func ({} {}) Export() *{} {{", tv, exsym, isn));
        self.tab();
        self.output_frag("tmp := ((");
        t.ty.emit(self);
        self.output_line(&format!(")({}))", tv));
        self.output_frag(&format!("return ((*{})(", isn));
        t.ty.emit_export(self, "tmp");
        self.output_line("))");
        self.untab();
        self.output_line("}");
    }

    fn emit_typedef_import(&mut self, t: &Typedef) {
        let (tv, isn, exsym) = self.base_type_names(&t.decl);
        self.output_line(&format!("func ({} {}) Import() {} {{", tv, isn, exsym));
        self.tab();
        self.output_frag("tmp := (");
        t.ty.emit_internal(self);
        self.output_line(&format!(")({})", tv));
        self.output_frag(&format!("return {}(", exsym));
        t.ty.emit_import(self, "&tmp");
        self.output_line(")");
        self.untab();
        self.output_line("}");
    }

    fn emit_codec(&mut self, decl: &TypeDecl) {
        let (tv, isn, exsym) = self.base_type_names(decl);

        self.output_line(&format!(
            "func ({} *{}) Encode(enc rpc.Encoder) error {{",
            tv, exsym
        ));
        self.tab();
        self.output_line(&format!("return enc.Encode({}.Export())", tv));
        self.untab();
        self.output_line("}");
        self.empty_line();

        self.output_line(&format!(
            "func ({} *{}) Decode(dec rpc.Decoder) error {{",
            tv, exsym
        ));
        self.tab();
        self.output_line(&format!("var tmp {}", isn));
        self.output_line("err := dec.Decode(&tmp)");
        self.output_line("if err != nil {");
        self.tab();
        self.output_line("return err");
        self.untab();
        self.output_line("}");
        self.output_line(&format!("*{} = tmp.Import()", tv));
        self.output_line("return nil");
        self.untab();
        self.output_line("}");
        self.empty_line();
    }

    fn emit_id(&mut self, decl: &TypeDecl) {
        let unique = match &decl.unique {
            Some(u) => u.clone(),
            None => return,
        };
        let (tv, _, exsym) = self.base_type_names(decl);
        let tuid = "TypeUniqueID";
        let nm = format!("{}{}", exsym, tuid);
        self.output_line(&format!("var {} = rpc.{}({})", nm, tuid, unique.0));
        self.output_line(&format!(
            "func ({} *{}) Get{}() rpc.{} {{",
            tv, exsym, tuid, tuid
        ));
        self.tab();
        self.output_line(&format!("return {}", nm));
        self.untab();
        self.output_line("}");
        self.base.add_unique(nm);
    }

    fn emit_bytes_typedef(&mut self, t: &Typedef) {
        let (tv, _, exsym) = self.base_type_names(&t.decl);
        self.output_line(&format!("func ({} {}) Bytes() []byte {{", tv, exsym));
        self.tab();
        self.output_frag("return ");
        t.ty.emit_bytes(self, &tv);
        self.empty_line();
        self.untab();
        self.output_line("}");
    }

    fn emit_bytes_nil(&mut self, decl: &TypeDecl) {
        let (tv, _, exsym) = self.base_type_names(decl);
        self.output_line(&format!(
            "func ({} *{}) Bytes() []byte {{ return nil }}",
            tv, exsym
        ));
    }

    fn output_params_maybe(&mut self, p: &str) {
        if !p.is_empty() {
            self.output_frag(&format!("({})", p));
        }
    }

    fn emit_import_signature(&mut self, t: &Type) {
        self.output_frag("(func (x *");
        t.emit_internal(self);
        self.output_frag(") (ret ");
        t.emit(self);
        self.output_line(") {");
        self.tab();
    }

    fn emit_import_preamble(&mut self, t: &Type) {
        self.emit_import_signature(t);
        self.output_line("if x == nil {");
        self.tab();
        self.output_line("return ret");
        self.untab();
        self.output_line("}");
    }

    fn emit_import_primitive_type(&mut self, t: &Type, param: &str) {
        self.emit_import_preamble(t);
        self.output_line("return *x");
        self.untab();
        self.output_frag("})");
        self.output_params_maybe(param);
    }

    fn emit_export_primitive_type(&mut self, t: &Type, param: &str) {
        // A bound parameter is already addressable, so skip the closure.
        if !param.is_empty() {
            self.output_frag(&format!("&{}", param));
            return;
        }
        self.output_frag("(func (x ");
        t.emit_internal(self);
        self.output_frag(") * ");
        t.emit(self);
        self.output_line(" {");
        self.tab();
        self.output_line("return &x");
        self.untab();
        self.output_frag("})");
    }

    fn emit_msgpack_struct_opts(&mut self) {
        self.output_line(
            "_struct struct{} `codec:\",toarray\"` //lint:ignore U1000 msgpack internal field",
        );
    }

    fn emit_struct_visible(&mut self, s: &Struct) {
        let t = self.export_symbol(&s.decl.name);
        self.output_line(&format!("type {} struct {{", t));
        self.tab();
        for f in &s.fields {
            let nm = self.export_symbol(&f.name);
            self.output_frag(&format!("{} ", nm));
            f.ty.emit(self);
            self.empty_line();
        }
        self.untab();
        self.output_line("}");
    }

    fn emit_struct_internal(&mut self, s: &Struct) {
        let isn = self.internal_struct_name(&s.decl.name);
        self.output_line(&format!("type {} struct {{", isn));
        self.tab();
        self.emit_msgpack_struct_opts();
        let mut i = 0u64;
        for f in &s.fields {
            while i < f.pos {
                self.output_line(&format!("Deprecated{} *struct{{}}", i));
                i += 1;
            }
            let nm = self.export_symbol(&f.name);
            self.output_frag(&format!("{} ", nm));
            f.ty.make_optional().emit_internal(self);
            self.empty_line();
            i += 1;
        }
        self.untab();
        self.output_line("}");
    }

    fn emit_struct_import(&mut self, s: &Struct) {
        let (tv, isn, exsym) = self.base_type_names(&s.decl);
        self.output_line(&format!("func ({} {}) Import() {} {{", tv, isn, exsym));
        self.tab();
        self.output_line(&format!("return {} {{", exsym));
        self.tab();
        for f in &s.fields {
            let fnm = self.export_symbol(&f.name);
            self.output_frag(&format!("{}: ", fnm));
            f.ty.emit_import(self, &format!("{}.{}", tv, fnm));
            self.output_line(",");
        }
        self.untab();
        self.output_line("}");
        self.untab();
        self.output_line("}");
    }

    fn emit_struct_export(&mut self, s: &Struct) {
        let (tv, isn, exsym) = self.base_type_names(&s.decl);
        self.output_line(&format!("func ({} {}) Export() *{} {{", tv, exsym, isn));
        self.tab();
        self.output_line(&format!("return &{} {{", isn));
        self.tab();
        for f in &s.fields {
            let fnm = self.export_symbol(&f.name);
            self.output_frag(&format!("{}: ", fnm));
            f.ty.emit_export(self, &format!("{}.{}", tv, fnm));
            self.output_line(",");
        }
        self.untab();
        self.output_line("}");
        self.untab();
        self.output_line("}");
    }

    fn variant_case_position_to_variable(&self, i: u64) -> String {
        format!("F_{}__", i)
    }

    fn switch_struct_name(&self) -> &'static str {
        "Switch__"
    }

    fn switch_internal_struct_type(&self, s: &str) -> String {
        format!("{}InternalSwitch__", s)
    }

    fn emit_variant_struct_case(&mut self, c: &Case, is_internal: bool) {
        let p = match c.position {
            Some(p) => p,
            None => return,
        };
        let field = self.variant_case_position_to_variable(p);
        self.output_frag(&format!("{} *", field));
        if is_internal {
            c.ty.emit_internal(self);
            self.output_line(&format!(" `codec:\"{}\"`", b64_encode(p)));
        } else {
            c.ty.emit(self);
            self.output_line(&format!(" `json:\"f{},omitempty\"`", p));
        }
    }

    fn emit_variant_top_struct(&mut self, v: &Variant) {
        let snm = self.export_symbol(&v.decl.name);
        let sv = self.export_symbol(&v.switch_var);
        self.output_line(&format!("type {} struct {{", snm));
        self.tab();
        self.output_frag(&format!("{} ", sv));
        v.switch_type.emit(self);
        self.empty_line();
        for c in &v.cases {
            self.emit_variant_struct_case(c, false);
        }
        self.untab();
        self.output_line("}");
    }

    fn emit_variant_internal_struct(&mut self, v: &Variant) {
        let ism = self.internal_struct_name(&v.decl.name);
        let sv = self.export_symbol(&v.switch_var);
        self.output_line(&format!("type {} struct {{", ism));
        self.tab();
        self.emit_msgpack_struct_opts();
        self.output_frag(&format!("{} ", sv));
        v.switch_type.emit(self);
        self.empty_line();
        self.output_line(&format!(
            "{} {}",
            self.switch_struct_name(),
            self.switch_internal_struct_type(&v.decl.name)
        ));
        self.empty_line();
        self.untab();
        self.output_line("}");
    }

    fn emit_variant_internal_switch_struct(&mut self, v: &Variant) {
        let nm = self.switch_internal_struct_type(&v.decl.name);
        self.output_line(&format!("type {} struct {{", nm));
        self.tab();
        self.output_line(
            "_struct struct{} `codec:\",omitempty\"` //lint:ignore U1000 msgpack internal field",
        );
        for c in &v.cases {
            self.emit_variant_struct_case(c, true);
        }
        self.untab();
        self.output_line("}");
    }

    fn case_data_access(&self, v: &Variant, c: &Case) -> String {
        match c.position {
            None => String::new(),
            Some(p) => format!(
                "{}.{}",
                self.this_variable_name(&v.decl.name),
                self.variant_case_position_to_variable(p)
            ),
        }
    }

    fn emit_variant_switch_accessor_case(&mut self, v: &Variant, c: &Case) {
        if c.labels.is_empty() {
            self.output_line("default:");
        } else {
            let mut labels = Vec::new();
            for l in &c.labels {
                labels.push(l.to_case_string(self, &v.switch_type));
            }
            self.output_line(&format!("case {}:", labels.join(", ")));
        }
        self.tab();
        match c.position {
            None => self.output_line("break"),
            Some(p) => {
                let cda = self.case_data_access(v, c);
                self.output_line(&format!("if {} == nil {{", cda));
                self.tab();
                self.output_line(&format!(
                    "return ret, errors.New(\"unexpected nil case for {}\")",
                    self.variant_case_position_to_variable(p)
                ));
                self.untab();
                self.output_line("}");
            }
        }
        self.untab();
    }

    fn emit_variant_switch_accessor(&mut self, v: &Variant) {
        let tv = self.this_variable_name(&v.decl.name);
        let exsym = self.export_symbol(&v.decl.name);
        let lclsv = self.export_symbol(&v.switch_var);
        let sv = format!("{}.{}", tv, lclsv);

        self.output_frag(&format!("func ({} {}) Get{}() (ret ", tv, exsym, lclsv));
        v.switch_type.emit(self);
        self.output_line(", err error) {");
        self.tab();
        self.output_line(&format!("switch {} {{", sv));
        self.tab();
        for c in &v.cases {
            self.emit_variant_switch_accessor_case(v, c);
        }
        // A declared default arm falls through; without one, an
        // unrecognized discriminator is an error.
        if !v.cases.iter().any(|c| c.labels.is_empty()) {
            self.output_line("default:");
            self.tab();
            self.output_line(&format!(
                "return ret, fmt.Errorf(\"unexpected switch value (%v)\", {})",
                sv
            ));
            self.untab();
        }
        self.untab();
        self.output_line("}");
        self.output_line(&format!("return {}, nil", sv));
        self.untab();
        self.output_line("}");
    }

    fn switch_value(&self, v: &Variant) -> String {
        format!(
            "{}.{}",
            self.this_variable_name(&v.decl.name),
            self.export_symbol(&v.switch_var)
        )
    }

    fn emit_variant_data_accessors_case(&mut self, v: &Variant, c: &Case) {
        let cda = self.case_data_access(v, c);
        if cda.is_empty() {
            return;
        }

        // Getter name paired with the label it must match; the default
        // arm's getter matches unconditionally.
        let mut pairs: Vec<(String, String)> = Vec::new();
        if c.labels.is_empty() {
            pairs.push(("Default".to_owned(), String::new()));
        } else {
            for l in &c.labels {
                pairs.push((
                    l.getter_method_name(self),
                    l.to_case_string(self, &v.switch_type),
                ));
            }
        }

        let sv = self.switch_value(v);
        let exsym = self.export_symbol(&v.decl.name);
        let tv = self.this_variable_name(&v.decl.name);

        for (getter, label) in pairs {
            self.output_frag(&format!("func ({} {}) {}() ", tv, exsym, getter));
            c.ty.emit(self);
            self.output_line(" {");
            self.tab();
            self.output_line(&format!("if {} == nil {{", cda));
            self.tab();
            self.output_line("panic(\"unexpected nil case; should have been checked\")");
            self.untab();
            self.output_line("}");
            if !label.is_empty() {
                match label.as_str() {
                    "true" => self.output_line(&format!("if !{} {{", sv)),
                    "false" => self.output_line(&format!("if {} {{", sv)),
                    _ => self.output_line(&format!("if {} != {} {{", sv, label)),
                }
                self.tab();
                self.output_line(&format!(
                    "panic(fmt.Sprintf(\"unexpected switch value (%v) when {} is called\", {}))",
                    getter, sv
                ));
                self.untab();
                self.output_line("}");
            }
            self.output_line(&format!("return *{}", cda));
            self.untab();
            self.output_line("}");
        }
    }

    fn emit_variant_data_accessors(&mut self, v: &Variant) {
        for c in &v.cases {
            self.emit_variant_data_accessors_case(v, c);
        }
    }

    fn emit_variant_constructor_case(&mut self, v: &Variant, c: &Case) {
        let tt = self.export_symbol(&v.decl.name);
        let def_constructor = format!("New{}Default", tt);

        // Constructor name paired with the discriminator expression it
        // hard-codes; the default constructor takes it as a parameter.
        let mut pairs: Vec<(String, String)> = Vec::new();
        if c.labels.is_empty() {
            pairs.push((def_constructor, "s".to_owned()));
        } else {
            for l in &c.labels {
                pairs.push((
                    l.constructor_name(self, &v.decl.name),
                    l.to_case_string(self, &v.switch_type),
                ));
            }
        }
        for (constructor, label) in pairs {
            self.output_frag(&format!("func {}(", constructor));
            let mut did_output = false;
            if c.labels.is_empty() {
                self.output_frag("s ");
                v.switch_type.emit(self);
                did_output = true;
            }
            if c.has_data() {
                if did_output {
                    self.output_frag(", ");
                }
                self.output_frag("v ");
                c.ty.emit(self);
            }
            self.output_line(&format!(") {} {{", tt));
            self.tab();
            self.output_line(&format!("return {}{{", tt));
            self.tab();
            self.output_line(&format!(
                "{}: {},",
                self.export_symbol(&v.switch_var),
                label
            ));
            if c.has_data() {
                if let Some(p) = c.position {
                    let cda = self.variant_case_position_to_variable(p);
                    self.output_line(&format!("{}: &v,", cda));
                }
            }
            self.untab();
            self.output_line("}");
            self.untab();
            self.output_line("}");
        }
    }

    fn emit_variant_constructors(&mut self, v: &Variant) {
        for c in &v.cases {
            self.emit_variant_constructor_case(v, c);
        }
    }

    fn emit_variant_import_case(&mut self, v: &Variant, c: &Case) {
        let p = match c.position {
            Some(p) => p,
            None => return,
        };
        let tv = self.this_variable_name(&v.decl.name);
        let field = self.variant_case_position_to_variable(p);
        self.output_frag(&format!("{}: ", field));
        let source = format!("{}.{}.{}", tv, self.switch_struct_name(), field);

        // Internal and visible forms coincide for primitives.
        if c.ty.is_primitive() {
            self.output_line(&format!("{},", source));
            return;
        }

        self.output_frag("(func (x *");
        c.ty.emit_internal(self);
        self.output_frag(") *");
        c.ty.emit(self);
        self.output_line(" {");
        self.tab();
        self.output_line("if x == nil {");
        self.tab();
        self.output_line("return nil");
        self.untab();
        self.output_line("}");
        self.output_frag("tmp := ");
        c.ty.emit_import(self, "x");
        self.empty_line();
        self.output_line("return &tmp");
        self.untab();
        self.output_line(&format!("}})({}),", source));
    }

    fn emit_variant_import(&mut self, v: &Variant) {
        let (tv, isn, exsym) = self.base_type_names(&v.decl);
        self.output_line(&format!("func ({} {}) Import() {} {{", tv, isn, exsym));
        self.tab();
        self.output_line(&format!("return {}{{", exsym));
        self.tab();
        let sv = self.export_symbol(&v.switch_var);
        self.output_line(&format!("{}: {}.{},", sv, tv, sv));
        for c in &v.cases {
            self.emit_variant_import_case(v, c);
        }
        self.untab();
        self.output_line("}");
        self.untab();
        self.output_line("}");
    }

    fn emit_variant_export_case(&mut self, v: &Variant, c: &Case) {
        let p = match c.position {
            Some(p) => p,
            None => return,
        };
        let tv = self.this_variable_name(&v.decl.name);
        let field = self.variant_case_position_to_variable(p);
        self.output_frag(&format!("{}: ", field));

        if c.ty.is_primitive() {
            self.output_line(&format!("{}.{},", tv, field));
            return;
        }

        self.output_frag("(func (x *");
        c.ty.emit(self);
        self.output_frag(") *");
        c.ty.emit_internal(self);
        self.output_line(" {");
        self.tab();
        self.output_line("if x == nil {");
        self.tab();
        self.output_line("return nil");
        self.untab();
        self.output_line("}");
        self.output_frag("return ");
        c.ty.emit_export(self, "(*x)");
        self.empty_line();
        self.untab();
        self.output_line(&format!("}})({}.{}),", tv, field));
    }

    fn emit_variant_export(&mut self, v: &Variant) {
        let (tv, isn, exsym) = self.base_type_names(&v.decl);
        self.output_line(&format!("func ({} {}) Export() *{} {{", tv, exsym, isn));
        self.tab();
        self.output_line(&format!("return &{}{{", isn));
        self.tab();
        let sv = self.export_symbol(&v.switch_var);
        self.output_line(&format!("{}: {}.{},", sv, tv, sv));
        self.output_line(&format!(
            "{}: {}{{",
            self.switch_struct_name(),
            self.switch_internal_struct_type(&v.decl.name)
        ));
        self.tab();
        for c in &v.cases {
            self.emit_variant_export_case(v, c);
        }
        self.untab();
        self.output_line("},");
        self.untab();
        self.output_line("}");
        self.untab();
        self.output_line("}");
    }

    fn protocol_id(&self, p: &Protocol) -> String {
        format!("{}ProtocolID", self.export_symbol(&p.name))
    }

    fn emit_protocol_id(&mut self, p: &Protocol) {
        let nm = self.protocol_id(p);
        self.output_line(&format!(
            "var {} rpc.ProtocolUniqueID = rpc.ProtocolUniqueID({})",
            nm, p.unique.0
        ));
        self.base.add_unique(nm);
    }

    fn emit_method_args(&mut self, m: &Method) {
        let arg_name = m.make_arg_name(self);
        let s = m.params_to_struct(&arg_name);
        self.emit_struct(&s);
    }

    fn emit_methods_args(&mut self, p: &Protocol) {
        for m in &p.methods {
            self.emit_method_args(m);
        }
    }

    fn emit_server_hook_signature(&mut self, m: &Method) {
        self.emit_decorators(&m.dec);
        let exsym = self.export_symbol(&m.name);
        self.output_frag(&format!("{}(context.Context", exsym));
        if !m.params.is_empty() {
            self.output_frag(", ");
            if m.single_arg() {
                m.params[0].ty.emit(self);
            } else {
                let arg_name = m.make_arg_name(self);
                self.output_frag(&arg_name);
            }
        }
        self.output_frag(") (");
        if !m.res_type.is_void() {
            m.res_type.emit(self);
            self.output_frag(", ");
        }
        self.output_line("error)");
    }

    fn emit_server_interface(&mut self, p: &Protocol) {
        self.emit_decorators(&p.dec);
        let nm = self.export_symbol(&p.name);
        self.output_line(&format!("type {}Interface interface {{", nm));
        self.tab();
        for m in &p.methods {
            self.emit_server_hook_signature(m);
        }
        self.output_frag("ErrorWrapper() func(error) ");
        p.modifiers.errors.emit(self);
        self.empty_line();
        if let Some(ah) = &p.modifiers.arg_header {
            self.output_frag("CheckArgHeader(ctx context.Context, h ");
            ah.emit(self);
            self.output_frag(") error");
            self.empty_line();
        }
        if let Some(rh) = &p.modifiers.res_header {
            self.output_frag("MakeResHeader() ");
            rh.emit(self);
            self.empty_line();
        }
        self.untab();
        self.output_line("}");
    }

    fn emit_server_wrap_error(&mut self, p: &Protocol) {
        let exsym = self.export_symbol(&p.name);
        self.output_line(&format!(
            "func {}MakeGenericErrorWrapper(f {}ErrorWrapper) rpc.WrapErrorFunc {{",
            exsym, exsym
        ));
        self.tab();
        self.output_line("return func(err error) interface{} {");
        self.tab();
        self.output_line("if err == nil {");
        self.tab();
        self.output_line("return err");
        self.untab();
        self.output_line("}");
        let exp = if p.modifiers.errors.is_primitive() {
            ""
        } else {
            ".Export()"
        };
        self.output_line(&format!("return f(err){}", exp));
        self.untab();
        self.output_line("}");
        self.untab();
        self.output_line("}");
    }

    fn emit_client_error_unwrapper_type(&mut self, p: &Protocol) {
        let exsym = self.export_symbol(&p.name);
        self.output_frag(&format!("type {}ErrorUnwrapper func(", exsym));
        p.modifiers.errors.emit(self);
        self.output_line(") error");
    }

    fn emit_client_error_wrapper_type(&mut self, p: &Protocol) {
        let exsym = self.export_symbol(&p.name);
        self.output_frag(&format!("type {}ErrorWrapper func(error) ", exsym));
        p.modifiers.errors.emit(self);
        self.empty_line();
        self.empty_line();
    }

    fn emit_client_error_unwrapper_adapter_struct(&mut self, p: &Protocol) {
        let nm = format!("{}ErrorUnwrapperAdapter", self.private_symbol(&p.name));
        let hook = format!("{}ErrorUnwrapper", self.export_symbol(&p.name));
        let tv = self.this_variable_name(&p.name);

        self.output_line(&format!("type {} struct {{", nm));
        self.tab();
        self.output_line(&format!("h {}", hook));
        self.untab();
        self.output_line("}");
        self.empty_line();

        self.output_line(&format!("func ({} {}) MakeArg() interface{{}} {{", tv, nm));
        self.tab();
        self.output_frag("return &");
        p.modifiers.errors.emit_internal(self);
        self.output_line("{}");
        self.untab();
        self.output_line("}");
        self.empty_line();

        self.output_line(&format!(
            "func ({} {}) UnwrapError(raw interface{{}}) (appError error, dispatchError error) {{",
            tv, nm
        ));
        self.tab();
        let conv_var = "sTmp";
        self.output_frag(&format!("{}, ok := raw.(*", conv_var));
        p.modifiers.errors.emit_internal(self);
        self.output_line(")");
        self.output_line("if !ok {");
        self.tab();
        self.output_line(
            "return nil, errors.New(\"error converting to internal type in UnwrapError\")",
        );
        self.untab();
        self.output_line("}");
        self.output_line(&format!("if {} == nil {{", conv_var));
        self.tab();
        self.output_line("return nil, nil");
        self.untab();
        self.output_line("}");
        self.output_line(&format!("return {}.h({}.Import()), nil", tv, conv_var));
        self.untab();
        self.output_line("}");
        self.empty_line();
        self.output_line(&format!("var _ rpc.ErrorUnwrapper = {}{{}}", nm));
    }

    fn emit_client_error_unwrapper(&mut self, p: &Protocol) {
        self.emit_client_error_unwrapper_type(p);
        self.emit_client_error_wrapper_type(p);
        self.emit_client_error_unwrapper_adapter_struct(p);
    }

    fn emit_client_stub(&mut self, p: &Protocol) {
        let exsym = self.export_symbol(&p.name);
        self.output_line(&format!("type {}Client struct {{", exsym));
        self.tab();
        self.output_line("Cli rpc.GenericClient");
        self.output_line(&format!("ErrorUnwrapper {}ErrorUnwrapper", exsym));
        if let Some(ah) = &p.modifiers.arg_header {
            self.output_frag("MakeArgHeader func() ");
            ah.emit(self);
            self.empty_line();
        }
        if let Some(rh) = &p.modifiers.res_header {
            self.output_frag("CheckResHeader func(context.Context, ");
            rh.emit(self);
            self.output_line(") error");
        }
        self.untab();
        self.output_line("}");
    }

    fn emit_client_method(&mut self, p: &Protocol, m: &Method) {
        let pn = self.export_symbol(&p.name);
        let mn = self.export_symbol(&m.name);

        self.output_frag(&format!("func (c {}Client) {} (ctx context.Context", pn, mn));
        let arg_struct_name = m.make_arg_name(self);
        if !m.params.is_empty() {
            self.output_frag(", ");
            if m.single_arg() {
                self.output_frag(&format!("{} ", m.params[0].name));
                m.params[0].ty.emit(self);
            } else {
                self.output_frag(&format!("arg {}", arg_struct_name));
            }
        }
        self.output_frag(") (");
        if !m.res_type.is_void() {
            self.output_frag("res ");
            m.res_type.emit(self);
            self.output_frag(", ");
        }
        self.output_line("err error) {");
        self.tab();

        if m.single_arg() {
            self.output_line(&format!("arg := {}{{", arg_struct_name));
            self.tab();
            let n = m.params[0].name.clone();
            self.output_line(&format!("{}: {},", self.export_symbol(&n), n));
            self.untab();
            self.output_line("}");
        } else if m.params.is_empty() {
            self.output_line(&format!("var arg {}", arg_struct_name));
        }

        if let Some(ah) = &p.modifiers.arg_header {
            self.output_frag("warg := &rpc.DataWrap[");
            ah.emit(self);
            self.output_frag(", *");
            let arg_type = self.internal_struct_name(&arg_struct_name);
            self.output_frag(&arg_type);
            self.output_line("] {");
            self.tab();
            self.output_line("Data: arg.Export(),");
            self.untab();
            self.output_line("}");
            self.output_line("if c.MakeArgHeader != nil {");
            self.tab();
            self.output_line("warg.Header = c.MakeArgHeader()");
            self.untab();
            self.output_line("}");
        } else {
            self.output_line("warg := arg.Export()");
        }

        let mut nil_res = false;

        if let Some(rh) = &p.modifiers.res_header {
            self.output_frag("var tmp rpc.DataWrap[");
            rh.emit(self);
            self.output_frag(", ");
            if m.res_type.is_void() {
                self.output_frag("interface{}");
            } else {
                m.res_type.emit_internal(self);
            }
            self.output_line("]");
        } else if !m.res_type.is_void() {
            self.output_frag("var tmp ");
            m.res_type.emit(self);
            self.empty_line();
        } else {
            nil_res = true;
        }

        let res = if nil_res { "nil" } else { "&tmp" };
        let method = format!(
            "rpc.NewMethodV2({}, {}, \"{}.{}\")",
            self.protocol_id(p),
            m.pos,
            p.name,
            m.name
        );
        let adapter = format!(
            "{}ErrorUnwrapperAdapter{{h: c.ErrorUnwrapper}}",
            self.private_symbol(&p.name)
        );

        self.output_line(&format!(
            "err = c.Cli.Call2(ctx, {}, warg, {}, 0 * time.Millisecond, {})",
            method, res, adapter
        ));

        self.output_line("if err != nil {");
        self.tab();
        self.output_line("return");
        self.untab();
        self.output_line("}");

        if p.modifiers.res_header.is_some() {
            self.output_line("if c.CheckResHeader != nil {");
            self.tab();
            self.output_line("err = c.CheckResHeader(ctx, tmp.Header)");
            self.output_line("if err != nil {");
            self.tab();
            self.output_line("return");
            self.untab();
            self.output_line("}");
            self.untab();
            self.output_line("}");
        }

        if !m.res_type.is_void() {
            let tmp = if p.modifiers.res_header.is_some() {
                "tmp.Data"
            } else {
                "tmp"
            };
            self.output_frag("res = ");
            if m.res_type.is_primitive() {
                self.output_line(tmp);
            } else if m.res_type.is_list() {
                m.res_type.emit_import(self, &format!("&{}", tmp));
                self.empty_line();
            } else {
                self.output_line(&format!("{}.Import()", tmp));
            }
        }
        self.output_line("return");
        self.untab();
        self.output_line("}");
    }

    fn emit_client_methods(&mut self, p: &Protocol) {
        for m in &p.methods {
            self.emit_client_method(p, m);
        }
    }

    fn emit_server_protocol_handler(&mut self, p: &Protocol, m: &Method) {
        let arg_name = m.make_arg_name(self);
        let arg_type = self.internal_struct_name(&arg_name);
        self.output_line(&format!("{}: {{", m.pos));
        self.tab();

        self.output_line("ServeHandlerDescription: rpc.ServeHandlerDescription{");
        self.tab();
        self.output_line("MakeArg : func() interface{} {");
        self.tab();
        if let Some(ah) = &p.modifiers.arg_header {
            self.output_frag("var ret rpc.DataWrap[");
            ah.emit(self);
            self.output_frag(", *");
            self.output_frag(&arg_type);
            self.output_line("]");
        } else {
            self.output_line(&format!("var ret {}", arg_type));
        }
        self.output_line("return &ret");
        self.untab();
        self.output_line("},");

        self.output_line(
            "Handler: func(ctx context.Context, args interface{}) (interface{}, error) {",
        );
        self.tab();

        if let Some(ah) = &p.modifiers.arg_header {
            self.output_frag("typedWrappedArg, ok := args.(*rpc.DataWrap[");
            ah.emit(self);
            self.output_frag(", *");
            self.output_frag(&arg_type);
            self.output_line("])");
            self.output_line("if !ok {");
            self.tab();
            self.output_frag("err := rpc.NewTypeError((*rpc.DataWrap[");
            ah.emit(self);
            self.output_frag(", *");
            self.output_frag(&arg_type);
            self.output_line("])(nil), args)");
            self.output_line("return nil, err");
            self.untab();
            self.output_line("}");
            self.output_line(
                "if err := i.CheckArgHeader(ctx, typedWrappedArg.Header); err != nil {",
            );
            self.tab();
            self.output_line("return nil, err");
            self.untab();
            self.output_line("}");
            if !m.params.is_empty() {
                self.output_line("typedArg := typedWrappedArg.Data");
            }
        } else {
            let typed_args = if m.params.is_empty() { "_" } else { "typedArg" };
            self.output_line(&format!("{}, ok := args.(*{})", typed_args, arg_type));
            self.output_line("if !ok {");
            self.tab();
            self.output_line(&format!(
                "err := rpc.NewTypeError((*{})(nil), args)",
                arg_type
            ));
            self.output_line("return nil, err");
            self.untab();
            self.output_line("}");
        }

        let ret = if m.res_type.is_void() { "" } else { "tmp, " };
        let mut arg = ", (typedArg.Import())".to_owned();
        if m.single_arg() {
            arg.push('.');
            arg.push_str(&self.export_symbol(&m.params[0].name));
        } else if m.params.is_empty() {
            arg = String::new();
        }
        self.output_line(&format!(
            "{}err := i.{}(ctx{})",
            ret,
            self.export_symbol(&m.name),
            arg
        ));
        self.output_line("if err != nil {");
        self.tab();
        self.output_line("return nil, err");
        self.untab();
        self.output_line("}");

        if !m.res_type.is_void() && m.res_type.is_list() {
            self.output_frag("lst := ");
            m.res_type.emit_export(self, "tmp");
            self.empty_line();
        }

        if let Some(rh) = &p.modifiers.res_header {
            self.output_frag("ret := rpc.DataWrap[");
            rh.emit(self);
            self.output_frag(", ");
            if m.res_type.is_void() {
                self.output_frag("interface{}");
            } else {
                if !m.res_type.is_primitive() && !m.res_type.is_list() {
                    self.output_frag("*");
                }
                m.res_type.emit_internal(self);
            }
            self.output_line("]{");
            self.tab();
            if m.res_type.is_void() || m.res_type.is_list() {
                // Filled in below for lists, left zero for void.
            } else if m.res_type.is_primitive() {
                self.output_line("Data: tmp,");
            } else {
                self.output_line("Data: tmp.Export(),");
            }
            self.output_line("Header : i.MakeResHeader(),");
            self.untab();
            self.output_line("}");
            if m.res_type.is_list() {
                self.output_line("if lst != nil {");
                self.tab();
                self.output_line("ret.Data = *lst");
                self.untab();
                self.output_line("}");
            }
            self.output_line("return &ret, nil");
        } else if m.res_type.is_void() {
            self.output_line("return nil, nil");
        } else if m.res_type.is_primitive() {
            self.output_line("return tmp, nil");
        } else if m.res_type.is_list() {
            self.output_line("return lst, nil");
        } else {
            self.output_line("return tmp.Export(), nil");
        }

        self.untab();
        self.output_line("},");
        self.untab();

        self.output_line("},");
        self.output_line(&format!("Name: \"{}\",", m.name));
        self.untab();
        self.output_line("},");
    }

    fn emit_server_protocol(&mut self, p: &Protocol) {
        let exsym = self.export_symbol(&p.name);
        self.output_line(&format!(
            "func {}Protocol(i {}Interface) rpc.ProtocolV2 {{",
            exsym, exsym
        ));
        self.tab();
        self.output_line("return rpc.ProtocolV2{");
        self.tab();
        self.output_line(&format!("Name: \"{}\",", p.name));
        self.output_line(&format!("ID: {},", self.protocol_id(p)));
        self.output_line("Methods: map[rpc.Position]rpc.ServeHandlerDescriptionV2{");
        self.tab();
        for m in &p.methods {
            self.emit_server_protocol_handler(p, m);
        }
        self.untab();
        self.output_line("},");
        self.output_line(&format!(
            "WrapError: {}MakeGenericErrorWrapper(i.ErrorWrapper()),",
            exsym
        ));
        self.untab();
        self.output_line("}");
        self.untab();
        self.output_line("}");
    }
}

impl<W: Write> Emitter for GoEmitter<W> {
    fn emit_enum(&mut self, e: &Enum) {
        self.emit_decorators(&e.decl.dec);
        let exsym = self.export_symbol(&e.decl.name);
        self.output_line(&format!("type {} int", exsym));
        self.empty_line();
        self.emit_enum_constants(e);
        self.emit_enum_map(e);
        self.emit_enum_rev_map(e);
        let isn = self.internal_struct_name(&e.decl.name);
        self.output_line(&format!("type {} {}", isn, exsym));
        self.emit_enum_import(e);
        self.emit_enum_export(e);
    }

    fn emit_typedef(&mut self, t: &Typedef) {
        self.emit_decorators(&t.decl.dec);
        let exsym = self.export_symbol(&t.decl.name);
        self.output_frag(&format!("type {} ", exsym));
        t.ty.emit(self);
        self.empty_line();
        self.emit_typedef_internal(t);
        self.emit_typedef_export(t);
        self.emit_typedef_import(t);
        self.empty_line();
        self.emit_codec(&t.decl);
        self.emit_id(&t.decl);
        self.emit_bytes_typedef(t);

        // A typedef to Future(T) links the wrapping blob back to T, so the
        // blob can be decoded to a T on demand.
        t.ty.emit_future_link(self, &t.decl.name);
    }

    fn emit_struct(&mut self, s: &Struct) {
        self.emit_decorators(&s.decl.dec);
        self.emit_struct_visible(s);
        self.emit_struct_internal(s);
        self.emit_struct_import(s);
        self.emit_struct_export(s);
        self.emit_codec(&s.decl);
        self.emit_id(&s.decl);
        self.emit_bytes_nil(&s.decl);
    }

    fn emit_variant(&mut self, v: &Variant) {
        self.emit_decorators(&v.decl.dec);
        self.emit_variant_top_struct(v);
        self.emit_variant_internal_struct(v);
        self.emit_variant_internal_switch_struct(v);
        self.emit_variant_switch_accessor(v);
        self.emit_variant_data_accessors(v);
        self.emit_variant_constructors(v);
        self.emit_variant_import(v);
        self.emit_variant_export(v);
        self.emit_codec(&v.decl);
        self.emit_id(&v.decl);
        self.emit_bytes_nil(&v.decl);
    }

    fn emit_protocol(&mut self, p: &Protocol) {
        self.emit_protocol_id(p);
        self.emit_methods_args(p);
        self.emit_server_interface(p);
        self.emit_server_wrap_error(p);
        self.emit_client_error_unwrapper(p);
        self.emit_client_stub(p);
        self.emit_client_methods(p);
        self.emit_server_protocol(p);
    }

    fn emit_import(&mut self, i: &Import) {
        self.base.store_import(i);
        if i.lang == Language::Go {
            self.output_line(&format!("import {} \"{}\"", i.name, i.path));
        }
    }

    fn emit_void(&mut self) {}

    fn emit_list(&mut self, inner: &Type) {
        self.output_frag("[]");
        inner.emit(self);
    }

    fn emit_option(&mut self, inner: &Type) {
        self.output_frag("*");
        inner.emit(self);
    }

    fn emit_future(&mut self, _inner: &Type) {
        self.emit_blob(0);
    }

    fn emit_blob(&mut self, count: u64) {
        if count > 0 {
            self.output_frag(&format!("[{}]byte", count));
        } else {
            self.output_frag("[]byte");
        }
    }

    fn emit_text(&mut self) {
        self.output_frag("string");
    }

    fn emit_uint(&mut self) {
        self.output_frag("uint64");
    }

    fn emit_int(&mut self) {
        self.output_frag("int64");
    }

    fn emit_bool(&mut self) {
        self.output_frag("bool");
    }

    fn emit_derived(&mut self, d: &DerivedType) {
        self.emit_derived_prefix(d);
        self.output_frag(&d.name);
    }

    fn emit_list_internal(&mut self, inner: &Type) {
        self.output_frag("[](");
        if !inner.is_primitive() {
            self.output_frag("*");
        }
        inner.emit_internal(self);
        self.output_frag(")");
    }

    fn emit_option_internal(&mut self, inner: &Type) {
        self.output_frag("*");
        inner.emit_internal(self);
    }

    fn emit_derived_internal(&mut self, d: &DerivedType) {
        self.emit_derived_prefix(d);
        let isn = self.internal_struct_name(&d.name);
        self.output_frag(&isn);
    }

    fn emit_export_list(&mut self, inner: &Type, param: &str) {
        self.output_frag("(func (x ");
        self.emit_list(inner);
        self.output_frag(") * ");
        self.emit_list_internal(inner);
        self.output_line(" {");
        self.tab();
        self.output_line("if len(x) == 0 {");
        self.tab();
        self.output_line("return nil");
        self.untab();
        self.output_line("}");
        self.output_frag("ret := make(");
        self.emit_list_internal(inner);
        self.output_line(", len(x))");

        if inner.is_primitive() {
            self.output_line("copy(ret, x)");
        } else {
            self.output_line("for k,v := range x {");
            self.tab();
            self.output_frag("ret[k] = ");
            inner.emit_export(self, "v");
            self.empty_line();
            self.untab();
            self.output_line("}");
        }
        self.output_line("return &ret");
        self.untab();
        self.output_frag("})");
        self.output_params_maybe(param);
    }

    fn emit_export_blob(&mut self, count: u64, param: &str) {
        self.emit_export_primitive_type(&Type::Blob(count), param);
    }

    fn emit_export_text(&mut self, param: &str) {
        self.emit_export_primitive_type(&Type::Text, param);
    }

    fn emit_export_uint(&mut self, param: &str) {
        self.emit_export_primitive_type(&Type::Uint, param);
    }

    fn emit_export_int(&mut self, param: &str) {
        self.emit_export_primitive_type(&Type::Int, param);
    }

    fn emit_export_bool(&mut self, param: &str) {
        self.emit_export_primitive_type(&Type::Bool, param);
    }

    fn emit_export_future(&mut self, _inner: &Type, param: &str) {
        self.emit_export_primitive_type(&Type::Blob(0), param);
    }

    fn emit_export_option(&mut self, inner: &Type, param: &str) {
        // A bound primitive parameter is already a pointer in the visible
        // form, so it passes straight through.
        if inner.is_primitive() && !param.is_empty() {
            self.output_frag(param);
            return;
        }
        self.output_frag("(func (x *");
        inner.emit(self);
        self.output_frag(") * ");
        inner.emit_internal(self);
        self.output_line(" {");
        self.tab();
        self.output_line("if x == nil {");
        self.tab();
        self.output_line("return nil");
        self.untab();
        self.output_line("}");
        self.output_frag("return ");
        inner.emit_export(self, "(*x)");
        self.empty_line();
        self.untab();
        self.output_frag("})");
        self.output_params_maybe(param);
    }

    fn emit_export_derived(&mut self, d: &DerivedType, param: &str) {
        if !param.is_empty() {
            self.output_frag(&format!("{}.Export()", param));
            return;
        }
        self.output_frag("(func (x ");
        self.emit_derived(d);
        self.output_frag(") * ");
        self.emit_derived_internal(d);
        self.output_line(" {");
        self.tab();
        self.output_line("return x.Export()");
        self.untab();
        self.output_frag("})");
    }

    fn emit_import_list(&mut self, inner: &Type, param: &str) {
        let l = Type::List(Box::new(inner.clone()));
        self.emit_import_signature(&l);
        self.output_line("if x == nil || len(*x) == 0 {");
        self.tab();
        self.output_line("return nil");
        self.untab();
        self.output_line("}");
        self.output_frag("ret = make(");
        self.emit_list(inner);
        self.output_line(", len(*x))");
        self.output_line("for k,v := range *x {");
        self.tab();
        if !inner.is_primitive() {
            self.output_line("if v == nil {");
            self.tab();
            self.output_line("continue");
            self.untab();
            self.output_line("}");
        }
        self.output_frag("ret[k] = ");
        let mkref = if inner.is_primitive() { "&" } else { "" };
        inner.emit_import(self, &format!("{}v", mkref));
        self.empty_line();
        self.untab();
        self.output_line("}");
        self.output_line("return ret");
        self.untab();
        self.output_frag("})");
        self.output_params_maybe(param);
    }

    fn emit_import_blob(&mut self, count: u64, param: &str) {
        self.emit_import_primitive_type(&Type::Blob(count), param);
    }

    fn emit_import_text(&mut self, param: &str) {
        self.emit_import_primitive_type(&Type::Text, param);
    }

    fn emit_import_uint(&mut self, param: &str) {
        self.emit_import_primitive_type(&Type::Uint, param);
    }

    fn emit_import_int(&mut self, param: &str) {
        self.emit_import_primitive_type(&Type::Int, param);
    }

    fn emit_import_bool(&mut self, param: &str) {
        self.emit_import_primitive_type(&Type::Bool, param);
    }

    fn emit_import_future(&mut self, _inner: &Type, param: &str) {
        self.emit_import_primitive_type(&Type::Blob(0), param);
    }

    fn emit_import_option(&mut self, inner: &Type, param: &str) {
        self.output_frag("(func (x *");
        inner.emit_internal(self);
        self.output_frag(") *");
        inner.emit(self);
        self.output_line(" {");
        self.tab();
        self.output_line("if x == nil {");
        self.tab();
        self.output_line("return nil");
        self.untab();
        self.output_line("}");
        self.output_frag("tmp := ");
        inner.emit_import(self, "x");
        self.empty_line();
        self.output_line("return &tmp");
        self.untab();
        self.output_frag("})");
        self.output_params_maybe(param);
    }

    fn emit_import_derived(&mut self, d: &DerivedType, param: &str) {
        self.emit_import_preamble(&Type::Derived(d.clone()));
        self.output_line("return x.Import()");
        self.untab();
        self.output_frag("})");
        self.output_params_maybe(param);
    }

    fn emit_bytes_downcast(&mut self, name: &str, param: &str) {
        self.output_frag(&format!("(({})({})).Bytes()", name, param));
    }

    fn emit_nil(&mut self) {
        self.output_frag("nil");
    }

    fn emit_blob_to_bytes(&mut self, name: &str) {
        self.output_frag(&format!("({})[:]", name));
    }

    fn emit_future_link(&mut self, parent: &Type, child: &str) {
        let nm = self.export_symbol(child);
        let tv = self.this_variable_name(child);

        self.output_frag(&format!(
            "func ({} *{}) AllocAndDecode(f rpc.DecoderFactory) (*",
            tv, nm
        ));
        parent.emit(self);
        self.output_line(", error) {");
        self.tab();
        self.output_frag("var ret ");
        parent.emit(self);
        self.empty_line();
        self.output_line(&format!("src := f.NewDecoderBytes(&ret, {}.Bytes())", tv));
        self.output_line("if err := ret.Decode(src); err != nil {");
        self.tab();
        self.output_line("return nil, err");
        self.untab();
        self.output_line("}");
        self.output_line("return &ret, nil");
        self.untab();
        self.output_line("}");

        self.output_frag(&format!(
            "func ({} *{}) AssertNormalized() error {{ return nil }}",
            tv, nm
        ));
        self.empty_line();

        self.output_frag(&format!("func ({} *", tv));
        parent.emit(self);
        self.output_line(&format!(") EncodeTyped(f rpc.EncoderFactory) (*{}, error) {{", nm));
        self.tab();
        self.output_line("var tmp []byte");
        self.output_line("enc := f.NewEncoderBytes(&tmp)");
        self.output_line("if err := enc.Encode(enc); err != nil {");
        self.tab();
        self.output_line("return nil, err");
        self.untab();
        self.output_line("}");
        self.output_line(&format!("ret := {}(tmp)", nm));
        self.output_line("return &ret, nil");
        self.untab();
        self.output_line("}");

        self.output_frag(&format!("func ({} *", tv));
        parent.emit(self);
        let b = "__b";
        self.output_line(&format!(")  ChildBlob({} []byte) {} {{", b, nm));
        self.tab();
        self.output_line(&format!("return {}({})", nm, b));
        self.untab();
        self.output_line("}");
    }

    fn to_enum_constant(&self, t: &Type, name: &str) -> String {
        let mut parts = Vec::new();
        let prfx = t.derived_prefix();
        if !prfx.is_empty() {
            parts.push(prfx);
        }
        let prfx = t.enum_prefix();
        if !prfx.is_empty() {
            parts.push(format!("{}_{}", self.export_symbol(prfx), name));
        } else {
            parts.push(name.to_owned());
        }
        parts.concat()
    }

    fn getter_method_name_for_bool(&self, b: bool) -> String {
        if b { "True" } else { "False" }.to_owned()
    }

    fn getter_method_name_for_int(&self, i: i64) -> String {
        if i >= 0 {
            format!("P{}", i)
        } else {
            format!("N{}", -i)
        }
    }

    fn getter_method_name_for_constant(&self, name: &str) -> String {
        self.export_symbol(&self.snake_to_camel_case(name))
    }

    fn constructor_name_for_constant(&self, variant: &str, constant: &str) -> String {
        format!(
            "New{}With{}",
            self.export_symbol(variant),
            self.snake_to_camel_case(constant)
        )
    }

    fn constructor_name_for_int(&self, variant: &str, i: i64) -> String {
        self.constructor_name_for_constant(variant, &self.getter_method_name_for_int(i))
    }

    fn constructor_name_for_bool(&self, variant: &str, b: bool) -> String {
        self.constructor_name_for_constant(variant, &self.getter_method_name_for_bool(b))
    }

    fn method_arg_name(&self, method: &str, arg_name: Option<&str>) -> String {
        let ret = match arg_name {
            Some(arg_name) if !arg_name.is_empty() => arg_name.to_owned(),
            _ => format!("{}Arg", method),
        };
        self.export_symbol(&ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitter() -> GoEmitter<Vec<u8>> {
        GoEmitter::new(
            Metadata {
                package: "test".to_owned(),
                input_name: "test.snowp".to_owned(),
            },
            Vec::new(),
        )
    }

    #[test]
    fn symbol_casing() {
        let g = emitter();
        assert_eq!(g.export_symbol("foo"), "Foo");
        assert_eq!(g.export_symbol("Foo"), "Foo");
        assert_eq!(g.export_symbol(""), "");
        assert_eq!(g.private_symbol("FooBar"), "fooBar");
        assert_eq!(g.this_variable_name("Status"), "s");
        assert_eq!(g.internal_struct_name("Foo"), "FooInternal__");
    }

    #[test]
    fn snake_to_camel() {
        let g = emitter();
        assert_eq!(g.snake_to_camel_case("FOO_BAR"), "FooBar");
        assert_eq!(g.snake_to_camel_case("ok"), "Ok");
        assert_eq!(g.getter_method_name_for_constant("NO_KEY"), "NoKey");
    }

    #[test]
    fn label_getter_names() {
        let g = emitter();
        assert_eq!(g.getter_method_name_for_bool(true), "True");
        assert_eq!(g.getter_method_name_for_bool(false), "False");
        assert_eq!(g.getter_method_name_for_int(3), "P3");
        assert_eq!(g.getter_method_name_for_int(-7), "N7");
    }

    #[test]
    fn constructor_names() {
        let g = emitter();
        assert_eq!(
            g.constructor_name_for_constant("view", "NO_KEY"),
            "NewViewWithNoKey"
        );
        assert_eq!(g.constructor_name_for_int("view", -2), "NewViewWithN2");
        assert_eq!(g.constructor_name_for_bool("view", true), "NewViewWithTrue");
    }

    #[test]
    fn method_arg_names() {
        let g = emitter();
        assert_eq!(g.method_arg_name("ping", None), "PingArg");
        assert_eq!(g.method_arg_name("ping", Some("echoReq")), "EchoReq");
    }

    #[test]
    fn enum_constant_rendering() {
        let g = emitter();
        let local = Type::Derived(DerivedType {
            name: "status".to_owned(),
            imported_from: None,
        });
        assert_eq!(g.to_enum_constant(&local, "OK"), "Status_OK");
        let imported = Type::Derived(DerivedType {
            name: "status".to_owned(),
            imported_from: Some("lib".to_owned()),
        });
        assert_eq!(g.to_enum_constant(&imported, "OK"), "lib.Status_OK");
        // Bool and integer switches have no enum prefix.
        assert_eq!(g.to_enum_constant(&Type::Int, "7"), "7");
    }
}
