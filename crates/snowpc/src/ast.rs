//! The abstract syntax tree and its type algebra.
//!
//! The parser builds one [`Root`] per input file; nothing mutates the tree
//! afterwards. Emission is double dispatch: each statement and type knows
//! which [`Emitter`](crate::emit::Emitter) capability it maps to, and the
//! emitter knows what to write for it.

use std::fmt;

use crate::emit::Emitter;
use crate::error::Error;

/// Output (or import-tag) language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Generic,
    Go,
    TypeScript,
}

impl Language {
    pub fn out_ext(&self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::TypeScript => "ts",
            Language::Generic => "",
        }
    }
}

/// A 32- or 64-bit unique id literal, carried verbatim (`0x...`); the
/// runtime parses it, we never do.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueID(pub String);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decorators {
    pub doc: Option<String>,
}

/// The name, optional unique id, and decorators shared by every type
/// declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub dec: Decorators,
    pub name: String,
    pub unique: Option<UniqueID>,
}

#[derive(Debug, PartialEq)]
pub struct Root {
    pub stmts: Vec<Statement>,
}

impl Root {
    pub fn emit(&self, e: &mut dyn Emitter) {
        for s in &self.stmts {
            s.emit(e);
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Statement {
    Import(Import),
    Typedef(Typedef),
    Enum(Enum),
    Struct(Struct),
    Variant(Variant),
    Protocol(Protocol),
}

impl Statement {
    pub fn emit(&self, e: &mut dyn Emitter) {
        match self {
            Statement::Import(i) => e.emit_import(i),
            Statement::Typedef(t) => e.emit_typedef(t),
            Statement::Enum(en) => e.emit_enum(en),
            Statement::Struct(s) => e.emit_struct(s),
            Statement::Variant(v) => e.emit_variant(v),
            Statement::Protocol(p) => e.emit_protocol(p),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub path: String,
    pub name: String,
    pub lang: Language,
}

#[derive(Debug, PartialEq)]
pub struct Typedef {
    pub decl: TypeDecl,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub name: String,
    pub num: i64,
}

#[derive(Debug, PartialEq)]
pub struct Enum {
    pub decl: TypeDecl,
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub pos: u64,
    pub ty: Type,
}

#[derive(Debug, PartialEq)]
pub struct Struct {
    pub decl: TypeDecl,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    /// Empty for the default arm.
    pub labels: Vec<CaseLabel>,
    /// The wire slot for the arm's payload; `None` exactly when the
    /// payload type is void.
    pub position: Option<u64>,
    pub ty: Type,
}

impl Case {
    pub fn has_data(&self) -> bool {
        !self.ty.is_void()
    }
}

#[derive(Debug, PartialEq)]
pub struct Variant {
    pub decl: TypeDecl,
    pub switch_var: String,
    pub switch_type: Type,
    pub cases: Vec<Case>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaseLabel {
    Ident(String),
    Num(i64),
    Bool(bool),
}

impl CaseLabel {
    /// The label as it appears in a generated `case` arm.
    pub fn to_case_string(&self, e: &dyn Emitter, switch_type: &Type) -> String {
        match self {
            CaseLabel::Ident(name) => e.to_enum_constant(switch_type, name),
            CaseLabel::Num(n) => n.to_string(),
            CaseLabel::Bool(true) => "true".to_owned(),
            CaseLabel::Bool(false) => "false".to_owned(),
        }
    }

    pub fn getter_method_name(&self, e: &dyn Emitter) -> String {
        match self {
            CaseLabel::Ident(name) => e.getter_method_name_for_constant(name),
            CaseLabel::Num(n) => e.getter_method_name_for_int(*n),
            CaseLabel::Bool(b) => e.getter_method_name_for_bool(*b),
        }
    }

    pub fn constructor_name(&self, e: &dyn Emitter, variant: &str) -> String {
        match self {
            CaseLabel::Ident(name) => e.constructor_name_for_constant(variant, name),
            CaseLabel::Num(n) => e.constructor_name_for_int(variant, *n),
            CaseLabel::Bool(b) => e.constructor_name_for_bool(variant, *b),
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct Protocol {
    pub dec: Decorators,
    pub name: String,
    pub unique: UniqueID,
    pub modifiers: ProtocolModifiers,
    pub methods: Vec<Method>,
}

/// A single `errors(..)`, `argHeader(..)` or `resHeader(..)` annotation as
/// parsed, before duplicate checking.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolModifier {
    Errors(Type),
    ArgHeader(Type),
    ResHeader(Type),
}

#[derive(Debug, PartialEq)]
pub struct ProtocolModifiers {
    pub errors: Type,
    pub arg_header: Option<Type>,
    pub res_header: Option<Type>,
}

impl ProtocolModifiers {
    /// Collapse the parsed modifier list, rejecting duplicates and a
    /// missing `errors`.
    pub fn new(pms: Vec<ProtocolModifier>) -> Result<ProtocolModifiers, Error> {
        let mut errors = None;
        let mut arg_header = None;
        let mut res_header = None;
        for pm in pms {
            match pm {
                ProtocolModifier::Errors(ty) => {
                    if errors.is_some() {
                        return Err(Error::Semantic(
                            "multiple errors protocol modifiers found".to_owned(),
                        ));
                    }
                    errors = Some(ty);
                }
                ProtocolModifier::ArgHeader(ty) => {
                    if arg_header.is_some() {
                        return Err(Error::Semantic(
                            "multiple arg_header protocol modifiers found".to_owned(),
                        ));
                    }
                    arg_header = Some(ty);
                }
                ProtocolModifier::ResHeader(ty) => {
                    if res_header.is_some() {
                        return Err(Error::Semantic(
                            "multiple res_header protocol modifiers found".to_owned(),
                        ));
                    }
                    res_header = Some(ty);
                }
            }
        }
        let errors = errors.ok_or_else(|| {
            Error::Semantic("missing errors protocol modifier".to_owned())
        })?;
        Ok(ProtocolModifiers {
            errors,
            arg_header,
            res_header,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub pos: u64,
    pub ty: Type,
}

impl Param {
    pub fn to_field(&self) -> Field {
        Field {
            name: self.name.clone(),
            pos: self.pos,
            ty: self.ty.clone(),
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct Method {
    pub dec: Decorators,
    pub name: String,
    pub pos: u64,
    pub params: Vec<Param>,
    /// Overrides the generated name of the argument struct.
    pub arg_type: Option<String>,
    pub res_type: Type,
}

impl Method {
    pub fn make_arg_name(&self, e: &dyn Emitter) -> String {
        e.method_arg_name(&self.name, self.arg_type.as_deref())
    }

    /// A method with exactly one parameter at position zero surfaces that
    /// parameter directly instead of its argument struct.
    pub fn single_arg(&self) -> bool {
        self.params.len() == 1 && self.params[0].pos == 0
    }

    pub fn params_to_struct(&self, name: &str) -> Struct {
        Struct {
            decl: TypeDecl {
                dec: Decorators::default(),
                name: name.to_owned(),
                unique: None,
            },
            fields: self.params.iter().map(Param::to_field).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedType {
    pub name: String,
    pub imported_from: Option<String>,
}

impl DerivedType {
    /// The qualifier prefix (with trailing dot) for types pulled in from
    /// another module.
    pub fn prefix(&self) -> String {
        match &self.imported_from {
            Some(from) => format!("{}.", from),
            None => String::new(),
        }
    }

    pub fn full_type_name(&self) -> String {
        match &self.imported_from {
            Some(from) => format!("{}.{}", from, self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Void,
    Bool,
    Int,
    Uint,
    Text,
    /// A byte array; a nonzero count fixes its length.
    Blob(u64),
    /// A blob holding the serialized form of the inner type, decoded on
    /// demand.
    Future(Box<Type>),
    List(Box<Type>),
    Option(Box<Type>),
    Derived(DerivedType),
}

impl Type {
    /// The public surface form.
    pub fn emit(&self, e: &mut dyn Emitter) {
        match self {
            Type::Void => e.emit_void(),
            Type::Bool => e.emit_bool(),
            Type::Int => e.emit_int(),
            Type::Uint => e.emit_uint(),
            Type::Text => e.emit_text(),
            Type::Blob(count) => e.emit_blob(*count),
            Type::Future(inner) => e.emit_future(inner),
            Type::List(inner) => e.emit_list(inner),
            Type::Option(inner) => e.emit_option(inner),
            Type::Derived(d) => e.emit_derived(d),
        }
    }

    /// The on-wire form that mirrors the positional encoding.
    pub fn emit_internal(&self, e: &mut dyn Emitter) {
        match self {
            Type::Void => e.emit_void(),
            Type::Bool => e.emit_bool(),
            Type::Int => e.emit_int(),
            Type::Uint => e.emit_uint(),
            Type::Text => e.emit_text(),
            Type::Blob(count) => e.emit_blob(*count),
            Type::Future(inner) => e.emit_future(inner),
            Type::List(inner) => e.emit_list_internal(inner),
            Type::Option(inner) => e.emit_option_internal(inner),
            Type::Derived(d) => e.emit_derived_internal(d),
        }
    }

    /// A value transformer from the visible form to the internal form.
    pub fn emit_export(&self, e: &mut dyn Emitter, nm: &str) {
        match self {
            Type::Void => e.emit_void(),
            Type::Bool => e.emit_export_bool(nm),
            Type::Int => e.emit_export_int(nm),
            Type::Uint => e.emit_export_uint(nm),
            Type::Text => e.emit_export_text(nm),
            Type::Blob(count) => e.emit_export_blob(*count, nm),
            Type::Future(inner) => e.emit_export_future(inner, nm),
            Type::List(inner) => e.emit_export_list(inner, nm),
            Type::Option(inner) => e.emit_export_option(inner, nm),
            Type::Derived(d) => e.emit_export_derived(d, nm),
        }
    }

    /// The inverse transformer, internal form back to visible.
    pub fn emit_import(&self, e: &mut dyn Emitter, nm: &str) {
        match self {
            Type::Void => {}
            Type::Bool => e.emit_import_bool(nm),
            Type::Int => e.emit_import_int(nm),
            Type::Uint => e.emit_import_uint(nm),
            Type::Text => e.emit_import_text(nm),
            Type::Blob(count) => e.emit_import_blob(*count, nm),
            Type::Future(inner) => e.emit_import_future(inner, nm),
            Type::List(inner) => e.emit_import_list(inner, nm),
            Type::Option(inner) => e.emit_import_option(inner, nm),
            Type::Derived(d) => e.emit_import_derived(d, nm),
        }
    }

    /// Projection to a flat byte view; only blobs, futures and derived
    /// types have one.
    pub fn emit_bytes(&self, e: &mut dyn Emitter, nm: &str) {
        match self {
            Type::Blob(_) | Type::Future(_) => e.emit_blob_to_bytes(nm),
            Type::Derived(d) => e.emit_bytes_downcast(&d.full_type_name(), nm),
            _ => e.emit_nil(),
        }
    }

    pub fn emit_future_link(&self, e: &mut dyn Emitter, child: &str) {
        if let Type::Future(inner) = self {
            e.emit_future_link(inner, child);
        }
    }

    pub fn make_optional(&self) -> Type {
        match self {
            Type::Option(_) => self.clone(),
            other => Type::Option(Box::new(other.clone())),
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Type::Bool | Type::Int | Type::Uint | Type::Text | Type::Blob(_) | Type::Future(_)
        )
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Type::List(_))
    }

    pub fn derived_prefix(&self) -> String {
        match self {
            Type::Derived(d) => d.prefix(),
            _ => String::new(),
        }
    }

    pub fn enum_prefix(&self) -> &str {
        match self {
            Type::Derived(d) => &d.name,
            _ => "",
        }
    }
}

// Rendering the tree back to source. Parsing the rendered form yields a
// structurally equal tree, which is what the round-trip tests lean on.

fn write_doc(f: &mut fmt::Formatter<'_>, dec: &Decorators) -> fmt::Result {
    match &dec.doc {
        Some(doc) => writeln!(f, "/**{}*/", doc),
        None => Ok(()),
    }
}

fn write_unique(f: &mut fmt::Formatter<'_>, unique: &Option<UniqueID>) -> fmt::Result {
    match unique {
        Some(u) => write!(f, " @{}", u.0),
        None => Ok(()),
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Bool => write!(f, "Bool"),
            Type::Int => write!(f, "Int"),
            Type::Uint => write!(f, "Uint"),
            Type::Text => write!(f, "Text"),
            Type::Blob(0) => write!(f, "Blob"),
            Type::Blob(n) => write!(f, "Blob({})", n),
            Type::Future(inner) => write!(f, "Future({})", inner),
            Type::List(inner) => write!(f, "List({})", inner),
            Type::Option(inner) => write!(f, "Option({})", inner),
            Type::Derived(d) => write!(f, "{}", d.full_type_name()),
        }
    }
}

impl fmt::Display for CaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseLabel::Ident(name) => write!(f, "{}", name),
            CaseLabel::Num(n) => write!(f, "{}", n),
            CaseLabel::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for s in &self.stmts {
            writeln!(f, "{}", s)?;
        }
        Ok(())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Import(i) => fmt::Display::fmt(i, f),
            Statement::Typedef(t) => fmt::Display::fmt(t, f),
            Statement::Enum(e) => fmt::Display::fmt(e, f),
            Statement::Struct(s) => fmt::Display::fmt(s, f),
            Statement::Variant(v) => fmt::Display::fmt(v, f),
            Statement::Protocol(p) => fmt::Display::fmt(p, f),
        }
    }
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kw = match self.lang {
            Language::Go => "go:import",
            Language::TypeScript => "ts:import",
            Language::Generic => "import",
        };
        write!(f, "{} \"{}\" as {};", kw, self.path, self.name)
    }
}

impl fmt::Display for Typedef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_doc(f, &self.decl.dec)?;
        write!(f, "typedef {} = {}", self.decl.name, self.ty)?;
        write_unique(f, &self.decl.unique)?;
        write!(f, ";")
    }
}

impl fmt::Display for Enum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_doc(f, &self.decl.dec)?;
        write!(f, "enum {}", self.decl.name)?;
        write_unique(f, &self.decl.unique)?;
        writeln!(f, " {{")?;
        for v in &self.values {
            writeln!(f, "\t{} @{};", v.name, v.num)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for Struct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_doc(f, &self.decl.dec)?;
        write!(f, "struct {}", self.decl.name)?;
        write_unique(f, &self.decl.unique)?;
        writeln!(f, " {{")?;
        for fld in &self.fields {
            writeln!(f, "\t{} @{}: {};", fld.name, fld.pos, fld.ty)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_doc(f, &self.decl.dec)?;
        write!(f, "variant {}", self.decl.name)?;
        write_unique(f, &self.decl.unique)?;
        writeln!(f, " switch ({}: {}) {{", self.switch_var, self.switch_type)?;
        for c in &self.cases {
            if c.labels.is_empty() {
                write!(f, "\tdefault")?;
            } else {
                write!(f, "\tcase ")?;
                for (i, l) in c.labels.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", l)?;
                }
            }
            if let Some(p) = c.position {
                write!(f, " @{}", p)?;
            }
            writeln!(f, ": {};", c.ty)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_doc(f, &self.dec)?;
        write!(f, "protocol {} @{} errors({})", self.name, self.unique.0, self.modifiers.errors)?;
        if let Some(ah) = &self.modifiers.arg_header {
            write!(f, " argHeader({})", ah)?;
        }
        if let Some(rh) = &self.modifiers.res_header {
            write!(f, " resHeader({})", rh)?;
        }
        writeln!(f, " {{")?;
        for m in &self.methods {
            if let Some(doc) = &m.dec.doc {
                writeln!(f, "\t/**{}*/", doc)?;
            }
            write!(f, "\t{} @{}(", m.name, m.pos)?;
            for (i, p) in m.params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{} @{}: {}", p.name, p.pos, p.ty)?;
            }
            write!(f, ") -> {}", m.res_type)?;
            if let Some(arg_type) = &m.arg_type {
                write!(f, " as {}", arg_type)?;
            }
            writeln!(f, ";")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_table() {
        assert!(Type::Bool.is_primitive());
        assert!(Type::Int.is_primitive());
        assert!(Type::Uint.is_primitive());
        assert!(Type::Text.is_primitive());
        assert!(Type::Blob(0).is_primitive());
        assert!(Type::Future(Box::new(Type::Uint)).is_primitive());
        assert!(!Type::Void.is_primitive());
        assert!(!Type::List(Box::new(Type::Uint)).is_primitive());
        assert!(!Type::Option(Box::new(Type::Uint)).is_primitive());
        assert!(!Type::Derived(DerivedType {
            name: "Foo".to_owned(),
            imported_from: None,
        })
        .is_primitive());
    }

    #[test]
    fn make_optional_is_idempotent() {
        let opt = Type::Uint.make_optional();
        assert_eq!(opt, Type::Option(Box::new(Type::Uint)));
        assert_eq!(opt.make_optional(), opt);
    }

    #[test]
    fn void_and_list_discriminators() {
        assert!(Type::Void.is_void());
        assert!(!Type::Uint.is_void());
        assert!(Type::List(Box::new(Type::Uint)).is_list());
        assert!(!Type::Uint.is_list());
    }

    #[test]
    fn derived_type_names() {
        let local = DerivedType {
            name: "Foo".to_owned(),
            imported_from: None,
        };
        assert_eq!(local.prefix(), "");
        assert_eq!(local.full_type_name(), "Foo");

        let imported = DerivedType {
            name: "Foo".to_owned(),
            imported_from: Some("lib".to_owned()),
        };
        assert_eq!(imported.prefix(), "lib.");
        assert_eq!(imported.full_type_name(), "lib.Foo");
    }

    #[test]
    fn protocol_modifiers_reject_duplicates() {
        let err = ProtocolModifiers::new(vec![
            ProtocolModifier::Errors(Type::Text),
            ProtocolModifier::Errors(Type::Text),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("multiple errors"));

        let err = ProtocolModifiers::new(vec![
            ProtocolModifier::Errors(Type::Text),
            ProtocolModifier::ArgHeader(Type::Text),
            ProtocolModifier::ArgHeader(Type::Text),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("multiple arg_header"));
    }

    #[test]
    fn protocol_modifiers_require_errors() {
        let err = ProtocolModifiers::new(vec![ProtocolModifier::ArgHeader(Type::Text)]).unwrap_err();
        assert_eq!(err.to_string(), "missing errors protocol modifier");

        let pm = ProtocolModifiers::new(vec![
            ProtocolModifier::Errors(Type::Text),
            ProtocolModifier::ResHeader(Type::Uint),
        ])
        .unwrap();
        assert!(pm.arg_header.is_none());
        assert_eq!(pm.res_header, Some(Type::Uint));
    }

    #[test]
    fn type_rendering() {
        assert_eq!(Type::Blob(0).to_string(), "Blob");
        assert_eq!(Type::Blob(32).to_string(), "Blob(32)");
        assert_eq!(
            Type::Option(Box::new(Type::List(Box::new(Type::Text)))).to_string(),
            "Option(List(Text))"
        );
        assert_eq!(
            Type::Derived(DerivedType {
                name: "T".to_owned(),
                imported_from: Some("lib".to_owned()),
            })
            .to_string(),
            "lib.T"
        );
        assert_eq!(Type::Void.to_string(), "void");
    }

    #[test]
    fn case_label_rendering() {
        assert_eq!(CaseLabel::Ident("OK".to_owned()).to_string(), "OK");
        assert_eq!(CaseLabel::Num(-3).to_string(), "-3");
        assert_eq!(CaseLabel::Bool(true).to_string(), "true");
    }

    #[test]
    fn single_arg_requires_position_zero() {
        let m = |pos| Method {
            dec: Decorators::default(),
            name: "ping".to_owned(),
            pos: 0,
            params: vec![Param {
                name: "n".to_owned(),
                pos,
                ty: Type::Uint,
            }],
            arg_type: None,
            res_type: Type::Void,
        };
        assert!(m(0).single_arg());
        assert!(!m(1).single_arg());
    }
}
