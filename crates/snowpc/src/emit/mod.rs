//! Code generation.
//!
//! [`Emitter`] is the capability set a target language implements: one
//! method per statement shape, five traversal modes per type shape
//! (visible, internal, export, import, bytes), and the naming rules for
//! labels and method arguments. The AST dispatches into it; see
//! [`crate::ast`].
//!
//! [`BaseEmitter`] is the shared output substrate: an indented writer, the
//! list of unique ids collected for the postamble, and the per-name import
//! map.

use std::collections::HashMap;
use std::io::Write;

use crate::ast::{
    DerivedType, Enum, Import, Language, Protocol, Struct, Type, Typedef, Variant,
};

mod go;

pub use go::GoEmitter;

pub trait Emitter {
    fn emit_enum(&mut self, e: &Enum);
    fn emit_typedef(&mut self, t: &Typedef);
    fn emit_struct(&mut self, s: &Struct);
    fn emit_variant(&mut self, v: &Variant);
    fn emit_protocol(&mut self, p: &Protocol);
    fn emit_import(&mut self, i: &Import);

    fn emit_void(&mut self);
    fn emit_list(&mut self, inner: &Type);
    fn emit_option(&mut self, inner: &Type);
    fn emit_future(&mut self, inner: &Type);
    fn emit_blob(&mut self, count: u64);
    fn emit_text(&mut self);
    fn emit_uint(&mut self);
    fn emit_int(&mut self);
    fn emit_bool(&mut self);
    fn emit_derived(&mut self, d: &DerivedType);

    fn emit_list_internal(&mut self, inner: &Type);
    fn emit_option_internal(&mut self, inner: &Type);
    fn emit_derived_internal(&mut self, d: &DerivedType);

    fn emit_export_list(&mut self, inner: &Type, param: &str);
    fn emit_export_blob(&mut self, count: u64, param: &str);
    fn emit_export_text(&mut self, param: &str);
    fn emit_export_uint(&mut self, param: &str);
    fn emit_export_int(&mut self, param: &str);
    fn emit_export_bool(&mut self, param: &str);
    fn emit_export_future(&mut self, inner: &Type, param: &str);
    fn emit_export_option(&mut self, inner: &Type, param: &str);
    fn emit_export_derived(&mut self, d: &DerivedType, param: &str);

    fn emit_import_list(&mut self, inner: &Type, param: &str);
    fn emit_import_blob(&mut self, count: u64, param: &str);
    fn emit_import_text(&mut self, param: &str);
    fn emit_import_uint(&mut self, param: &str);
    fn emit_import_int(&mut self, param: &str);
    fn emit_import_bool(&mut self, param: &str);
    fn emit_import_future(&mut self, inner: &Type, param: &str);
    fn emit_import_option(&mut self, inner: &Type, param: &str);
    fn emit_import_derived(&mut self, d: &DerivedType, param: &str);

    fn emit_bytes_downcast(&mut self, name: &str, param: &str);
    fn emit_nil(&mut self);
    fn emit_blob_to_bytes(&mut self, name: &str);

    fn emit_future_link(&mut self, parent: &Type, child: &str);

    fn to_enum_constant(&self, t: &Type, name: &str) -> String;
    fn getter_method_name_for_bool(&self, b: bool) -> String;
    fn getter_method_name_for_int(&self, i: i64) -> String;
    fn getter_method_name_for_constant(&self, name: &str) -> String;
    fn constructor_name_for_constant(&self, variant: &str, constant: &str) -> String;
    fn constructor_name_for_int(&self, variant: &str, i: i64) -> String;
    fn constructor_name_for_bool(&self, variant: &str, b: bool) -> String;
    fn method_arg_name(&self, method: &str, arg_name: Option<&str>) -> String;
}

/// What the emitter knows about the compile it is serving.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub package: String,
    pub input_name: String,
}

/// The same logical import may be declared once per target language.
#[derive(Debug, Default)]
pub struct ImportFlavors {
    m: HashMap<Language, Import>,
}

impl ImportFlavors {
    fn insert(&mut self, i: Import) {
        self.m.insert(i.lang, i);
    }

    pub fn get(&self, lang: Language) -> Option<&Import> {
        self.m.get(&lang)
    }
}

pub struct BaseEmitter<W: Write> {
    md: Metadata,
    dst: W,
    n_tabs: usize,
    is_newline: bool,
    uniques: Vec<String>,
    imports: HashMap<String, ImportFlavors>,
}

impl<W: Write> BaseEmitter<W> {
    pub fn new(md: Metadata, dst: W) -> BaseEmitter<W> {
        BaseEmitter {
            md,
            dst,
            n_tabs: 0,
            is_newline: true,
            uniques: Vec::new(),
            imports: HashMap::new(),
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.md
    }

    pub fn add_unique(&mut self, s: String) {
        self.uniques.push(s);
    }

    pub fn uniques(&self) -> &[String] {
        &self.uniques
    }

    pub fn store_import(&mut self, i: &Import) {
        self.imports
            .entry(i.name.clone())
            .or_default()
            .insert(i.clone());
    }

    /// The flavors recorded so far for an import name.
    pub fn import_flavors(&self, name: &str) -> Option<&ImportFlavors> {
        self.imports.get(name)
    }

    fn output_string(&mut self, s: &str) {
        // Write failures and short writes are not recoverable mid-emit.
        if let Err(err) = self.dst.write_all(s.as_bytes()) {
            panic!("write to output failed: {}", err);
        }
    }

    fn output(&mut self, s: &str, is_frag: bool) {
        if self.is_newline {
            let tabs = "\t".repeat(self.n_tabs);
            self.output_string(&tabs);
            self.is_newline = false;
        }
        self.output_string(s);
        if !is_frag {
            self.output_string("\n");
            self.is_newline = true;
        } else if !s.is_empty() {
            self.is_newline = false;
        }
    }

    pub fn output_line(&mut self, s: &str) {
        self.output(s, false);
    }

    pub fn output_frag(&mut self, s: &str) {
        self.output(s, true);
    }

    pub fn empty_line(&mut self) {
        self.output_line("");
    }

    pub fn tab(&mut self) {
        self.n_tabs += 1;
    }

    pub fn untab(&mut self) {
        if self.n_tabs == 0 {
            panic!("untab() called too many times");
        }
        self.n_tabs -= 1;
    }

    /// Re-emit a doc comment as `//` lines, dropping leading and trailing
    /// blank lines. Works for any target with `//`-style comments.
    pub fn emit_doc(&mut self, doc: &Option<String>) {
        let raw = match doc {
            Some(raw) if !raw.is_empty() => raw,
            _ => return,
        };
        let mut lines: Vec<&str> = raw.split('\n').collect();
        while lines.first().is_some_and(|l| l.trim().is_empty()) {
            lines.remove(0);
        }
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        for line in lines {
            self.output_line(&format!("// {}", line));
        }
    }
}

const B64_CHAR_MAP: &[u8; 64] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ-_";

/// Render a case position as a compact, self-delimiting wire tag:
/// little-endian base-64 groups over the alphabet `0-9 a-z A-Z - _`.
pub fn b64_encode(mut i: u64) -> String {
    let mut tmp = Vec::with_capacity(11);
    let mut first = true;
    while i > 0 || first {
        let low = (i & 0x3f) as usize;
        tmp.push(B64_CHAR_MAP[low]);
        i >>= 6;
        first = false;
    }
    String::from_utf8(tmp).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_base(buf: &mut Vec<u8>) -> BaseEmitter<&mut Vec<u8>> {
        BaseEmitter::new(
            Metadata {
                package: "test".to_owned(),
                input_name: "test.snowp".to_owned(),
            },
            buf,
        )
    }

    #[test]
    fn b64_single_chars() {
        assert_eq!(b64_encode(0), "0");
        assert_eq!(b64_encode(9), "9");
        assert_eq!(b64_encode(10), "a");
        assert_eq!(b64_encode(35), "z");
        assert_eq!(b64_encode(36), "A");
        assert_eq!(b64_encode(61), "Z");
        assert_eq!(b64_encode(62), "-");
        assert_eq!(b64_encode(63), "_");
    }

    #[test]
    fn b64_multi_chars_are_little_endian() {
        assert_eq!(b64_encode(64), "01");
        assert_eq!(b64_encode(65), "11");
        assert_eq!(b64_encode(64 * 64), "001");
    }

    #[test]
    fn writer_indents_lines_not_frags() {
        let mut buf = Vec::new();
        let mut b = new_base(&mut buf);
        b.output_line("a {");
        b.tab();
        b.output_frag("x");
        b.output_line(" = 1");
        b.untab();
        b.output_line("}");
        drop(b);
        assert_eq!(String::from_utf8(buf).unwrap(), "a {\n\tx = 1\n}\n");
    }

    #[test]
    fn empty_line_terminates_a_fragment() {
        let mut buf = Vec::new();
        let mut b = new_base(&mut buf);
        b.output_frag("frag");
        b.empty_line();
        b.empty_line();
        drop(b);
        assert_eq!(String::from_utf8(buf).unwrap(), "frag\n\n");
    }

    #[test]
    #[should_panic(expected = "untab() called too many times")]
    fn untab_underflow_panics() {
        let mut buf = Vec::new();
        let mut b = new_base(&mut buf);
        b.untab();
    }

    #[test]
    fn doc_trimming() {
        let mut buf = Vec::new();
        let mut b = new_base(&mut buf);
        b.emit_doc(&Some("\n\n first\n second\n\n".to_owned()));
        drop(b);
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "//  first\n//  second\n"
        );
    }
}
