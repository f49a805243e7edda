//! A pre-emit pass over the AST that records which kinds of statements are
//! present, so the emitter can pick the right preamble imports.

use crate::ast::{Root, Statement};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Inventory {
    pub rpc: bool,
    pub variant: bool,
    pub strct: bool,
    pub typedef: bool,
    pub unique: bool,
    pub import: bool,
}

impl Inventory {
    pub fn collect(root: &Root) -> Inventory {
        let mut inv = Inventory::default();
        for s in &root.stmts {
            inv.add(s);
        }
        inv
    }

    fn add(&mut self, s: &Statement) {
        let unique = match s {
            Statement::Import(_) => {
                self.import = true;
                return;
            }
            Statement::Typedef(t) => {
                self.typedef = true;
                &t.decl.unique
            }
            Statement::Enum(e) => &e.decl.unique,
            Statement::Struct(st) => {
                self.strct = true;
                &st.decl.unique
            }
            Statement::Variant(v) => {
                self.variant = true;
                &v.decl.unique
            }
            Statement::Protocol(_) => {
                self.rpc = true;
                self.unique = true;
                return;
            }
        };
        if unique.is_some() {
            self.unique = true;
        }
    }

    /// The Go standard-library and runtime imports the generated file
    /// needs.
    pub fn imports(&self) -> Vec<&'static str> {
        let mut ret = Vec::new();
        if self.rpc || self.variant {
            ret.push("errors");
        }
        if self.variant {
            ret.push("fmt");
        }
        if self.rpc {
            ret.push("context");
            ret.push("time");
        }
        if self.rpc || self.unique || self.strct || self.variant || self.typedef {
            ret.push("github.com/foks-proj/go-snowpack-rpc/rpc");
        }
        ret
    }
}
