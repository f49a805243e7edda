//! Parser for the snowp interface definition language.
//!
//! Hand-written recursive descent with one token of lookahead. All errors
//! are fatal; the first one aborts the compile of the current file.

use std::collections::HashSet;

use crate::ast::*;
use crate::error::Error;
use crate::lexer::{lex, Token, TokenKind};

/// Parse one input file into its AST.
pub fn parse(input: &str, filename: &str) -> Result<Root, Error> {
    let tokens = lex(input);
    Parser {
        tokens,
        pos: 0,
        filename: filename.to_owned(),
        pending_doc: None,
    }
    .parse_root()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    filename: String,
    /// The most recent doc comment, waiting to be claimed by the next
    /// statement or method.
    pending_doc: Option<String>,
}

impl Parser {
    fn peek(&self) -> &Token {
        // The token stream always ends with an EOF or error token.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn err(&self, message: impl Into<String>) -> Error {
        Error::Parse {
            filename: self.filename.clone(),
            line: self.peek().line,
            message: message.into(),
        }
    }

    /// Look at the current token, surfacing a scanner error token as a
    /// terminal lexical error.
    fn current(&self) -> Result<&TokenKind, Error> {
        let tok = self.peek();
        if let TokenKind::Error(message) = &tok.kind {
            return Err(Error::Lex {
                filename: self.filename.clone(),
                line: tok.line,
                message: message.clone(),
            });
        }
        Ok(&tok.kind)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), Error> {
        if self.current()? == &kind {
            self.bump();
            Ok(())
        } else {
            Err(self.err(format!("expected {}", what)))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String, Error> {
        match self.current()? {
            TokenKind::Identifier(_) => match self.bump().kind {
                TokenKind::Identifier(name) => Ok(name),
                _ => unreachable!(),
            },
            _ => Err(self.err(format!("expected {}", what))),
        }
    }

    fn expect_int(&mut self, what: &str) -> Result<i64, Error> {
        match self.current()? {
            TokenKind::IntVal(raw) => {
                let raw = raw.clone();
                self.bump();
                raw.parse::<i64>()
                    .map_err(|_| Error::Semantic(format!("malformed integer literal: {}", raw)))
            }
            _ => Err(self.err(format!("expected {}", what))),
        }
    }

    /// A non-negative integer position, as used by fields, params, methods
    /// and variant cases.
    fn expect_position(&mut self, what: &str) -> Result<u64, Error> {
        let n = self.expect_int(what)?;
        u64::try_from(n).map_err(|_| Error::Semantic(format!("{} must be non-negative", what)))
    }

    /// Stash doc comments; the latest one wins.
    fn take_docs(&mut self) -> Result<(), Error> {
        while let TokenKind::DocComment(_) = self.current()? {
            if let TokenKind::DocComment(doc) = self.bump().kind {
                self.pending_doc = Some(doc);
            }
        }
        Ok(())
    }

    fn decorators(&mut self) -> Decorators {
        Decorators {
            doc: self.pending_doc.take(),
        }
    }

    /// Swallow an optional statement or member terminator.
    fn eat_semi(&mut self) -> Result<(), Error> {
        if self.current()? == &TokenKind::Semi {
            self.bump();
        }
        Ok(())
    }

    /// Swallow a member separator (`,` or `;`), if present.
    fn eat_separator(&mut self) -> Result<(), Error> {
        match self.current()? {
            TokenKind::Comma | TokenKind::Semi => {
                self.bump();
            }
            _ => {}
        }
        Ok(())
    }

    fn parse_root(&mut self) -> Result<Root, Error> {
        let mut stmts = Vec::new();
        loop {
            self.take_docs()?;
            let stmt = match self.current()? {
                TokenKind::Eof => break,
                TokenKind::Semi => {
                    self.bump();
                    continue;
                }
                TokenKind::Typedef => self.parse_typedef()?,
                TokenKind::Struct => self.parse_struct()?,
                TokenKind::Enum => self.parse_enum()?,
                TokenKind::Variant => self.parse_variant()?,
                TokenKind::Protocol => self.parse_protocol()?,
                TokenKind::Import | TokenKind::GoImport | TokenKind::TsImport => {
                    self.parse_import()?
                }
                _ => return Err(self.err("expected a statement")),
            };
            stmts.push(stmt);
        }
        Ok(Root { stmts })
    }

    /// `@` followed by a 32- or 64-bit hex unique id.
    fn parse_unique(&mut self) -> Result<UniqueID, Error> {
        self.expect(TokenKind::At, "`@`")?;
        match self.current()? {
            TokenKind::Uint64Val(raw) | TokenKind::Uint32Val(raw) => {
                let id = UniqueID(raw.clone());
                self.bump();
                Ok(id)
            }
            _ => Err(self.err("expected a hex unique id")),
        }
    }

    fn parse_unique_opt(&mut self) -> Result<Option<UniqueID>, Error> {
        if self.current()? == &TokenKind::At {
            Ok(Some(self.parse_unique()?))
        } else {
            Ok(None)
        }
    }

    fn parse_typedef(&mut self) -> Result<Statement, Error> {
        let dec = self.decorators();
        self.bump();
        let name = self.expect_identifier("a typedef name")?;
        self.expect(TokenKind::Equals, "`=`")?;
        let ty = self.parse_type()?;
        if ty.is_void() {
            return Err(self.err("void is not a valid typedef target"));
        }
        let unique = self.parse_unique_opt()?;
        self.eat_semi()?;
        Ok(Statement::Typedef(Typedef {
            decl: TypeDecl { dec, name, unique },
            ty,
        }))
    }

    fn parse_struct(&mut self) -> Result<Statement, Error> {
        let dec = self.decorators();
        self.bump();
        let name = self.expect_identifier("a struct name")?;
        let unique = self.parse_unique_opt()?;
        self.expect(TokenKind::OpenBrace, "`{`")?;
        let mut fields = Vec::new();
        loop {
            self.take_docs()?;
            self.pending_doc = None;
            if self.current()? == &TokenKind::CloseBrace {
                self.bump();
                break;
            }
            fields.push(self.parse_field()?);
            self.eat_separator()?;
        }
        check_field_positions(&fields, &name)?;
        Ok(Statement::Struct(Struct {
            decl: TypeDecl { dec, name, unique },
            fields,
        }))
    }

    fn parse_field(&mut self) -> Result<Field, Error> {
        let name = self.expect_identifier("a field name")?;
        self.expect(TokenKind::At, "`@`")?;
        let pos = self.expect_position("field position")?;
        self.expect(TokenKind::Colon, "`:`")?;
        let ty = self.parse_type()?;
        if ty.is_void() {
            return Err(self.err("void is not a valid field type"));
        }
        Ok(Field { name, pos, ty })
    }

    fn parse_enum(&mut self) -> Result<Statement, Error> {
        let dec = self.decorators();
        self.bump();
        let name = self.expect_identifier("an enum name")?;
        let unique = self.parse_unique_opt()?;
        self.expect(TokenKind::OpenBrace, "`{`")?;
        let mut values = Vec::new();
        loop {
            self.take_docs()?;
            self.pending_doc = None;
            if self.current()? == &TokenKind::CloseBrace {
                self.bump();
                break;
            }
            let vname = self.expect_identifier("an enum value name")?;
            self.expect(TokenKind::At, "`@`")?;
            let num = self.expect_int("enum value")?;
            values.push(EnumValue { name: vname, num });
            self.eat_separator()?;
        }
        Ok(Statement::Enum(Enum {
            decl: TypeDecl { dec, name, unique },
            values,
        }))
    }

    fn parse_variant(&mut self) -> Result<Statement, Error> {
        let dec = self.decorators();
        self.bump();
        let name = self.expect_identifier("a variant name")?;
        let unique = self.parse_unique_opt()?;
        self.expect(TokenKind::Switch, "`switch`")?;
        self.expect(TokenKind::OpenParen, "`(`")?;
        let switch_var = self.expect_identifier("a switch variable name")?;
        self.expect(TokenKind::Colon, "`:`")?;
        let switch_type = self.parse_type()?;
        if switch_type.is_void() {
            return Err(self.err("void is not a valid switch type"));
        }
        self.expect(TokenKind::CloseParen, "`)`")?;
        self.expect(TokenKind::OpenBrace, "`{`")?;
        let mut cases = Vec::new();
        loop {
            self.take_docs()?;
            self.pending_doc = None;
            match self.current()? {
                TokenKind::CloseBrace => {
                    self.bump();
                    break;
                }
                TokenKind::Case | TokenKind::Default => cases.push(self.parse_case()?),
                _ => return Err(self.err("expected `case`, `default` or `}`")),
            }
        }
        let variant = Variant {
            decl: TypeDecl { dec, name, unique },
            switch_var,
            switch_type,
            cases,
        };
        check_variant(&variant)?;
        Ok(Statement::Variant(variant))
    }

    fn parse_case(&mut self) -> Result<Case, Error> {
        let labels = match self.current()? {
            TokenKind::Default => {
                self.bump();
                Vec::new()
            }
            _ => {
                self.bump();
                let mut labels = vec![self.parse_case_label()?];
                while self.current()? == &TokenKind::Comma {
                    self.bump();
                    labels.push(self.parse_case_label()?);
                }
                labels
            }
        };
        let position = if self.current()? == &TokenKind::At {
            self.bump();
            Some(self.expect_position("case position")?)
        } else {
            None
        };
        self.expect(TokenKind::Colon, "`:`")?;
        let ty = self.parse_type()?;
        self.eat_separator()?;
        Ok(Case {
            labels,
            position,
            ty,
        })
    }

    fn parse_case_label(&mut self) -> Result<CaseLabel, Error> {
        match self.current()? {
            TokenKind::Identifier(_) => {
                let name = self.expect_identifier("a case label")?;
                Ok(CaseLabel::Ident(name))
            }
            TokenKind::IntVal(_) => Ok(CaseLabel::Num(self.expect_int("a case label")?)),
            TokenKind::True => {
                self.bump();
                Ok(CaseLabel::Bool(true))
            }
            TokenKind::False => {
                self.bump();
                Ok(CaseLabel::Bool(false))
            }
            _ => Err(self.err("expected a case label")),
        }
    }

    fn parse_protocol(&mut self) -> Result<Statement, Error> {
        let dec = self.decorators();
        self.bump();
        let name = self.expect_identifier("a protocol name")?;
        let unique = self.parse_unique()?;
        let mut modifiers = Vec::new();
        loop {
            let modifier = match self.current()? {
                TokenKind::Errors => ProtocolModifier::Errors as fn(Type) -> ProtocolModifier,
                TokenKind::ArgHeader => ProtocolModifier::ArgHeader,
                TokenKind::ResHeader => ProtocolModifier::ResHeader,
                _ => break,
            };
            self.bump();
            self.expect(TokenKind::OpenParen, "`(`")?;
            let ty = self.parse_type()?;
            if ty.is_void() {
                return Err(self.err("void is not a valid modifier type"));
            }
            self.expect(TokenKind::CloseParen, "`)`")?;
            modifiers.push(modifier(ty));
        }
        let modifiers = ProtocolModifiers::new(modifiers)?;
        self.expect(TokenKind::OpenBrace, "`{`")?;
        let mut methods = Vec::new();
        loop {
            self.take_docs()?;
            if self.current()? == &TokenKind::CloseBrace {
                self.pending_doc = None;
                self.bump();
                break;
            }
            methods.push(self.parse_method()?);
        }
        check_method_positions(&methods, &name)?;
        Ok(Statement::Protocol(Protocol {
            dec,
            name,
            unique,
            modifiers,
            methods,
        }))
    }

    fn parse_method(&mut self) -> Result<Method, Error> {
        let dec = self.decorators();
        let name = self.expect_identifier("a method name")?;
        self.expect(TokenKind::At, "`@`")?;
        let pos = self.expect_position("method position")?;
        self.expect(TokenKind::OpenParen, "`(`")?;
        let mut params = Vec::new();
        if self.current()? != &TokenKind::CloseParen {
            loop {
                let pname = self.expect_identifier("a parameter name")?;
                self.expect(TokenKind::At, "`@`")?;
                let ppos = self.expect_position("parameter position")?;
                self.expect(TokenKind::Colon, "`:`")?;
                let pty = self.parse_type()?;
                if pty.is_void() {
                    return Err(self.err("void is not a valid parameter type"));
                }
                params.push(Param {
                    name: pname,
                    pos: ppos,
                    ty: pty,
                });
                if self.current()? == &TokenKind::Comma {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::CloseParen, "`)`")?;
        self.expect(TokenKind::Arrow, "`->`")?;
        let res_type = self.parse_type()?;
        let arg_type = if self.current()? == &TokenKind::As {
            self.bump();
            Some(self.expect_identifier("an argument struct name")?)
        } else {
            None
        };
        self.eat_semi()?;
        check_field_positions(
            &params.iter().map(Param::to_field).collect::<Vec<_>>(),
            &name,
        )?;
        Ok(Method {
            dec,
            name,
            pos,
            params,
            arg_type,
            res_type,
        })
    }

    fn parse_import(&mut self) -> Result<Statement, Error> {
        let lang = match self.current()? {
            TokenKind::GoImport => Language::Go,
            TokenKind::TsImport => Language::TypeScript,
            _ => Language::Generic,
        };
        self.bump();
        let path = match self.current()? {
            TokenKind::Str(_) => match self.bump().kind {
                TokenKind::Str(path) => path,
                _ => unreachable!(),
            },
            _ => return Err(self.err("expected a quoted import path")),
        };
        self.expect(TokenKind::As, "`as`")?;
        let name = self.expect_identifier("an import name")?;
        self.eat_semi()?;
        Ok(Statement::Import(Import { path, name, lang }))
    }

    fn parse_type(&mut self) -> Result<Type, Error> {
        let ty = match self.current()? {
            TokenKind::Void => Type::Void,
            TokenKind::Bool => Type::Bool,
            TokenKind::Int => Type::Int,
            TokenKind::Uint => Type::Uint,
            TokenKind::Text => Type::Text,
            TokenKind::Blob => {
                self.bump();
                let count = if self.current()? == &TokenKind::OpenParen {
                    self.bump();
                    let count = self.expect_position("blob length")?;
                    self.expect(TokenKind::CloseParen, "`)`")?;
                    count
                } else {
                    0
                };
                return Ok(Type::Blob(count));
            }
            TokenKind::Future => {
                self.bump();
                return Ok(Type::Future(Box::new(self.parse_type_args()?)));
            }
            TokenKind::List => {
                self.bump();
                return Ok(Type::List(Box::new(self.parse_type_args()?)));
            }
            TokenKind::Option => {
                self.bump();
                return Ok(Type::Option(Box::new(self.parse_type_args()?)));
            }
            TokenKind::Identifier(_) => {
                let first = self.expect_identifier("a type name")?;
                return Ok(if self.current()? == &TokenKind::Dot {
                    self.bump();
                    let name = self.expect_identifier("a type name")?;
                    Type::Derived(DerivedType {
                        name,
                        imported_from: Some(first),
                    })
                } else {
                    Type::Derived(DerivedType {
                        name: first,
                        imported_from: None,
                    })
                });
            }
            _ => return Err(self.err("expected a type")),
        };
        self.bump();
        Ok(ty)
    }

    /// The parenthesized inner type of `List`, `Option` and `Future`.
    fn parse_type_args(&mut self) -> Result<Type, Error> {
        self.expect(TokenKind::OpenParen, "`(`")?;
        let inner = self.parse_type()?;
        if inner.is_void() {
            return Err(self.err("void is not a valid element type"));
        }
        self.expect(TokenKind::CloseParen, "`)`")?;
        Ok(inner)
    }
}

fn check_field_positions(fields: &[Field], owner: &str) -> Result<(), Error> {
    let mut seen = HashSet::new();
    for f in fields {
        if !seen.insert(f.pos) {
            return Err(Error::Semantic(format!(
                "duplicate position {} in {}",
                f.pos, owner
            )));
        }
    }
    Ok(())
}

fn check_method_positions(methods: &[Method], protocol: &str) -> Result<(), Error> {
    let mut seen = HashSet::new();
    for m in methods {
        if !seen.insert(m.pos) {
            return Err(Error::Semantic(format!(
                "duplicate method position {} in protocol {}",
                m.pos, protocol
            )));
        }
    }
    Ok(())
}

fn check_variant(v: &Variant) -> Result<(), Error> {
    let mut defaults = 0;
    let mut positions = HashSet::new();
    let mut labels: Vec<&CaseLabel> = Vec::new();
    for c in &v.cases {
        if c.labels.is_empty() {
            defaults += 1;
            if defaults > 1 {
                return Err(Error::Semantic(format!(
                    "multiple default cases in variant {}",
                    v.decl.name
                )));
            }
        }
        for l in &c.labels {
            if labels.contains(&l) {
                return Err(Error::Semantic(format!(
                    "duplicate case label in variant {}",
                    v.decl.name
                )));
            }
            labels.push(l);
        }
        match (c.position, c.has_data()) {
            (None, true) => {
                return Err(Error::Semantic(format!(
                    "case with data needs a position in variant {}",
                    v.decl.name
                )))
            }
            (Some(_), false) => {
                return Err(Error::Semantic(format!(
                    "void case cannot take a position in variant {}",
                    v.decl.name
                )))
            }
            _ => {}
        }
        if let Some(p) = c.position {
            if !positions.insert(p) {
                return Err(Error::Semantic(format!(
                    "duplicate case position {} in variant {}",
                    p, v.decl.name
                )));
            }
        }
    }
    Ok(())
}
