//! Scanner for the snowp interface definition language.
//!
//! The scanner is a state machine: each state is a function from the lexer
//! to a transition directive, and a bounded stack of states supports the
//! nested contexts (quoted strings and block comments push; the matching
//! close pops). The whole token sequence is materialized up front; the
//! parser pulls from it with one token of lookahead.

use lazy_static::lazy_static;
use maplit::hashmap;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Eof,
    Error(String),

    At,
    Semi,
    Comma,
    Dot,
    Colon,
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    Equals,
    Arrow,

    Typedef,
    Struct,
    Enum,
    Variant,
    Case,
    Switch,
    Default,
    Void,
    Protocol,
    Errors,
    ArgHeader,
    ResHeader,
    Import,
    GoImport,
    TsImport,
    As,
    Future,
    List,
    Option,
    Blob,
    Text,
    Uint,
    Int,
    Bool,
    True,
    False,

    Identifier(String),
    /// A decimal integer literal, possibly negative. Kept as written.
    IntVal(String),
    /// A `0x` literal with exactly sixteen hex digits. Kept as written.
    Uint64Val(String),
    /// A `0x` literal with exactly eight hex digits. Kept as written.
    Uint32Val(String),
    /// The contents of a double-quoted string, quotes stripped.
    Str(String),
    /// The contents of a `/** ... */` doc comment, delimiters stripped.
    DocComment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
}

lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, TokenKind> = hashmap! {
        "typedef" => TokenKind::Typedef,
        "struct" => TokenKind::Struct,
        "enum" => TokenKind::Enum,
        "variant" => TokenKind::Variant,
        "case" => TokenKind::Case,
        "switch" => TokenKind::Switch,
        "default" => TokenKind::Default,
        "void" => TokenKind::Void,
        "protocol" => TokenKind::Protocol,
        "errors" => TokenKind::Errors,
        "argHeader" => TokenKind::ArgHeader,
        "resHeader" => TokenKind::ResHeader,
        "import" => TokenKind::Import,
        "go:import" => TokenKind::GoImport,
        "ts:import" => TokenKind::TsImport,
        "as" => TokenKind::As,
        "Future" => TokenKind::Future,
        "List" => TokenKind::List,
        "Option" => TokenKind::Option,
        "Blob" => TokenKind::Blob,
        "Text" => TokenKind::Text,
        "Uint" => TokenKind::Uint,
        "Int" => TokenKind::Int,
        "Bool" => TokenKind::Bool,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
    };
}

/// What the machine does after a state function returns.
enum Transition {
    /// Return to the state below on the stack; terminate when it is empty.
    Pop,
    /// Save the current state and enter a nested one.
    Push(StateFn),
    /// Replace the current state without touching the stack.
    Switch(StateFn),
    /// Stay in the current state.
    Keep,
    /// Emit the EOF token and terminate.
    Eof,
    /// Emit an error token and terminate.
    Err(String),
}

type StateFn = fn(&mut Lexer<'_>) -> Transition;

pub struct Lexer<'input> {
    input: &'input str,
    start: usize,
    pos: usize,
    width: usize,
    line: u32,
    /// Single save slot for the `-` lookahead.
    saved: (usize, u32),
    /// Nesting depth of the block comment currently being scanned.
    comment_depth: usize,
    /// Byte offset of the first content character of a doc comment.
    doc_start: usize,
    tokens: Vec<Token>,
}

/// Scan `input` to completion. The returned sequence always ends with
/// either an EOF token or an error token.
pub fn lex(input: &str) -> Vec<Token> {
    let mut l = Lexer {
        input,
        start: 0,
        pos: 0,
        width: 0,
        line: 1,
        saved: (0, 1),
        comment_depth: 0,
        doc_start: 0,
        tokens: Vec::new(),
    };
    l.run();
    l.tokens
}

impl<'input> Lexer<'input> {
    fn run(&mut self) {
        let mut stack: Vec<StateFn> = Vec::new();
        let mut state: Option<StateFn> = Some(initial_state);
        while let Some(f) = state {
            match f(self) {
                Transition::Pop => state = stack.pop(),
                Transition::Push(next) => {
                    stack.push(f);
                    state = Some(next);
                }
                Transition::Switch(next) => state = Some(next),
                Transition::Keep => {}
                Transition::Eof => {
                    self.emit(TokenKind::Eof);
                    state = None;
                }
                Transition::Err(message) => {
                    self.emit(TokenKind::Error(message));
                    state = None;
                }
            }
        }
    }

    fn next_rune(&mut self) -> Option<char> {
        let r = self.input[self.pos..].chars().next()?;
        self.width = r.len_utf8();
        self.pos += self.width;
        if r == '\n' {
            self.line += 1;
        }
        Some(r)
    }

    fn backup(&mut self) {
        self.pos -= self.width;
        if self.input[self.pos..].starts_with('\n') {
            self.line -= 1;
        }
        self.width = 0;
    }

    fn peek(&mut self) -> Option<char> {
        let r = self.next_rune();
        if r.is_some() {
            self.backup();
        }
        r
    }

    /// Second character of lookahead, used only to tell `/**/` from `/** x */`.
    fn peek2(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn save(&mut self) {
        self.saved = (self.pos, self.line);
    }

    fn restore(&mut self) {
        self.pos = self.saved.0;
        self.line = self.saved.1;
        self.width = 0;
    }

    /// Discard the pending text.
    fn eat(&mut self) {
        self.start = self.pos;
    }

    fn txt(&self) -> &str {
        &self.input[self.start..self.pos]
    }

    fn emit(&mut self, kind: TokenKind) {
        self.tokens.push(Token {
            kind,
            line: self.line,
        });
        self.start = self.pos;
    }

    fn emit_identifier(&mut self) {
        let kind = match KEYWORDS.get(self.txt()) {
            Some(kind) => kind.clone(),
            None => TokenKind::Identifier(self.txt().to_owned()),
        };
        self.emit(kind);
    }

    fn scan_identifier(&mut self) -> Transition {
        loop {
            match self.peek() {
                Some(r) if is_ident_cont(r) => {
                    self.next_rune();
                }
                // A colon is allowed mid-identifier only while the partial
                // match is exactly `go` or `ts`.
                Some(':') if self.txt() == "go" || self.txt() == "ts" => {
                    self.next_rune();
                }
                _ => break,
            }
        }
        self.emit_identifier();
        Transition::Keep
    }

    /// Scan a number starting at `self.start` (which may point at a `-`)
    /// and classify the completed text.
    fn scan_number(&mut self) -> Transition {
        loop {
            match self.peek() {
                Some(r) if is_digit(r) || is_hex_letter(r) || r == 'x' => {
                    self.next_rune();
                }
                _ => break,
            }
        }
        let txt = self.txt();
        if let Some(digits) = txt.strip_prefix("0x") {
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()) {
                match digits.len() {
                    16 => {
                        self.emit_number(TokenKind::Uint64Val);
                        return Transition::Keep;
                    }
                    8 => {
                        self.emit_number(TokenKind::Uint32Val);
                        return Transition::Keep;
                    }
                    _ => {}
                }
            }
            return Transition::Err(format!("malformed hex literal: {}", txt));
        }
        let digits = txt.strip_prefix('-').unwrap_or(txt);
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            self.emit_number(TokenKind::IntVal);
            return Transition::Keep;
        }
        Transition::Err(format!("malformed numeric literal: {}", txt))
    }

    fn emit_number(&mut self, make: fn(String) -> TokenKind) {
        let kind = make(self.txt().to_owned());
        self.emit(kind);
    }

    /// Called with the leading `/` already consumed.
    fn begin_comment(&mut self) -> Transition {
        match self.peek() {
            Some('/') => Transition::Switch(line_comment_state),
            Some('*') => {
                self.next_rune();
                self.comment_depth = 1;
                if self.peek() == Some('*') && self.peek2() != Some('/') {
                    self.next_rune();
                    self.doc_start = self.pos;
                    Transition::Push(doc_comment_state)
                } else {
                    Transition::Push(block_comment_state)
                }
            }
            _ => Transition::Err("unexpected character after /".to_owned()),
        }
    }
}

fn initial_state(l: &mut Lexer<'_>) -> Transition {
    loop {
        let r = match l.next_rune() {
            None => return Transition::Eof,
            Some(r) => r,
        };
        if is_letter(r) {
            l.backup();
            return l.scan_identifier();
        }
        if is_digit(r) {
            l.backup();
            return l.scan_number();
        }
        let kind = match r {
            ' ' | '\t' | '\n' | '\r' => {
                l.eat();
                continue;
            }
            '-' => return Transition::Push(dash_state),
            '/' => return l.begin_comment(),
            '"' => {
                l.eat();
                return Transition::Push(string_state);
            }
            '@' => TokenKind::At,
            ';' => TokenKind::Semi,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ':' => TokenKind::Colon,
            '{' => TokenKind::OpenBrace,
            '}' => TokenKind::CloseBrace,
            '(' => TokenKind::OpenParen,
            ')' => TokenKind::CloseParen,
            '[' => TokenKind::OpenBracket,
            ']' => TokenKind::CloseBracket,
            '=' => TokenKind::Equals,
            _ => return Transition::Err(format!("unrecognized character {:?}", r)),
        };
        l.emit(kind);
        return Transition::Keep;
    }
}

/// A `//` comment runs to the end of the line and is discarded.
fn line_comment_state(l: &mut Lexer<'_>) -> Transition {
    loop {
        match l.next_rune() {
            Some('\n') | None => {
                l.eat();
                return Transition::Switch(initial_state);
            }
            Some(_) => {}
        }
    }
}

/// After a `-`: `->` is an arrow, a digit is a negative number (restoring
/// the saved position so number scanning sees it), anything else is an
/// error.
fn dash_state(l: &mut Lexer<'_>) -> Transition {
    l.save();
    match l.next_rune() {
        Some('>') => {
            l.emit(TokenKind::Arrow);
            Transition::Pop
        }
        Some(r) if is_digit(r) => {
            l.restore();
            match l.scan_number() {
                Transition::Keep => Transition::Pop,
                other => other,
            }
        }
        _ => Transition::Err("unexpected character after -".to_owned()),
    }
}

fn string_state(l: &mut Lexer<'_>) -> Transition {
    loop {
        match l.next_rune() {
            None => return Transition::Err("unterminated string".to_owned()),
            Some('\n') => return Transition::Err("newline in quoted string".to_owned()),
            Some('"') => {
                let val = l.input[l.start..l.pos - 1].to_owned();
                l.emit(TokenKind::Str(val));
                return Transition::Pop;
            }
            Some(_) => {}
        }
    }
}

fn block_comment_state(l: &mut Lexer<'_>) -> Transition {
    loop {
        match l.next_rune() {
            None => return Transition::Err("unterminated block comment".to_owned()),
            Some('*') if l.peek() == Some('/') => {
                l.next_rune();
                l.comment_depth -= 1;
                if l.comment_depth == 0 {
                    l.eat();
                }
                return Transition::Pop;
            }
            Some('/') if l.peek() == Some('*') => {
                l.next_rune();
                l.comment_depth += 1;
                return Transition::Push(block_comment_state);
            }
            Some(_) => {}
        }
    }
}

/// Like [`block_comment_state`] but the outermost close emits the comment
/// body as a doc token.
fn doc_comment_state(l: &mut Lexer<'_>) -> Transition {
    loop {
        match l.next_rune() {
            None => return Transition::Err("unterminated block comment".to_owned()),
            Some('*') if l.peek() == Some('/') => {
                l.next_rune();
                l.comment_depth -= 1;
                if l.comment_depth == 0 {
                    let doc = l.input[l.doc_start..l.pos - 2].to_owned();
                    l.eat();
                    l.emit(TokenKind::DocComment(doc));
                }
                return Transition::Pop;
            }
            Some('/') if l.peek() == Some('*') => {
                l.next_rune();
                l.comment_depth += 1;
                return Transition::Push(doc_comment_state);
            }
            Some(_) => {}
        }
    }
}

fn is_letter(r: char) -> bool {
    r.is_ascii_lowercase() || r.is_ascii_uppercase()
}

fn is_digit(r: char) -> bool {
    r.is_ascii_digit()
}

/// Identifiers are `[A-Za-z][A-Za-z0-9_]*`; only the continuation set
/// admits underscores.
fn is_ident_cont(r: char) -> bool {
    is_letter(r) || is_digit(r) || r == '_'
}

fn is_hex_letter(r: char) -> bool {
    matches!(r, 'a'..='f' | 'A'..='F')
}
