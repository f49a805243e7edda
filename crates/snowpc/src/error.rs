//! Compile errors.

use thiserror::Error;

/// Any error raised while compiling a single input file. Lexical and
/// syntactic errors render as `{filename}:{line}: {message}`; semantic
/// errors are raised while the AST is being built and carry no source
/// location.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{filename}:{line}: {message}")]
    Lex {
        filename: String,
        line: u32,
        message: String,
    },
    #[error("{filename}:{line}: {message}")]
    Parse {
        filename: String,
        line: u32,
        message: String,
    },
    #[error("{0}")]
    Semantic(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
