//! Compiler Errors
//!
//! Hard failures of the compiler itself. Diagnostics produced while
//! analyzing user sources are data, not errors; see [`crate::parse_util`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("unknown file kind for '{uri}'")]
    UnknownFileKind { uri: String },

    #[error("no source available for '{uri}'")]
    MissingSource { uri: String },

    #[error("malformed schema document: {0}")]
    MalformedSchema(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CompilerError>;
