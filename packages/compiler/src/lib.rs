//! Nextflow Compiler
//!
//! The analysis core behind the language server: lexers and parsers for
//! scripts and configuration files, source units with per-node metadata,
//! include resolution, name resolution, config schema validation, type
//! checking, formatting, and the incremental caches the editor features
//! are answered from.

pub mod cache;
pub mod chars;
pub mod compiler;
pub mod config;
pub mod error;
pub mod node;
pub mod parse_util;
pub mod resolve;
pub mod schema;
pub mod script;
pub mod symbols;
pub mod types;
pub mod unit;

pub use cache::{AnalysisOptions, AstNodeCache, FileCache};
pub use compiler::{file_kind_of, Compiler};
pub use error::{CompilerError, Result};
pub use parse_util::{
    CompilePhase, ErrorCollector, ParseError, ParseErrorLevel, ParseLocation,
    ParseSourceSpan, SourceFile,
};
pub use unit::{FileKind, SourceUnit, Target};
