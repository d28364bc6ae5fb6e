//! Feature providers, each computing one LSP answer from the analysis
//! caches. Providers never fail a request: missing ASTs and stale
//! positions produce empty results.

pub mod completion;
pub mod definition;
pub mod diagnostics;
pub mod formatting;
pub mod hover;
pub mod links;
pub mod references;
pub mod semantic_tokens;
pub mod symbols;

use nextflow_compiler::parse_util::{ParseLocation, ParseSourceSpan};
use tower_lsp::lsp_types::{Position, Range};

pub fn to_position(location: ParseLocation) -> Position {
    Position {
        line: location.line as u32,
        character: location.col as u32,
    }
}

pub fn to_range(span: ParseSourceSpan) -> Range {
    Range {
        start: to_position(span.start),
        end: to_position(span.end),
    }
}

/// Snapshot of the edit counter taken at request start; providers check
/// it at coarse boundaries and bail out quietly when an edit superseded
/// the request.
#[derive(Debug, Clone, Copy)]
pub struct CancellationToken {
    snapshot: u64,
}

impl CancellationToken {
    pub fn new(snapshot: u64) -> Self {
        CancellationToken { snapshot }
    }

    pub fn is_cancelled(&self, current: u64) -> bool {
        current != self.snapshot
    }
}
