//! Parse Utilities
//!
//! Source files, locations, spans and the diagnostic type shared by every
//! compile phase.

use serde::{Deserialize, Serialize};

use crate::chars;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceFile {
    pub content: String,
    pub url: String,
}

impl SourceFile {
    pub fn new(content: String, url: String) -> Self {
        SourceFile { content, url }
    }

    /// Convert a (line, col) position into a byte offset.
    ///
    /// Positions past the end of a line clamp to the line end; a line past
    /// the end of the file yields the file length.
    pub fn offset_at(&self, line: usize, col: usize) -> usize {
        let mut current_line = 0;
        let mut line_start = 0;
        if line > 0 {
            let mut found = false;
            for (idx, ch) in self.content.char_indices() {
                if ch == chars::NEWLINE {
                    current_line += 1;
                    if current_line == line {
                        line_start = idx + 1;
                        found = true;
                        break;
                    }
                }
            }
            if !found {
                return self.content.len();
            }
        }
        let line_end = self.content[line_start..]
            .find(chars::NEWLINE)
            .map(|i| line_start + i)
            .unwrap_or(self.content.len());
        (line_start + col).min(line_end)
    }

    /// Convert a byte offset into a (line, col) position.
    ///
    /// Offsets outside the file yield `(-1, -1)` encoded as `None`.
    pub fn position_at(&self, offset: usize) -> Option<(usize, usize)> {
        if offset > self.content.len() {
            return None;
        }
        let mut line = 0;
        let mut line_start = 0;
        for (idx, ch) in self.content.char_indices() {
            if idx >= offset {
                break;
            }
            if ch == chars::NEWLINE {
                line += 1;
                line_start = idx + 1;
            }
        }
        Some((line, offset - line_start))
    }
}

/// A point in a source file. Line and column are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParseLocation {
    pub offset: usize,
    pub line: usize,
    pub col: usize,
}

impl ParseLocation {
    pub fn new(offset: usize, line: usize, col: usize) -> Self {
        ParseLocation { offset, line, col }
    }

    pub fn zero() -> Self {
        ParseLocation { offset: 0, line: 0, col: 0 }
    }
}

impl std::fmt::Display for ParseLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// A half-open span between two locations in one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParseSourceSpan {
    pub start: ParseLocation,
    pub end: ParseLocation,
}

impl ParseSourceSpan {
    pub fn new(start: ParseLocation, end: ParseLocation) -> Self {
        ParseSourceSpan { start, end }
    }

    pub fn empty() -> Self {
        ParseSourceSpan { start: ParseLocation::zero(), end: ParseLocation::zero() }
    }

    pub fn contains(&self, line: usize, col: usize) -> bool {
        let after_start = line > self.start.line
            || (line == self.start.line && col >= self.start.col);
        let before_end =
            line < self.end.line || (line == self.end.line && col <= self.end.col);
        after_start && before_end
    }

    /// True when `other` lies entirely within this span.
    pub fn encloses(&self, other: &ParseSourceSpan) -> bool {
        self.start.offset <= other.start.offset && other.end.offset <= self.end.offset
    }

    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The ordered phases of the analysis pipeline. Every diagnostic carries
/// the phase that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CompilePhase {
    Syntax,
    IncludeResolution,
    NameResolution,
    TypeChecking,
}

impl CompilePhase {
    pub const ALL: [CompilePhase; 4] = [
        CompilePhase::Syntax,
        CompilePhase::IncludeResolution,
        CompilePhase::NameResolution,
        CompilePhase::TypeChecking,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseErrorLevel {
    Error,
    Warning,
    /// Forward-deprecation signal. Downgraded to informational when the
    /// client suppresses future warnings.
    Future,
}

/// A pointer from a diagnostic to a related location, e.g. the first
/// declaration behind an already-declared error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedInformation {
    pub uri: String,
    pub span: ParseSourceSpan,
    pub message: String,
}

/// A diagnostic attached to a span of one source unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseError {
    pub span: ParseSourceSpan,
    pub msg: String,
    pub level: ParseErrorLevel,
    pub phase: CompilePhase,
    pub related: Option<RelatedInformation>,
}

impl ParseError {
    pub fn new(span: ParseSourceSpan, msg: impl Into<String>, phase: CompilePhase) -> Self {
        ParseError {
            span,
            msg: msg.into(),
            level: ParseErrorLevel::Error,
            phase,
            related: None,
        }
    }

    pub fn warning(span: ParseSourceSpan, msg: impl Into<String>, phase: CompilePhase) -> Self {
        ParseError {
            span,
            msg: msg.into(),
            level: ParseErrorLevel::Warning,
            phase,
            related: None,
        }
    }

    pub fn future(span: ParseSourceSpan, msg: impl Into<String>, phase: CompilePhase) -> Self {
        ParseError {
            span,
            msg: msg.into(),
            level: ParseErrorLevel::Future,
            phase,
            related: None,
        }
    }

    pub fn with_related(mut self, related: RelatedInformation) -> Self {
        self.related = Some(related);
        self
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.msg, self.span.start)
    }
}

/// Per-unit accumulator, grouped by phase so a re-run of one phase can
/// drop exactly its own diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ErrorCollector {
    errors: Vec<ParseError>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        ErrorCollector { errors: Vec::new() }
    }

    pub fn push(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = ParseError>) {
        self.errors.extend(errors);
    }

    /// Remove all diagnostics a phase produced, ahead of re-running it.
    pub fn clear_phase(&mut self, phase: CompilePhase) {
        self.errors.retain(|e| e.phase != phase);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParseError> {
        self.errors.iter()
    }

    pub fn phase(&self, phase: CompilePhase) -> impl Iterator<Item = &ParseError> {
        self.errors.iter().filter(move |e| e.phase == phase)
    }

    pub fn has_errors_in(&self, phase: CompilePhase) -> bool {
        self.errors
            .iter()
            .any(|e| e.phase == phase && e.level == ParseErrorLevel::Error)
    }

    pub fn all(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}
