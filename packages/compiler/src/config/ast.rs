//! Config AST
//!
//! Node definitions for Nextflow configuration files: a flat tree of
//! assignments, scoped blocks, selector blocks, includes and plugin apply
//! blocks. Value expressions reuse the script expression nodes.

use serde::{Deserialize, Serialize};

use crate::parse_util::ParseSourceSpan;
use crate::script::ast::{Expression, NodeId, Statement};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigModule {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub statements: Vec<ConfigStatement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConfigStatement {
    Assign(ConfigAssign),
    Block(ConfigBlock),
    Include(ConfigInclude),
    Apply(ConfigApply),
    Incomplete(ConfigIncomplete),
}

/// `process.executor = 'slurm'`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigAssign {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    /// Dotted name path, one element per segment.
    pub names: Vec<String>,
    pub name_span: ParseSourceSpan,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigBlockKind {
    /// `process { ... }`
    Named(String),
    /// `withLabel:big_mem { ... }`
    Selector { kind: String, target: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigBlock {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub kind: ConfigBlockKind,
    pub name_span: ParseSourceSpan,
    pub statements: Vec<ConfigStatement>,
}

impl ConfigBlock {
    pub fn name(&self) -> String {
        match &self.kind {
            ConfigBlockKind::Named(name) => name.clone(),
            ConfigBlockKind::Selector { kind, target } => format!("{}:{}", kind, target),
        }
    }
}

/// `includeConfig 'base.config'`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigInclude {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub source: Expression,
}

/// Unqualified plugin block invoking items, e.g. `apply { ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigApply {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub name: String,
    pub statements: Vec<Statement>,
}

/// Partial input (`foo.` at end of file) retained for completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigIncomplete {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub text: String,
}

impl ConfigStatement {
    pub fn id(&self) -> NodeId {
        match self {
            ConfigStatement::Assign(s) => s.id,
            ConfigStatement::Block(s) => s.id,
            ConfigStatement::Include(s) => s.id,
            ConfigStatement::Apply(s) => s.id,
            ConfigStatement::Incomplete(s) => s.id,
        }
    }

    pub fn span(&self) -> ParseSourceSpan {
        match self {
            ConfigStatement::Assign(s) => s.span,
            ConfigStatement::Block(s) => s.span,
            ConfigStatement::Include(s) => s.span,
            ConfigStatement::Apply(s) => s.span,
            ConfigStatement::Incomplete(s) => s.span,
        }
    }
}
