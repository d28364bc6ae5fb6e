//! Source Units
//!
//! One compilation artifact per URI: source text, AST root, per-phase
//! diagnostics and the side tables that phases attach to nodes (inferred
//! types, resolved targets, include state). Units are replaced wholesale
//! on re-parse and mutated in place by later phases.

use std::collections::HashMap;

use crate::config::ast::ConfigModule;
use crate::node::AnyNode;
use crate::parse_util::{ErrorCollector, ParseSourceSpan, SourceFile};
use crate::script::ast::{NodeId, ScriptModule};
use crate::symbols::Definition;
use crate::types::ty::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Script,
    Config,
}

#[derive(Debug)]
pub enum UnitAst {
    Script(ScriptModule),
    Config(ConfigModule),
}

/// What a reference node points at.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A node in a workspace file (declaration, definition, include entry).
    Node { uri: String, node: NodeId, span: ParseSourceSpan },
    /// A synthetic DSL member.
    Builtin { scope: &'static str, member: String },
}

/// Per-node metadata side tables, keyed by node id.
#[derive(Debug, Default)]
pub struct NodeMetadata {
    /// `INFERRED_TYPE` slot for expressions.
    inferred_types: HashMap<NodeId, Type>,
    /// Resolved targets of variable, property and call nodes.
    targets: HashMap<NodeId, Target>,
    /// Types of declarations (parameters pick theirs up during closure
    /// inference).
    variable_types: HashMap<NodeId, Type>,
}

impl NodeMetadata {
    pub fn set_type(&mut self, node: NodeId, ty: Type) {
        self.inferred_types.insert(node, ty);
    }

    pub fn get_type(&self, node: NodeId) -> Type {
        self.inferred_types.get(&node).cloned().unwrap_or(Type::Dynamic)
    }

    pub fn has_type(&self, node: NodeId) -> bool {
        self.inferred_types.contains_key(&node)
    }

    pub fn set_target(&mut self, node: NodeId, target: Target) {
        self.targets.insert(node, target);
    }

    pub fn target(&self, node: NodeId) -> Option<&Target> {
        self.targets.get(&node)
    }

    pub fn targets(&self) -> impl Iterator<Item = (&NodeId, &Target)> {
        self.targets.iter()
    }

    pub fn set_variable_type(&mut self, decl: NodeId, ty: Type) {
        self.variable_types.insert(decl, ty);
    }

    pub fn variable_type(&self, decl: NodeId) -> Option<&Type> {
        self.variable_types.get(&decl)
    }

    pub fn clear_types(&mut self) {
        self.inferred_types.clear();
        self.variable_types.clear();
    }

    pub fn clear_targets(&mut self) {
        self.targets.clear();
    }
}

/// Cached resolution state of one include entry.
#[derive(Debug, Clone)]
pub struct IncludeTarget {
    pub entry: NodeId,
    pub name: String,
    pub local_name: String,
    pub definition: Option<Definition>,
}

/// Cached resolution state of one include declaration.
#[derive(Debug, Clone)]
pub struct IncludeState {
    pub decl: NodeId,
    pub source: String,
    pub resolved_uri: Option<String>,
    pub entries: Vec<IncludeTarget>,
    /// Set once resolution ran; cleared when the edge is invalidated.
    pub resolved: bool,
}

/// Typed call shape of a process definition.
#[derive(Debug, Clone)]
pub struct ProcessSignature {
    pub name: String,
    pub node: NodeId,
    pub inputs: Vec<(String, Type)>,
    pub outputs: Vec<(Option<String>, Type)>,
}

/// Typed call shape of a named workflow.
#[derive(Debug, Clone)]
pub struct WorkflowSignature {
    pub name: Option<String>,
    pub node: NodeId,
    pub takes: Vec<String>,
    pub emits: Vec<(Option<String>, Type)>,
}

#[derive(Debug)]
pub struct SourceUnit {
    pub uri: String,
    pub file: SourceFile,
    pub kind: FileKind,
    pub ast: UnitAst,
    pub errors: ErrorCollector,
    pub metadata: NodeMetadata,
    pub node_count: u32,
    pub includes: Vec<IncludeState>,
    pub definitions: Vec<Definition>,
    pub process_signatures: HashMap<String, ProcessSignature>,
    pub workflow_signatures: HashMap<String, WorkflowSignature>,
}

impl SourceUnit {
    pub fn root(&self) -> AnyNode<'_> {
        match &self.ast {
            UnitAst::Script(module) => AnyNode::ScriptModule(module),
            UnitAst::Config(module) => AnyNode::ConfigModule(module),
        }
    }

    pub fn script(&self) -> Option<&ScriptModule> {
        match &self.ast {
            UnitAst::Script(module) => Some(module),
            _ => None,
        }
    }

    pub fn config(&self) -> Option<&ConfigModule> {
        match &self.ast {
            UnitAst::Config(module) => Some(module),
            _ => None,
        }
    }

    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// Include table: local name → resolved include target.
    pub fn include_table(&self) -> HashMap<&str, &IncludeTarget> {
        let mut table = HashMap::new();
        for state in &self.includes {
            for entry in &state.entries {
                table.insert(entry.local_name.as_str(), entry);
            }
        }
        table
    }
}
