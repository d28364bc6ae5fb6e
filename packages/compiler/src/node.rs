//! Generic node handles
//!
//! A borrowed, uniform view over script and config trees. The caches use
//! it to build parent maps and position indexes and to scan for reference
//! targets without one visitor per consumer.

use std::collections::HashMap;

use crate::config::ast::{ConfigModule, ConfigStatement};
use crate::parse_util::ParseSourceSpan;
use crate::script::ast::{
    CatchClause, Declaration, EmitEntry, Expression, IncludeEntry, MapEntry, NamedArg,
    NodeId, OutputTarget, Param, PublishEntry, ScriptModule, Statement, TakeEntry,
    TypeAnnotation, VarDeclName,
};

#[derive(Debug, Clone, Copy)]
pub enum AnyNode<'a> {
    ScriptModule(&'a ScriptModule),
    Declaration(&'a Declaration),
    IncludeEntry(&'a IncludeEntry),
    TakeEntry(&'a TakeEntry),
    EmitEntry(&'a EmitEntry),
    PublishEntry(&'a PublishEntry),
    Param(&'a Param),
    VarDeclName(&'a VarDeclName),
    MapEntry(&'a MapEntry),
    NamedArg(&'a NamedArg),
    CatchClause(&'a CatchClause),
    OutputTarget(&'a OutputTarget),
    TypeAnnotation(&'a TypeAnnotation),
    Statement(&'a Statement),
    Expression(&'a Expression),
    ConfigModule(&'a ConfigModule),
    ConfigStatement(&'a ConfigStatement),
}

impl<'a> AnyNode<'a> {
    pub fn id(&self) -> NodeId {
        match self {
            AnyNode::ScriptModule(n) => n.id,
            AnyNode::Declaration(n) => n.id(),
            AnyNode::IncludeEntry(n) => n.id,
            AnyNode::TakeEntry(n) => n.id,
            AnyNode::EmitEntry(n) => n.id,
            AnyNode::PublishEntry(n) => n.id,
            AnyNode::Param(n) => n.id,
            AnyNode::VarDeclName(n) => n.id,
            AnyNode::MapEntry(n) => n.id,
            AnyNode::NamedArg(n) => n.id,
            AnyNode::CatchClause(n) => n.id,
            AnyNode::OutputTarget(n) => n.id,
            AnyNode::TypeAnnotation(n) => n.id,
            AnyNode::Statement(n) => n.id(),
            AnyNode::Expression(n) => n.id(),
            AnyNode::ConfigModule(n) => n.id,
            AnyNode::ConfigStatement(n) => n.id(),
        }
    }

    pub fn span(&self) -> ParseSourceSpan {
        match self {
            AnyNode::ScriptModule(n) => n.span,
            AnyNode::Declaration(n) => n.span(),
            AnyNode::IncludeEntry(n) => n.span,
            AnyNode::TakeEntry(n) => n.span,
            AnyNode::EmitEntry(n) => n.span,
            AnyNode::PublishEntry(n) => n.span,
            AnyNode::Param(n) => n.span,
            AnyNode::VarDeclName(n) => n.span,
            AnyNode::MapEntry(n) => n.span,
            AnyNode::NamedArg(n) => n.span,
            AnyNode::CatchClause(n) => n.span,
            AnyNode::OutputTarget(n) => n.span,
            AnyNode::TypeAnnotation(n) => n.span,
            AnyNode::Statement(n) => n.span(),
            AnyNode::Expression(n) => n.span(),
            AnyNode::ConfigModule(n) => n.span,
            AnyNode::ConfigStatement(n) => n.span(),
        }
    }

    pub fn children(&self) -> Vec<AnyNode<'a>> {
        let mut out = Vec::new();
        match self {
            AnyNode::ScriptModule(module) => {
                out.extend(module.declarations.iter().map(AnyNode::Declaration));
            }
            AnyNode::Declaration(decl) => match decl {
                Declaration::Include(include) => {
                    out.extend(include.entries.iter().map(AnyNode::IncludeEntry));
                }
                Declaration::FeatureFlag(flag) => out.push(AnyNode::Expression(&flag.value)),
                Declaration::Process(process) => {
                    out.extend(process.directives.iter().map(AnyNode::Statement));
                    out.extend(process.inputs.iter().map(AnyNode::Statement));
                    out.extend(process.outputs.iter().map(AnyNode::Statement));
                    if let Some(when) = &process.when {
                        out.push(AnyNode::Expression(when));
                    }
                    if let Some(body) = &process.body {
                        out.extend(body.statements.iter().map(AnyNode::Statement));
                    }
                    out.extend(process.stub.iter().map(AnyNode::Statement));
                    out.extend(process.topics.iter().map(AnyNode::Statement));
                }
                Declaration::Workflow(workflow) => {
                    out.extend(workflow.takes.iter().map(AnyNode::TakeEntry));
                    out.extend(workflow.main.iter().map(AnyNode::Statement));
                    out.extend(workflow.emits.iter().map(AnyNode::EmitEntry));
                    out.extend(workflow.publishers.iter().map(AnyNode::PublishEntry));
                    if let Some(handler) = &workflow.on_complete {
                        out.push(AnyNode::Statement(handler));
                    }
                    if let Some(handler) = &workflow.on_error {
                        out.push(AnyNode::Statement(handler));
                    }
                }
                Declaration::Function(function) => {
                    out.extend(function.params.iter().map(AnyNode::Param));
                    if let Some(ty) = &function.return_type {
                        out.push(AnyNode::TypeAnnotation(ty));
                    }
                    out.extend(function.body.iter().map(AnyNode::Statement));
                }
                Declaration::Output(output) => {
                    out.extend(output.targets.iter().map(AnyNode::OutputTarget));
                }
                Declaration::Stmt(statement) => out.push(AnyNode::Statement(statement)),
            },
            AnyNode::IncludeEntry(_) | AnyNode::TakeEntry(_) => {}
            AnyNode::EmitEntry(entry) => {
                if let Some(value) = &entry.value {
                    out.push(AnyNode::Expression(value));
                }
            }
            AnyNode::PublishEntry(entry) => out.push(AnyNode::Expression(&entry.source)),
            AnyNode::Param(param) => {
                if let Some(ty) = &param.ty {
                    out.push(AnyNode::TypeAnnotation(ty));
                }
            }
            AnyNode::VarDeclName(name) => {
                if let Some(ty) = &name.ty {
                    out.push(AnyNode::TypeAnnotation(ty));
                }
            }
            AnyNode::MapEntry(entry) => out.push(AnyNode::Expression(&entry.value)),
            AnyNode::NamedArg(arg) => out.push(AnyNode::Expression(&arg.value)),
            AnyNode::CatchClause(clause) => {
                if let Some(ty) = &clause.ty {
                    out.push(AnyNode::TypeAnnotation(ty));
                }
                out.extend(clause.body.iter().map(AnyNode::Statement));
            }
            AnyNode::OutputTarget(target) => {
                out.extend(target.body.iter().map(AnyNode::Statement));
            }
            AnyNode::TypeAnnotation(ty) => {
                out.extend(ty.args.iter().map(AnyNode::TypeAnnotation));
            }
            AnyNode::Statement(statement) => match statement {
                Statement::Expr(s) => out.push(AnyNode::Expression(&s.expression)),
                Statement::VarDecl(s) => {
                    out.extend(s.names.iter().map(AnyNode::VarDeclName));
                    if let Some(init) = &s.initializer {
                        out.push(AnyNode::Expression(init));
                    }
                }
                Statement::Assignment(s) => {
                    out.push(AnyNode::Expression(&s.target));
                    out.push(AnyNode::Expression(&s.value));
                }
                Statement::Block(s) => {
                    out.extend(s.statements.iter().map(AnyNode::Statement));
                }
                Statement::If(s) => {
                    out.push(AnyNode::Expression(&s.condition));
                    out.push(AnyNode::Statement(&s.then_branch));
                    if let Some(else_branch) = &s.else_branch {
                        out.push(AnyNode::Statement(else_branch));
                    }
                }
                Statement::Return(s) => {
                    if let Some(value) = &s.value {
                        out.push(AnyNode::Expression(value));
                    }
                }
                Statement::Throw(s) => out.push(AnyNode::Expression(&s.value)),
                Statement::TryCatch(s) => {
                    out.extend(s.body.iter().map(AnyNode::Statement));
                    out.extend(s.catches.iter().map(AnyNode::CatchClause));
                    if let Some(finally) = &s.finally {
                        out.extend(finally.iter().map(AnyNode::Statement));
                    }
                }
                Statement::Incomplete(_) => {}
            },
            AnyNode::Expression(expression) => match expression {
                Expression::Binary(e) => {
                    out.push(AnyNode::Expression(&e.left));
                    out.push(AnyNode::Expression(&e.right));
                }
                Expression::Unary(e) => out.push(AnyNode::Expression(&e.operand)),
                Expression::Property(e) => out.push(AnyNode::Expression(&e.receiver)),
                Expression::MethodCall(e) => {
                    if let Some(receiver) = &e.receiver {
                        out.push(AnyNode::Expression(receiver));
                    }
                    out.extend(e.args.iter().map(AnyNode::Expression));
                    out.extend(e.named_args.iter().map(AnyNode::NamedArg));
                }
                Expression::Index(e) => {
                    out.push(AnyNode::Expression(&e.receiver));
                    out.push(AnyNode::Expression(&e.index));
                }
                Expression::Variable(_) => {}
                Expression::Tuple(e) => {
                    out.extend(e.elements.iter().map(AnyNode::Expression));
                }
                Expression::Range(e) => {
                    out.push(AnyNode::Expression(&e.from));
                    out.push(AnyNode::Expression(&e.to));
                }
                Expression::List(e) => {
                    out.extend(e.elements.iter().map(AnyNode::Expression));
                }
                Expression::Map(e) => out.extend(e.entries.iter().map(AnyNode::MapEntry)),
                Expression::Constant(_) => {}
                Expression::Str(e) => out.extend(e.parts.iter().map(AnyNode::Expression)),
                Expression::Closure(e) => {
                    out.extend(e.params.iter().map(AnyNode::Param));
                    out.extend(e.body.iter().map(AnyNode::Statement));
                }
                Expression::Cast(e) => {
                    out.push(AnyNode::Expression(&e.expression));
                    out.push(AnyNode::TypeAnnotation(&e.ty));
                }
                Expression::Ternary(e) => {
                    out.push(AnyNode::Expression(&e.condition));
                    out.push(AnyNode::Expression(&e.true_expr));
                    out.push(AnyNode::Expression(&e.false_expr));
                }
                Expression::Elvis(e) => {
                    out.push(AnyNode::Expression(&e.value));
                    out.push(AnyNode::Expression(&e.fallback));
                }
                Expression::Paren(e) => out.push(AnyNode::Expression(&e.expression)),
                Expression::Empty(_) => {}
            },
            AnyNode::ConfigModule(module) => {
                out.extend(module.statements.iter().map(AnyNode::ConfigStatement));
            }
            AnyNode::ConfigStatement(statement) => match statement {
                ConfigStatement::Assign(s) => out.push(AnyNode::Expression(&s.value)),
                ConfigStatement::Block(s) => {
                    out.extend(s.statements.iter().map(AnyNode::ConfigStatement));
                }
                ConfigStatement::Include(s) => out.push(AnyNode::Expression(&s.source)),
                ConfigStatement::Apply(s) => {
                    out.extend(s.statements.iter().map(AnyNode::Statement));
                }
                ConfigStatement::Incomplete(_) => {}
            },
        }
        out
    }
}

/// Depth-first walk over a tree, parents before children.
pub fn walk<'a, F: FnMut(AnyNode<'a>)>(root: AnyNode<'a>, f: &mut F) {
    f(root);
    for child in root.children() {
        walk(child, f);
    }
}

/// `node → parent` for one source unit.
pub type ParentMap = HashMap<NodeId, NodeId>;

pub fn build_parent_map(root: AnyNode<'_>) -> ParentMap {
    let mut map = HashMap::new();
    fn go(node: AnyNode<'_>, map: &mut ParentMap) {
        for child in node.children() {
            map.insert(child.id(), node.id());
            go(child, map);
        }
    }
    go(root, &mut map);
    map
}

/// Covering-node lookup by line/column. Entries are every node's span;
/// covering nodes always enclose nested ones, so sorting matches by span
/// length yields the innermost-out ancestor stack.
#[derive(Debug, Clone, Default)]
pub struct PositionIndex {
    entries: Vec<(ParseSourceSpan, NodeId)>,
}

impl PositionIndex {
    pub fn build(root: AnyNode<'_>) -> Self {
        let mut entries = Vec::new();
        walk(root, &mut |node| entries.push((node.span(), node.id())));
        PositionIndex { entries }
    }

    pub fn span_of(&self, id: NodeId) -> Option<ParseSourceSpan> {
        self.entries
            .iter()
            .find(|(_, node)| *node == id)
            .map(|(span, _)| *span)
    }

    /// Node ids covering the position, innermost first.
    pub fn stack_at(&self, line: usize, col: usize) -> Vec<NodeId> {
        let mut hits: Vec<(usize, NodeId)> = self
            .entries
            .iter()
            .filter(|(span, _)| span.contains(line, col))
            .map(|(span, id)| (span.len(), *id))
            .collect();
        hits.sort_by_key(|(len, _)| *len);
        hits.into_iter().map(|(_, id)| id).collect()
    }
}
