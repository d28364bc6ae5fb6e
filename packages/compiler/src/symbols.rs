//! Symbol Extraction
//!
//! Pulls the exported definitions (processes, workflows, functions) and
//! their call signatures out of a parsed script. Runs directly after
//! parsing so include resolution can bind against other units before
//! name resolution starts.

use crate::parse_util::ParseSourceSpan;
use crate::script::ast::{
    Declaration, Expression, NodeId, ProcessDef, ScriptModule, Statement, WorkflowDef,
};
use crate::types::ty::{normalize_name, Type};
use crate::unit::{ProcessSignature, WorkflowSignature};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    Process,
    Workflow,
    Function,
}

impl DefinitionKind {
    pub fn describe(&self) -> &'static str {
        match self {
            DefinitionKind::Process => "process",
            DefinitionKind::Workflow => "workflow",
            DefinitionKind::Function => "function",
        }
    }
}

/// An exported definition of a script unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub name: String,
    pub kind: DefinitionKind,
    pub uri: String,
    pub node: NodeId,
    pub span: ParseSourceSpan,
    pub name_span: ParseSourceSpan,
}

/// Extract the definitions of a module, in document order.
pub fn definitions(uri: &str, module: &ScriptModule) -> Vec<Definition> {
    let mut out = Vec::new();
    for declaration in &module.declarations {
        match declaration {
            Declaration::Process(process) => out.push(Definition {
                name: process.name.clone(),
                kind: DefinitionKind::Process,
                uri: uri.to_string(),
                node: process.id,
                span: process.span,
                name_span: process.name_span,
            }),
            Declaration::Workflow(workflow) => {
                if let (Some(name), Some(name_span)) = (&workflow.name, workflow.name_span) {
                    out.push(Definition {
                        name: name.clone(),
                        kind: DefinitionKind::Workflow,
                        uri: uri.to_string(),
                        node: workflow.id,
                        span: workflow.span,
                        name_span,
                    });
                }
            }
            Declaration::Function(function) => out.push(Definition {
                name: function.name.clone(),
                kind: DefinitionKind::Function,
                uri: uri.to_string(),
                node: function.id,
                span: function.span,
                name_span: function.name_span,
            }),
            _ => {}
        }
    }
    out
}

/// Declared type of an input/output qualifier call.
fn qualifier_type(name: &str, args: &[Expression]) -> Type {
    match name {
        "path" | "file" => Type::named(crate::types::ty::TypeName::Path),
        "env" | "stdout" => Type::named(crate::types::ty::TypeName::String),
        "tuple" => Type::Tuple(
            args.iter()
                .map(|arg| match arg.unwrapped() {
                    Expression::MethodCall(call) => qualifier_type(&call.name, &call.args),
                    _ => Type::Dynamic,
                })
                .collect(),
        ),
        _ => Type::Dynamic,
    }
}

/// Name bound by a qualifier call argument, e.g. the `x` of `val(x)`.
fn qualifier_name(args: &[Expression]) -> Option<String> {
    match args.first().map(|a| a.unwrapped()) {
        Some(Expression::Variable(variable)) => Some(variable.name.clone()),
        _ => None,
    }
}

/// Build the typed call shape of a process definition.
pub fn process_signature(process: &ProcessDef) -> ProcessSignature {
    let mut inputs = Vec::new();
    for (index, statement) in process.inputs.iter().enumerate() {
        match statement {
            Statement::Expr(stmt) => {
                if let Expression::MethodCall(call) = stmt.expression.unwrapped() {
                    let name = qualifier_name(&call.args)
                        .unwrap_or_else(|| format!("arg{}", index));
                    inputs.push((name, qualifier_type(&call.name, &call.args)));
                }
            }
            Statement::VarDecl(decl) => {
                for name in &decl.names {
                    let ty = name
                        .ty
                        .as_ref()
                        .and_then(|t| normalize_name(&t.name))
                        .map(Type::named)
                        .unwrap_or(Type::Dynamic);
                    inputs.push((name.name.clone(), ty));
                }
            }
            _ => {}
        }
    }

    let mut outputs = Vec::new();
    for statement in &process.outputs {
        if let Statement::Expr(stmt) = statement {
            if let Expression::MethodCall(call) = stmt.expression.unwrapped() {
                // `emit:` names the output; a bound variable names it too.
                let emit = call
                    .named_args
                    .iter()
                    .find(|arg| arg.name == "emit")
                    .and_then(|arg| match arg.value.unwrapped() {
                        Expression::Variable(v) => Some(v.name.clone()),
                        Expression::Str(s) => Some(s.value.clone()),
                        _ => None,
                    });
                // Only `emit:` names an output; bare qualifiers stay
                // anonymous so a single output keeps its plain wrapper
                // shape.
                outputs.push((emit, qualifier_type(&call.name, &call.args)));
            }
        }
    }

    ProcessSignature {
        name: process.name.clone(),
        node: process.id,
        inputs,
        outputs,
    }
}

/// Build the typed call shape of a workflow definition.
pub fn workflow_signature(workflow: &WorkflowDef) -> WorkflowSignature {
    WorkflowSignature {
        name: workflow.name.clone(),
        node: workflow.id,
        takes: workflow.takes.iter().map(|t| t.name.clone()).collect(),
        emits: workflow
            .emits
            .iter()
            .map(|e| (e.name.clone(), Type::Dynamic))
            .collect(),
    }
}
