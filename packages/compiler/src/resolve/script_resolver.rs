//! Script Name Resolution
//!
//! The scope state machine over a parsed script: blocks, closures,
//! functions, processes, workflows and catch clauses push frames;
//! declarations land in the current frame; every name use resolves
//! parent-ward and records its target for the definition, reference and
//! hover providers. Unused-variable warnings fall out of the frames'
//! unreferenced registries at the end.

use std::collections::{HashMap, HashSet};

use crate::parse_util::{
    CompilePhase, ParseError, ParseSourceSpan, RelatedInformation,
};
use crate::script::ast::*;
use crate::symbols::Definition;
use crate::types::dsl::{self, DslScope, MemberKind};
use crate::types::ty::{normalize_name, Type};
use crate::unit::{SourceUnit, Target};

use super::feature_flags;
use super::scope::{Resolution, ScopeKind, ScopeStack, VarKind, Variable};

/// Built-ins whose use inside a process body is a portability smell.
const PROCESS_PATH_BUILTINS: &[&str] = &["baseDir", "launchDir", "projectDir", "workDir"];

/// Run name resolution over a script unit, replacing any previous
/// name-resolution diagnostics.
pub fn resolve_script(unit: &mut SourceUnit) {
    unit.errors.clear_phase(CompilePhase::NameResolution);

    let include_table: HashMap<String, (NodeId, ParseSourceSpan, Option<Definition>)> = unit
        .includes
        .iter()
        .flat_map(|state| state.entries.iter())
        .map(|entry| {
            let span = entry
                .definition
                .as_ref()
                .map(|d| d.name_span)
                .unwrap_or(ParseSourceSpan::empty());
            (
                entry.local_name.clone(),
                (entry.entry, span, entry.definition.clone()),
            )
        })
        .collect();

    let outputs = {
        let Some(module) = unit.script() else { return };
        let mut resolver = ScriptResolver::new(unit.uri.clone(), include_table);
        resolver.visit_module(module);
        resolver.finish()
    };

    unit.errors.extend(outputs.errors);
    for (node, target) in outputs.targets {
        unit.metadata.set_target(node, target);
    }
    for (decl, ty) in outputs.variable_types {
        unit.metadata.set_variable_type(decl, ty);
    }
}

struct ResolverOutputs {
    errors: Vec<ParseError>,
    targets: Vec<(NodeId, Target)>,
    variable_types: Vec<(NodeId, Type)>,
}

struct ScriptResolver {
    uri: String,
    scopes: ScopeStack,
    errors: Vec<ParseError>,
    targets: Vec<(NodeId, Target)>,
    variable_types: Vec<(NodeId, Type)>,
    include_table: HashMap<String, (NodeId, ParseSourceSpan, Option<Definition>)>,
    /// Non-zero while visiting a process script/shell/exec/stub section.
    process_body_depth: u32,
    /// Closures already warned about their implicit `it`.
    implicit_it_warned: HashSet<NodeId>,
    /// Stack of closure nodes with no explicit parameter list.
    implicit_closures: Vec<NodeId>,
    /// Entry-workflow publish targets and output-block targets for the
    /// end-of-module cross check.
    publish_targets: Vec<(String, ParseSourceSpan)>,
    output_targets: Vec<(String, ParseSourceSpan)>,
    has_output_block: bool,
}

impl ScriptResolver {
    fn new(
        uri: String,
        include_table: HashMap<String, (NodeId, ParseSourceSpan, Option<Definition>)>,
    ) -> Self {
        ScriptResolver {
            uri,
            scopes: ScopeStack::new(vec![dsl::global_scope()]),
            errors: Vec::new(),
            targets: Vec::new(),
            variable_types: Vec::new(),
            include_table,
            process_body_depth: 0,
            implicit_it_warned: HashSet::new(),
            implicit_closures: Vec::new(),
            publish_targets: Vec::new(),
            output_targets: Vec::new(),
            has_output_block: false,
        }
    }

    fn finish(mut self) -> ResolverOutputs {
        // Unused variables: everything still in an unreferenced registry.
        for frame in self.scopes.frames() {
            for variable in frame.unused() {
                match variable.kind {
                    VarKind::Local | VarKind::Parameter | VarKind::IncludeEntry => {
                        self.errors.push(ParseError::warning(
                            variable.span,
                            format!("Variable '{}' is declared but not used", variable.name),
                            CompilePhase::NameResolution,
                        ));
                    }
                    VarKind::Field | VarKind::Dynamic => {}
                }
            }
        }

        // Entry-workflow publishers and output-block targets must agree.
        if self.has_output_block {
            for (name, span) in &self.publish_targets {
                if !self.output_targets.iter().any(|(n, _)| n == name) {
                    self.errors.push(ParseError::warning(
                        *span,
                        format!("Publish target '{}' is not declared in the output block", name),
                        CompilePhase::NameResolution,
                    ));
                }
            }
            for (name, span) in &self.output_targets {
                if !self.publish_targets.iter().any(|(n, _)| n == name) {
                    self.errors.push(ParseError::warning(
                        *span,
                        format!("Output target '{}' is never published", name),
                        CompilePhase::NameResolution,
                    ));
                }
            }
        } else {
            for (name, span) in &self.publish_targets {
                self.errors.push(ParseError::warning(
                    *span,
                    format!("Publish target '{}' has no output block to publish into", name),
                    CompilePhase::NameResolution,
                ));
            }
        }

        ResolverOutputs {
            errors: self.errors,
            targets: self.targets,
            variable_types: self.variable_types,
        }
    }

    fn error(&mut self, span: ParseSourceSpan, msg: impl Into<String>) {
        self.errors
            .push(ParseError::new(span, msg, CompilePhase::NameResolution));
    }

    fn warning(&mut self, span: ParseSourceSpan, msg: impl Into<String>) {
        self.errors
            .push(ParseError::warning(span, msg, CompilePhase::NameResolution));
    }

    fn future(&mut self, span: ParseSourceSpan, msg: impl Into<String>) {
        self.errors
            .push(ParseError::future(span, msg, CompilePhase::NameResolution));
    }

    fn declare(&mut self, variable: Variable) {
        let span = variable.span;
        let name = variable.name.clone();
        if let Err(existing) = self.scopes.declare(variable) {
            self.errors.push(
                ParseError::new(
                    span,
                    format!("'{}' is already declared", name),
                    CompilePhase::NameResolution,
                )
                .with_related(RelatedInformation {
                    uri: self.uri.clone(),
                    span: existing.span,
                    message: "first declared here".to_string(),
                }),
            );
        }
    }

    // -- module --------------------------------------------------------------

    fn visit_module(&mut self, module: &ScriptModule) {
        // Module-level definitions and include entries first, so use
        // before definition resolves.
        for declaration in &module.declarations {
            match declaration {
                Declaration::Process(process) => {
                    self.declare(
                        Variable::local(&process.name, process.id, process.name_span)
                            .with_kind(VarKind::Field),
                    );
                }
                Declaration::Workflow(workflow) => {
                    if let (Some(name), Some(span)) = (&workflow.name, workflow.name_span) {
                        self.declare(
                            Variable::local(name, workflow.id, span).with_kind(VarKind::Field),
                        );
                    }
                }
                Declaration::Function(function) => {
                    self.declare(
                        Variable::local(&function.name, function.id, function.name_span)
                            .with_kind(VarKind::Field),
                    );
                }
                Declaration::Include(include) => {
                    for entry in &include.entries {
                        let variable =
                            Variable::local(entry.local_name(), entry.id, entry.span)
                                .with_kind(VarKind::IncludeEntry);
                        self.declare(variable);
                    }
                }
                _ => {}
            }
        }

        for declaration in &module.declarations {
            match declaration {
                Declaration::Include(_) => {}
                Declaration::FeatureFlag(flag) => self.visit_feature_flag(flag),
                Declaration::Process(process) => self.visit_process(process),
                Declaration::Workflow(workflow) => self.visit_workflow(workflow),
                Declaration::Function(function) => self.visit_function(function),
                Declaration::Output(output) => self.visit_output(output),
                Declaration::Stmt(statement) => self.visit_statement(statement),
            }
        }
    }

    fn visit_feature_flag(&mut self, flag: &FeatureFlagDecl) {
        match feature_flags::find(&flag.name) {
            None => {
                self.error(
                    flag.name_span,
                    format!("Unrecognized feature flag '{}'", flag.name),
                );
            }
            Some(known) => {
                if let Some(note) = known.deprecated {
                    let span = flag.name_span;
                    self.future(
                        span,
                        format!("Feature flag '{}' is deprecated: {}", flag.name, note),
                    );
                }
            }
        }
        self.visit_expression(&flag.value);
    }

    // -- process -------------------------------------------------------------

    fn visit_process(&mut self, process: &ProcessDef) {
        self.scopes.push(ScopeKind::Process, Vec::new());

        self.with_scope(ScopeKind::Block, vec![dsl::process_directives()], |this| {
            for statement in &process.directives {
                this.visit_directive(statement, dsl::process_directives(), "process directive");
            }
        });

        self.with_scope(ScopeKind::Block, vec![dsl::process_inputs()], |this| {
            for statement in &process.inputs {
                this.visit_process_input(statement);
            }
        });

        self.with_scope(ScopeKind::Block, vec![dsl::process_outputs()], |this| {
            for statement in &process.outputs {
                this.visit_process_output(statement);
            }
        });

        if let Some(when) = &process.when {
            self.visit_expression(when);
        }

        if let Some(body) = &process.body {
            self.visit_process_body(&body.statements);
        }
        if !process.stub.is_empty() {
            self.visit_process_body(&process.stub);
        }
        for statement in &process.topics {
            self.visit_statement(statement);
        }

        self.scopes.pop();
    }

    fn visit_process_body(&mut self, statements: &[Statement]) {
        self.process_body_depth += 1;
        self.with_scope(ScopeKind::Block, vec![dsl::process_body()], |this| {
            for statement in statements {
                this.visit_statement(statement);
            }
        });
        self.process_body_depth -= 1;
    }

    /// A directive is a command call resolved against one DSL surface.
    fn visit_directive(&mut self, statement: &Statement, scope: &'static DslScope, what: &str) {
        let Statement::Expr(stmt) = statement else {
            self.visit_statement(statement);
            return;
        };
        let Expression::MethodCall(call) = stmt.expression.unwrapped() else {
            self.visit_statement(statement);
            return;
        };
        if call.receiver.is_some() {
            self.visit_statement(statement);
            return;
        }
        match scope.find(&call.name) {
            Some(member) => {
                self.targets.push((
                    call.id,
                    Target::Builtin { scope: scope.name, member: member.name.to_string() },
                ));
                self.check_deprecated_member(member, call.name_span);
            }
            None => {
                self.warning(
                    call.name_span,
                    format!("Unrecognized {} '{}'", what, call.name),
                );
            }
        }
        for arg in &call.args {
            self.visit_expression(arg);
        }
        for named in &call.named_args {
            self.visit_expression(&named.value);
        }
    }

    /// Input qualifiers declare variables instead of referencing them.
    fn visit_process_input(&mut self, statement: &Statement) {
        match statement {
            Statement::Expr(stmt) => {
                if let Expression::MethodCall(call) = stmt.expression.unwrapped() {
                    self.visit_input_qualifier(call);
                    return;
                }
                self.visit_statement(statement);
            }
            Statement::VarDecl(decl) => {
                // Typed form: declarations carry their own types.
                for name in &decl.names {
                    let ty = name
                        .ty
                        .as_ref()
                        .and_then(|t| normalize_name(&t.name))
                        .map(Type::named)
                        .unwrap_or(Type::Dynamic);
                    self.declare_in_process(name.name.clone(), name.id, name.span, ty);
                }
            }
            _ => self.visit_statement(statement),
        }
    }

    fn visit_input_qualifier(&mut self, call: &MethodCallExpr) {
        let scope = dsl::process_inputs();
        match scope.find(&call.name) {
            Some(member) => {
                self.targets.push((
                    call.id,
                    Target::Builtin { scope: scope.name, member: member.name.to_string() },
                ));
                self.check_deprecated_member(member, call.name_span);
            }
            None => {
                self.error(
                    call.name_span,
                    format!("Unrecognized input qualifier '{}'", call.name),
                );
                return;
            }
        }
        match call.name.as_str() {
            "tuple" => {
                for arg in &call.args {
                    if let Expression::MethodCall(inner) = arg.unwrapped() {
                        self.visit_input_qualifier(inner);
                    }
                }
            }
            "stdin" => {}
            qualifier => {
                if let Some(Expression::Variable(variable)) =
                    call.args.first().map(|a| a.unwrapped())
                {
                    let ty = match qualifier {
                        "path" | "file" => Type::named(crate::types::ty::TypeName::Path),
                        "env" => Type::named(crate::types::ty::TypeName::String),
                        _ => Type::Dynamic,
                    };
                    self.declare_in_process(
                        variable.name.clone(),
                        variable.id,
                        variable.span,
                        ty,
                    );
                } else {
                    // `path 'out.txt'` style inputs reference expressions.
                    for arg in &call.args {
                        self.visit_expression(arg);
                    }
                }
            }
        }
        for named in &call.named_args {
            self.visit_expression(&named.value);
        }
    }

    fn visit_process_output(&mut self, statement: &Statement) {
        let Statement::Expr(stmt) = statement else {
            self.visit_statement(statement);
            return;
        };
        let Expression::MethodCall(call) = stmt.expression.unwrapped() else {
            self.visit_statement(statement);
            return;
        };
        self.visit_output_qualifier(call);
    }

    fn visit_output_qualifier(&mut self, call: &MethodCallExpr) {
        let scope = dsl::process_outputs();
        match scope.find(&call.name) {
            Some(member) => {
                self.targets.push((
                    call.id,
                    Target::Builtin { scope: scope.name, member: member.name.to_string() },
                ));
                self.check_deprecated_member(member, call.name_span);
            }
            None => {
                self.error(
                    call.name_span,
                    format!("Unrecognized output qualifier '{}'", call.name),
                );
                return;
            }
        }
        match call.name.as_str() {
            "tuple" => {
                for arg in &call.args {
                    if let Expression::MethodCall(inner) = arg.unwrapped() {
                        self.visit_output_qualifier(inner);
                    }
                }
            }
            "val" => {
                // An output value may name a body variable that does not
                // exist yet; bind it into the process scope.
                if let Some(Expression::Variable(variable)) =
                    call.args.first().map(|a| a.unwrapped())
                {
                    if self.scopes.lookup(&variable.name).is_none() {
                        self.declare_in_process(
                            variable.name.clone(),
                            variable.id,
                            variable.span,
                            Type::Dynamic,
                        );
                    } else {
                        self.visit_expression(&Expression::Variable(variable.clone()));
                    }
                } else {
                    for arg in &call.args {
                        self.visit_expression(arg);
                    }
                }
            }
            _ => {
                for arg in &call.args {
                    self.visit_expression(arg);
                }
            }
        }
        // Named arguments (`emit:`, `optional:`) name outputs, they do not
        // reference variables.
        for named in &call.named_args {
            if named.name != "emit" {
                self.visit_expression(&named.value);
            }
        }
    }

    /// Declare into the process frame from inside a section frame.
    fn declare_in_process(&mut self, name: String, decl: NodeId, span: ParseSourceSpan, ty: Type) {
        let variable = Variable::local(&name, decl, span)
            .with_kind(VarKind::Field)
            .with_type(ty.clone());
        if let Err(existing) = self.scopes.declare_in_parent(variable) {
            self.errors.push(
                ParseError::new(
                    span,
                    format!("'{}' is already declared", name),
                    CompilePhase::NameResolution,
                )
                .with_related(RelatedInformation {
                    uri: self.uri.clone(),
                    span: existing.span,
                    message: "first declared here".to_string(),
                }),
            );
        }
        self.variable_types.push((decl, ty));
    }

    // -- workflow ------------------------------------------------------------

    fn visit_workflow(&mut self, workflow: &WorkflowDef) {
        let entry = workflow.is_entry();
        self.scopes.push(ScopeKind::Workflow { entry }, Vec::new());

        for take in &workflow.takes {
            self.declare(Variable::parameter(&take.name, take.id, take.span));
        }

        for statement in &workflow.main {
            self.visit_statement(statement);
        }

        let mut emitted: HashMap<String, ParseSourceSpan> = HashMap::new();
        for emit in &workflow.emits {
            if let Some(value) = &emit.value {
                self.visit_expression(value);
            }
            if let (Some(name), Some(span)) = (&emit.name, emit.name_span) {
                if let Some(first) = emitted.get(name) {
                    let error = ParseError::new(
                        span,
                        format!("Emit '{}' is declared more than once", name),
                        CompilePhase::NameResolution,
                    )
                    .with_related(RelatedInformation {
                        uri: self.uri.clone(),
                        span: *first,
                        message: "first emitted here".to_string(),
                    });
                    self.errors.push(error);
                } else {
                    emitted.insert(name.clone(), span);
                }
            }
        }

        for publish in &workflow.publishers {
            self.visit_expression(&publish.source);
            if entry {
                self.publish_targets
                    .push((publish.target.clone(), publish.target_span));
            } else {
                self.warning(
                    publish.span,
                    "Publish statements only take effect in the entry workflow",
                );
            }
        }

        if let Some(handler) = &workflow.on_complete {
            self.visit_statement(handler);
        }
        if let Some(handler) = &workflow.on_error {
            self.visit_statement(handler);
        }

        self.scopes.pop();
    }

    fn visit_function(&mut self, function: &FunctionDef) {
        self.scopes.push(ScopeKind::Function, Vec::new());
        for param in &function.params {
            let ty = param
                .ty
                .as_ref()
                .and_then(|t| normalize_name(&t.name))
                .map(Type::named)
                .unwrap_or(Type::Dynamic);
            self.declare(
                Variable::parameter(&param.name, param.id, param.span).with_type(ty.clone()),
            );
            self.variable_types.push((param.id, ty));
        }
        for statement in &function.body {
            self.visit_statement(statement);
        }
        self.scopes.pop();
    }

    fn visit_output(&mut self, output: &OutputDef) {
        self.has_output_block = true;
        for target in &output.targets {
            self.output_targets
                .push((target.name.clone(), target.name_span));
            self.with_scope(ScopeKind::Block, vec![dsl::output_block()], |this| {
                for statement in &target.body {
                    this.visit_directive(statement, dsl::output_block(), "publish option");
                }
            });
        }
    }

    // -- statements ----------------------------------------------------------

    fn visit_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Expr(stmt) => self.visit_expression(&stmt.expression),
            Statement::VarDecl(decl) => {
                if let Some(initializer) = &decl.initializer {
                    self.visit_expression(initializer);
                }
                for name in &decl.names {
                    let ty = name
                        .ty
                        .as_ref()
                        .and_then(|t| normalize_name(&t.name))
                        .map(Type::named)
                        .unwrap_or(Type::Dynamic);
                    self.declare(
                        Variable::local(&name.name, name.id, name.span).with_type(ty.clone()),
                    );
                    if !ty.is_dynamic() {
                        self.variable_types.push((name.id, ty));
                    }
                }
            }
            Statement::Assignment(stmt) => self.visit_assignment(stmt),
            Statement::Block(block) => {
                self.with_scope(ScopeKind::Block, Vec::new(), |this| {
                    for statement in &block.statements {
                        this.visit_statement(statement);
                    }
                });
            }
            Statement::If(stmt) => {
                self.visit_expression(&stmt.condition);
                self.visit_statement(&stmt.then_branch);
                if let Some(else_branch) = &stmt.else_branch {
                    self.visit_statement(else_branch);
                }
            }
            Statement::Return(stmt) => {
                if let Some(value) = &stmt.value {
                    self.visit_expression(value);
                }
            }
            Statement::Throw(stmt) => self.visit_expression(&stmt.value),
            Statement::TryCatch(stmt) => {
                self.with_scope(ScopeKind::Block, Vec::new(), |this| {
                    for statement in &stmt.body {
                        this.visit_statement(statement);
                    }
                });
                for clause in &stmt.catches {
                    self.scopes.push(ScopeKind::Catch, Vec::new());
                    self.declare(Variable::parameter(
                        &clause.param_name,
                        clause.id,
                        clause.param_span,
                    ));
                    for statement in &clause.body {
                        self.visit_statement(statement);
                    }
                    self.scopes.pop();
                }
                if let Some(finally) = &stmt.finally {
                    self.with_scope(ScopeKind::Block, Vec::new(), |this| {
                        for statement in finally {
                            this.visit_statement(statement);
                        }
                    });
                }
            }
            Statement::Incomplete(_) => {}
        }
    }

    fn visit_assignment(&mut self, stmt: &AssignmentStmt) {
        self.visit_expression(&stmt.value);
        match stmt.target.unwrapped() {
            Expression::Variable(variable) => self.visit_assignment_target(variable),
            Expression::Tuple(tuple) => {
                for element in &tuple.elements {
                    if let Expression::Variable(variable) = element.unwrapped() {
                        self.visit_assignment_target(variable);
                    } else {
                        self.visit_expression(element);
                    }
                }
            }
            _ => self.visit_expression(&stmt.target),
        }
    }

    fn visit_assignment_target(&mut self, variable: &VariableExpr) {
        match self.scopes.resolve(&variable.name) {
            Some(Resolution::Variable(resolved)) => {
                self.record_variable_target(variable, &resolved);
                if self.scopes.in_closure() && resolved.closure_shared {
                    self.future(
                        variable.span,
                        format!(
                            "Mutating '{}' inside a closure may be a race condition",
                            variable.name
                        ),
                    );
                }
            }
            Some(Resolution::Member { member, .. }) => {
                if member.kind != MemberKind::Method {
                    self.error(
                        variable.span,
                        format!("Built-in variable '{}' cannot be reassigned", variable.name),
                    );
                } else {
                    self.error(
                        variable.span,
                        format!("'{}' is not assignable", variable.name),
                    );
                }
            }
            None => {
                // Implicit declaration in process/workflow/function bodies;
                // closures must declare explicitly.
                if self.scopes.in_closure() {
                    self.error(
                        variable.span,
                        format!(
                            "'{}' was assigned inside a closure but never declared; use an explicit `def`",
                            variable.name
                        ),
                    );
                    return;
                }
                match self.scopes.enclosing_kind() {
                    ScopeKind::Workflow { .. } | ScopeKind::Process | ScopeKind::Function => {
                        self.scopes.declare_shadowing(Variable::local(
                            &variable.name,
                            variable.id,
                            variable.span,
                        ));
                        self.targets.push((
                            variable.id,
                            Target::Node {
                                uri: self.uri.clone(),
                                node: variable.id,
                                span: variable.span,
                            },
                        ));
                    }
                    _ => {
                        self.error(
                            variable.span,
                            format!("'{}' was assigned but never declared", variable.name),
                        );
                    }
                }
            }
        }
    }

    // -- expressions ---------------------------------------------------------

    fn visit_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Binary(e) => {
                self.visit_expression(&e.left);
                // The pipe operator applies a bare operator name on its
                // right-hand side; leave those names unresolved here.
                if e.op == "|" {
                    if !matches!(e.right.unwrapped(), Expression::Variable(_)) {
                        self.visit_expression(&e.right);
                    }
                } else {
                    self.visit_expression(&e.right);
                }
            }
            Expression::Unary(e) => self.visit_expression(&e.operand),
            Expression::Property(e) => self.visit_property(e),
            Expression::MethodCall(e) => self.visit_method_call(e),
            Expression::Index(e) => {
                self.visit_expression(&e.receiver);
                self.visit_expression(&e.index);
            }
            Expression::Variable(e) => self.visit_variable(e),
            Expression::Tuple(e) => {
                for element in &e.elements {
                    self.visit_expression(element);
                }
            }
            Expression::Range(e) => {
                self.visit_expression(&e.from);
                self.visit_expression(&e.to);
            }
            Expression::List(e) => {
                for element in &e.elements {
                    self.visit_expression(element);
                }
            }
            Expression::Map(e) => {
                for entry in &e.entries {
                    self.visit_expression(&entry.value);
                }
            }
            Expression::Constant(_) => {}
            Expression::Str(e) => {
                for part in &e.parts {
                    self.visit_expression(part);
                }
            }
            Expression::Closure(e) => self.visit_closure(e),
            Expression::Cast(e) => self.visit_expression(&e.expression),
            Expression::Ternary(e) => {
                self.visit_expression(&e.condition);
                self.visit_expression(&e.true_expr);
                self.visit_expression(&e.false_expr);
            }
            Expression::Elvis(e) => {
                self.visit_expression(&e.value);
                self.visit_expression(&e.fallback);
            }
            Expression::Paren(e) => self.visit_expression(&e.expression),
            Expression::Empty(_) => {}
        }
    }

    fn visit_variable(&mut self, variable: &VariableExpr) {
        match self.scopes.resolve(&variable.name) {
            Some(Resolution::Variable(resolved)) => {
                self.record_variable_target(variable, &resolved);
                if resolved.name == "it"
                    && resolved.kind == VarKind::Parameter
                    && resolved.decl.map(|d| self.implicit_closures.contains(&d)).unwrap_or(false)
                {
                    if let Some(closure) = resolved.decl {
                        if self.implicit_it_warned.insert(closure) {
                            self.warning(
                                variable.span,
                                "Implicit closure parameter `it`; declare it explicitly",
                            );
                        }
                    }
                }
            }
            Some(Resolution::Member { scope_name, member }) => {
                self.targets.push((
                    variable.id,
                    Target::Builtin { scope: scope_name, member: member.name.to_string() },
                ));
                self.check_deprecated_member(member, variable.span);
                if self.process_body_depth > 0
                    && PROCESS_PATH_BUILTINS.contains(&variable.name.as_str())
                {
                    self.warning(
                        variable.span,
                        format!(
                            "'{}' should not be read inside a process; pass it in as an input instead",
                            variable.name
                        ),
                    );
                }
                if (variable.name == "params" || variable.name == "args")
                    && !self.scopes.in_entry_workflow()
                    && !matches!(self.scopes.enclosing_kind(), ScopeKind::Module)
                {
                    self.future(
                        variable.span,
                        format!("'{}' should only be used in the entry workflow", variable.name),
                    );
                }
            }
            None => {
                // Implicit `it` inside a parameterless closure.
                if variable.name == "it" {
                    if let Some(&closure) = self.implicit_closures.last() {
                        self.scopes.declare_untracked(
                            Variable::parameter("it", closure, variable.span),
                        );
                        if self.implicit_it_warned.insert(closure) {
                            self.warning(
                                variable.span,
                                "Implicit closure parameter `it`; declare it explicitly",
                            );
                        }
                        self.targets.push((
                            variable.id,
                            Target::Node {
                                uri: self.uri.clone(),
                                node: closure,
                                span: variable.span,
                            },
                        ));
                        return;
                    }
                }
                self.error(variable.span, format!("'{}' is not defined", variable.name));
                // One unknown name reports once per scope chain.
                self.scopes.declare_untracked(
                    Variable::local(&variable.name, variable.id, variable.span)
                        .with_kind(VarKind::Dynamic),
                );
            }
        }
    }

    fn record_variable_target(&mut self, variable: &VariableExpr, resolved: &Variable) {
        if let Some(decl) = resolved.decl {
            // Include entries forward to their definition when resolved.
            if resolved.kind == VarKind::IncludeEntry {
                if let Some((_, _, Some(definition))) = self.include_table.get(&resolved.name) {
                    self.targets.push((
                        variable.id,
                        Target::Node {
                            uri: definition.uri.clone(),
                            node: definition.node,
                            span: definition.name_span,
                        },
                    ));
                    return;
                }
            }
            self.targets.push((
                variable.id,
                Target::Node { uri: self.uri.clone(), node: decl, span: resolved.span },
            ));
        }
    }

    fn visit_property(&mut self, property: &PropertyExpr) {
        // Namespace members resolve here; other members wait for types.
        if let Expression::Variable(receiver) = property.receiver.unwrapped() {
            if let Some(scope) = dsl::namespace(&receiver.name) {
                if self.scopes.lookup(&receiver.name).map(|r| matches!(r, Resolution::Member { .. })).unwrap_or(false) {
                    self.visit_expression(&property.receiver);
                    match scope.find(&property.name) {
                        Some(member) => {
                            self.targets.push((
                                property.id,
                                Target::Builtin {
                                    scope: scope.name,
                                    member: member.name.to_string(),
                                },
                            ));
                            self.check_deprecated_member(member, property.name_span);
                        }
                        None => {
                            self.error(
                                property.name_span,
                                format!(
                                    "Unknown member '{}' of '{}'",
                                    property.name, receiver.name
                                ),
                            );
                        }
                    }
                    return;
                }
            }
        }
        self.visit_expression(&property.receiver);
    }

    fn visit_method_call(&mut self, call: &MethodCallExpr) {
        match &call.receiver {
            None => {
                match self.scopes.resolve(&call.name) {
                    Some(Resolution::Variable(resolved)) => {
                        let variable = VariableExpr {
                            id: call.id,
                            span: call.name_span,
                            name: call.name.clone(),
                        };
                        self.record_variable_target(&variable, &resolved);
                    }
                    Some(Resolution::Member { scope_name, member }) => {
                        self.targets.push((
                            call.id,
                            Target::Builtin {
                                scope: scope_name,
                                member: member.name.to_string(),
                            },
                        ));
                        self.check_deprecated_member(member, call.name_span);
                    }
                    None => {
                        self.error(
                            call.name_span,
                            format!("'{}' is not defined", call.name),
                        );
                    }
                }
            }
            Some(receiver) => {
                // `ch.set { name }` / `ch.tap { name }` bind a fresh name
                // in the enclosing scope instead of referencing one.
                if matches!(call.name.as_str(), "set" | "tap") {
                    if let Some(Expression::Closure(closure)) =
                        call.args.first().map(|a| a.unwrapped())
                    {
                        if let Some(name) = set_operator_binding(closure) {
                            self.visit_expression(receiver);
                            self.scopes.declare_shadowing(Variable::local(
                                &name.name,
                                name.id,
                                name.span,
                            ));
                            self.targets.push((
                                name.id,
                                Target::Node {
                                    uri: self.uri.clone(),
                                    node: name.id,
                                    span: name.span,
                                },
                            ));
                            return;
                        }
                    }
                }
                if let Expression::Variable(receiver_name) = receiver.unwrapped() {
                    if let Some(scope) = dsl::namespace(&receiver_name.name) {
                        if self
                            .scopes
                            .lookup(&receiver_name.name)
                            .map(|r| matches!(r, Resolution::Member { .. }))
                            .unwrap_or(false)
                        {
                            self.visit_expression(receiver);
                            match scope.find(&call.name) {
                                Some(member) => {
                                    self.targets.push((
                                        call.id,
                                        Target::Builtin {
                                            scope: scope.name,
                                            member: member.name.to_string(),
                                        },
                                    ));
                                    self.check_deprecated_member(member, call.name_span);
                                }
                                None => {
                                    self.error(
                                        call.name_span,
                                        format!(
                                            "Unknown member '{}' of '{}'",
                                            call.name, receiver_name.name
                                        ),
                                    );
                                }
                            }
                            for arg in &call.args {
                                self.visit_expression(arg);
                            }
                            for named in &call.named_args {
                                self.visit_expression(&named.value);
                            }
                            return;
                        }
                    }
                }
                self.visit_expression(receiver);
            }
        }
        for arg in &call.args {
            self.visit_expression(arg);
        }
        for named in &call.named_args {
            self.visit_expression(&named.value);
        }
    }

    fn visit_closure(&mut self, closure: &ClosureExpr) {
        self.scopes.push(ScopeKind::Closure, Vec::new());
        if closure.implicit_params {
            self.implicit_closures.push(closure.id);
        }
        for param in &closure.params {
            let ty = param
                .ty
                .as_ref()
                .and_then(|t| normalize_name(&t.name))
                .map(Type::named)
                .unwrap_or(Type::Dynamic);
            self.declare(
                Variable::parameter(&param.name, param.id, param.span).with_type(ty.clone()),
            );
            if !ty.is_dynamic() {
                self.variable_types.push((param.id, ty));
            }
        }
        for statement in &closure.body {
            self.visit_statement(statement);
        }
        if closure.implicit_params {
            self.implicit_closures.pop();
        }
        self.scopes.pop();
    }

    fn check_deprecated_member(&mut self, member: &dsl::ClassMember, span: ParseSourceSpan) {
        if let Some(note) = member.deprecated {
            let error = ParseError::future(
                span,
                format!("'{}' is deprecated: {}", member.name, note),
                CompilePhase::NameResolution,
            )
            .with_related(RelatedInformation {
                uri: self.uri.clone(),
                span,
                message: member.doc.to_string(),
            });
            self.errors.push(error);
        }
    }

    fn with_scope<F: FnOnce(&mut Self)>(
        &mut self,
        kind: ScopeKind,
        class_scopes: Vec<&'static DslScope>,
        f: F,
    ) {
        self.scopes.push(kind, class_scopes);
        f(self);
        self.scopes.pop();
    }
}

/// The single bare variable inside a `set`/`tap` closure body.
fn set_operator_binding(closure: &ClosureExpr) -> Option<&VariableExpr> {
    if closure.body.len() != 1 || !closure.params.is_empty() {
        return None;
    }
    let Statement::Expr(stmt) = &closure.body[0] else {
        return None;
    };
    match stmt.expression.unwrapped() {
        Expression::Variable(variable) => Some(variable),
        _ => None,
    }
}
