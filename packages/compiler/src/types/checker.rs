//! Type Checker
//!
//! Infers a type for every expression, validates assignments and calls,
//! dispatches methods and operators, infers closure parameters against
//! functional shapes, and synthesizes the dataflow return shapes of
//! process and workflow calls. Every diagnostic is non-fatal.

use std::collections::{HashMap, HashSet};

use crate::parse_util::{CompilePhase, ParseError, ParseSourceSpan};
use crate::script::ast::*;
use crate::unit::{ProcessSignature, SourceUnit, Target, WorkflowSignature};

use super::dsl::{self, ClassMember, MemberKind};
use super::ty::{
    assignable, connect, normalize_name, substitute, Bindings, Type, TypeName,
};

/// Call signatures of included definitions, keyed by local name.
#[derive(Debug, Default)]
pub struct ExternalSignatures {
    pub processes: HashMap<String, ProcessSignature>,
    pub workflows: HashMap<String, WorkflowSignature>,
}

/// Named arguments accepted by selected built-in methods, with their
/// expected types. Members absent from this table skip the check.
fn named_params_of(member: &str) -> Option<&'static [(&'static str, TypeName)]> {
    match member {
        "publishDir" => Some(&[
            ("path", TypeName::String),
            ("mode", TypeName::String),
            ("pattern", TypeName::String),
            ("saveAs", TypeName::String),
            ("enabled", TypeName::Boolean),
            ("overwrite", TypeName::Boolean),
            ("contentType", TypeName::String),
        ]),
        "groupTuple" => Some(&[
            ("by", TypeName::Integer),
            ("size", TypeName::Integer),
            ("remainder", TypeName::Boolean),
            ("sort", TypeName::Boolean),
        ]),
        "combine" => Some(&[("by", TypeName::Integer)]),
        "join" => Some(&[
            ("by", TypeName::Integer),
            ("remainder", TypeName::Boolean),
            ("failOnDuplicate", TypeName::Boolean),
            ("failOnMismatch", TypeName::Boolean),
        ]),
        "buffer" => Some(&[
            ("size", TypeName::Integer),
            ("remainder", TypeName::Boolean),
            ("skip", TypeName::Integer),
        ]),
        "splitCsv" => Some(&[
            ("header", TypeName::Boolean),
            ("sep", TypeName::String),
            ("skip", TypeName::Integer),
            ("limit", TypeName::Integer),
            ("strip", TypeName::Boolean),
            ("quote", TypeName::String),
        ]),
        "collectFile" => Some(&[
            ("name", TypeName::String),
            ("storeDir", TypeName::String),
            ("newLine", TypeName::Boolean),
            ("keepHeader", TypeName::Boolean),
            ("seed", TypeName::String),
        ]),
        "fromPath" => Some(&[
            ("checkIfExists", TypeName::Boolean),
            ("glob", TypeName::Boolean),
            ("type", TypeName::String),
            ("hidden", TypeName::Boolean),
            ("maxDepth", TypeName::Integer),
            ("followLinks", TypeName::Boolean),
            ("relative", TypeName::Boolean),
        ]),
        "fromFilePairs" => Some(&[
            ("size", TypeName::Integer),
            ("flat", TypeName::Boolean),
            ("checkIfExists", TypeName::Boolean),
        ]),
        _ => None,
    }
}

/// Run type checking over a script unit, replacing any previous
/// type-checking diagnostics.
pub fn check_script(unit: &mut SourceUnit, external: &ExternalSignatures) {
    unit.errors.clear_phase(CompilePhase::TypeChecking);

    let targets: HashMap<NodeId, Target> = unit
        .metadata
        .targets()
        .map(|(id, t)| (*id, t.clone()))
        .collect();
    let mut var_types: HashMap<NodeId, Type> = HashMap::new();
    let Some(module) = unit.script() else { return };
    let mut function_sigs = HashMap::new();
    for declaration in &module.declarations {
        if let Declaration::Function(function) = declaration {
            let params: Vec<Type> = function
                .params
                .iter()
                .map(|p| annotation_type(p.ty.as_ref()))
                .collect();
            let ret = annotation_type(function.return_type.as_ref());
            function_sigs.insert(function.name.clone(), (params, ret, function.id));
        }
    }
    // Seed declaration types recorded during name resolution.
    let mut seeded = Vec::new();
    crate::node::walk(unit.root(), &mut |node| {
        if let Some(ty) = unit.metadata.variable_type(node.id()) {
            seeded.push((node.id(), ty.clone()));
        }
    });
    var_types.extend(seeded);

    let outputs = {
        let Some(module) = unit.script() else { return };
        let mut checker = TypeChecker {
            processes: &unit.process_signatures,
            workflows: &unit.workflow_signatures,
            functions: function_sigs,
            external,
            targets,
            var_types,
            errors: Vec::new(),
            types: Vec::new(),
            new_targets: Vec::new(),
            inferred_closures: HashSet::new(),
            call_results: HashMap::new(),
            return_stack: Vec::new(),
        };
        checker.visit_module(module);
        (
            checker.errors,
            checker.types,
            checker.new_targets,
            checker.var_types,
        )
    };

    unit.errors.extend(outputs.0);
    for (node, ty) in outputs.1 {
        unit.metadata.set_type(node, ty);
    }
    for (node, target) in outputs.2 {
        unit.metadata.set_target(node, target);
    }
    for (decl, ty) in outputs.3 {
        unit.metadata.set_variable_type(decl, ty);
    }
}

fn annotation_type(annotation: Option<&TypeAnnotation>) -> Type {
    match annotation {
        None => Type::Dynamic,
        Some(annotation) => match normalize_name(&annotation.name) {
            None => Type::Dynamic,
            Some(name) => {
                let args: Vec<Type> = annotation
                    .args
                    .iter()
                    .map(|a| annotation_type(Some(a)))
                    .collect();
                Type::of(name, args)
            }
        },
    }
}

/// Generics bindings implied by a receiver's instantiation, using the
/// placeholder names its member tables are written with.
fn receiver_bindings(ty: &Type) -> Bindings {
    let mut bindings = Bindings::new();
    if let Type::Named { name, args, .. } = ty {
        match name {
            TypeName::List | TypeName::Set | TypeName::Bag | TypeName::Iterable => {
                if let Some(a) = args.first() {
                    bindings.insert("E".to_string(), a.clone());
                }
            }
            TypeName::Map => {
                if let Some(a) = args.first() {
                    bindings.insert("K".to_string(), a.clone());
                }
                if let Some(a) = args.get(1) {
                    bindings.insert("V".to_string(), a.clone());
                }
            }
            TypeName::Channel | TypeName::Value => {
                if let Some(a) = args.first() {
                    bindings.insert("T".to_string(), a.clone());
                }
            }
            _ => {}
        }
    }
    bindings
}

struct ReturnCtx {
    declared: Type,
    inferred: Option<Type>,
}

struct TypeChecker<'a> {
    processes: &'a HashMap<String, ProcessSignature>,
    workflows: &'a HashMap<String, WorkflowSignature>,
    functions: HashMap<String, (Vec<Type>, Type, NodeId)>,
    external: &'a ExternalSignatures,
    targets: HashMap<NodeId, Target>,
    var_types: HashMap<NodeId, Type>,
    errors: Vec<ParseError>,
    types: Vec<(NodeId, Type)>,
    new_targets: Vec<(NodeId, Target)>,
    /// Closures typed during dispatch; the generic walk skips them.
    inferred_closures: HashSet<NodeId>,
    /// Call-result record types per process/workflow definition node,
    /// read back by `.out` property accesses.
    call_results: HashMap<NodeId, Type>,
    return_stack: Vec<ReturnCtx>,
}

impl<'a> TypeChecker<'a> {
    fn error(&mut self, span: ParseSourceSpan, msg: impl Into<String>) {
        self.errors
            .push(ParseError::new(span, msg, CompilePhase::TypeChecking));
    }

    fn warning(&mut self, span: ParseSourceSpan, msg: impl Into<String>) {
        self.errors
            .push(ParseError::warning(span, msg, CompilePhase::TypeChecking));
    }

    fn future(&mut self, span: ParseSourceSpan, msg: impl Into<String>) {
        self.errors
            .push(ParseError::future(span, msg, CompilePhase::TypeChecking));
    }

    fn record(&mut self, node: NodeId, ty: Type) -> Type {
        self.types.push((node, ty.clone()));
        ty
    }

    // -- module --------------------------------------------------------------

    fn visit_module(&mut self, module: &ScriptModule) {
        for declaration in &module.declarations {
            match declaration {
                Declaration::Include(_) => {}
                Declaration::FeatureFlag(flag) => {
                    self.infer_expression(&flag.value);
                }
                Declaration::Process(process) => self.visit_process(process),
                Declaration::Workflow(workflow) => self.visit_workflow(workflow),
                Declaration::Function(function) => self.visit_function(function),
                Declaration::Output(output) => {
                    for target in &output.targets {
                        self.visit_statements(&target.body);
                    }
                }
                Declaration::Stmt(statement) => self.visit_statement(statement),
            }
        }
    }

    fn visit_process(&mut self, process: &ProcessDef) {
        self.visit_statements(&process.directives);
        self.visit_statements(&process.inputs);
        self.visit_statements(&process.outputs);
        if let Some(when) = &process.when {
            let ty = self.infer_expression(when);
            if !assignable(&Type::named(TypeName::Boolean), &ty) {
                self.error(
                    when.span(),
                    format!("`when:` expects a Boolean condition, not {}", ty),
                );
            }
        }
        if let Some(body) = &process.body {
            self.visit_statements(&body.statements);
        }
        self.visit_statements(&process.stub);
        self.visit_statements(&process.topics);
    }

    fn visit_workflow(&mut self, workflow: &WorkflowDef) {
        self.visit_statements(&workflow.main);
        for emit in &workflow.emits {
            if let Some(value) = &emit.value {
                self.infer_expression(value);
            }
        }
        for publish in &workflow.publishers {
            self.infer_expression(&publish.source);
        }
        if let Some(handler) = &workflow.on_complete {
            self.visit_statement(handler);
        }
        if let Some(handler) = &workflow.on_error {
            self.visit_statement(handler);
        }
    }

    fn visit_function(&mut self, function: &FunctionDef) {
        let declared = annotation_type(function.return_type.as_ref());
        self.return_stack.push(ReturnCtx { declared, inferred: None });
        self.visit_body_with_trailing_return(&function.body);
        self.return_stack.pop();
    }

    // -- statements ----------------------------------------------------------

    fn visit_statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.visit_statement(statement);
        }
    }

    /// Visit a function or closure body, treating a trailing expression
    /// statement as the return value.
    fn visit_body_with_trailing_return(&mut self, statements: &[Statement]) {
        for (index, statement) in statements.iter().enumerate() {
            let trailing = index + 1 == statements.len();
            if trailing {
                if let Statement::Expr(stmt) = statement {
                    let ty = self.infer_expression(&stmt.expression);
                    self.check_return(stmt.expression.span(), ty);
                    continue;
                }
            }
            self.visit_statement(statement);
        }
    }

    fn check_return(&mut self, span: ParseSourceSpan, ty: Type) {
        let Some(ctx) = self.return_stack.last_mut() else { return };
        if !ctx.declared.is_dynamic() {
            let declared = ctx.declared.clone();
            if !assignable(&declared, &ty) {
                self.error(
                    span,
                    format!("Cannot return {} from a function declared to return {}", ty, declared),
                );
            }
            return;
        }
        match &ctx.inferred {
            None => ctx.inferred = Some(ty),
            Some(first) => {
                let first = first.clone();
                if !first.is_dynamic() && !ty.is_dynamic() && !assignable(&first, &ty) {
                    self.error(
                        span,
                        format!("Return type {} does not match earlier return type {}", ty, first),
                    );
                }
            }
        }
    }

    fn visit_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Expr(stmt) => {
                self.infer_expression(&stmt.expression);
            }
            Statement::VarDecl(decl) => self.visit_var_decl(decl),
            Statement::Assignment(stmt) => self.visit_assignment(stmt),
            Statement::Block(block) => self.visit_statements(&block.statements),
            Statement::If(stmt) => {
                self.infer_expression(&stmt.condition);
                self.visit_statement(&stmt.then_branch);
                if let Some(else_branch) = &stmt.else_branch {
                    self.visit_statement(else_branch);
                }
            }
            Statement::Return(stmt) => {
                let ty = match &stmt.value {
                    Some(value) => self.infer_expression(value),
                    None => Type::Dynamic,
                };
                let span = stmt.value.as_ref().map(|v| v.span()).unwrap_or(stmt.span);
                self.check_return(span, ty);
            }
            Statement::Throw(stmt) => {
                self.infer_expression(&stmt.value);
            }
            Statement::TryCatch(stmt) => {
                self.visit_statements(&stmt.body);
                for clause in &stmt.catches {
                    self.visit_statements(&clause.body);
                }
                if let Some(finally) = &stmt.finally {
                    self.visit_statements(finally);
                }
            }
            Statement::Incomplete(_) => {}
        }
    }

    fn visit_var_decl(&mut self, decl: &VarDeclStmt) {
        let init_ty = decl
            .initializer
            .as_ref()
            .map(|init| self.infer_expression(init));

        if decl.names.len() > 1 {
            // Tuple destructuring declaration.
            if let Some(init_ty) = &init_ty {
                self.destructure(
                    decl.span,
                    &decl.names.iter().map(|n| n.id).collect::<Vec<_>>(),
                    init_ty,
                );
            }
            return;
        }

        let Some(name) = decl.names.first() else { return };
        let declared = annotation_type(name.ty.as_ref());
        match (&declared, &init_ty) {
            (Type::Dynamic, Some(init_ty)) => {
                self.var_types.insert(name.id, init_ty.clone());
            }
            (declared_ty, Some(init_ty)) => {
                if !assignable(declared_ty, init_ty) {
                    self.error(
                        decl.span,
                        format!("Cannot assign {} to a variable of type {}", init_ty, declared_ty),
                    );
                }
            }
            _ => {}
        }
    }

    fn destructure(&mut self, span: ParseSourceSpan, decls: &[NodeId], source: &Type) {
        let components: Option<Vec<Type>> = match source {
            Type::Tuple(elements) => Some(elements.clone()),
            Type::Record(fields) => Some(fields.iter().map(|(_, t)| t.clone()).collect()),
            Type::Named { name: TypeName::List, args, .. } => {
                let item = args.first().cloned().unwrap_or(Type::Dynamic);
                Some(vec![item; decls.len()])
            }
            Type::Dynamic => None,
            _ => {
                self.error(span, format!("Cannot destructure a value of type {}", source));
                None
            }
        };
        if let Some(components) = components {
            if matches!(source, Type::Tuple(_) | Type::Record(_))
                && components.len() != decls.len()
            {
                self.error(
                    span,
                    format!(
                        "Destructuring expects {} values but the right-hand side has {}",
                        decls.len(),
                        components.len()
                    ),
                );
            }
            for (decl, ty) in decls.iter().zip(components) {
                self.var_types.insert(*decl, ty);
            }
        }
    }

    fn visit_assignment(&mut self, stmt: &AssignmentStmt) {
        let value_ty = self.infer_expression(&stmt.value);
        match stmt.target.unwrapped() {
            Expression::Variable(variable) => {
                let decl = match self.targets.get(&variable.id) {
                    Some(Target::Node { node, .. }) => Some(*node),
                    _ => None,
                };
                if let Some(decl) = decl {
                    let declared = self.var_types.get(&decl).cloned().unwrap_or(Type::Dynamic);
                    if declared.is_dynamic() {
                        if stmt.op == "=" {
                            self.var_types.insert(decl, value_ty.clone());
                        }
                    } else if stmt.op == "=" && !assignable(&declared, &value_ty) {
                        self.error(
                            stmt.span,
                            format!("Cannot assign {} to a variable of type {}", value_ty, declared),
                        );
                    }
                }
                self.record(variable.id, value_ty);
            }
            Expression::Tuple(tuple) => {
                let decls: Vec<NodeId> = tuple
                    .elements
                    .iter()
                    .filter_map(|e| match e.unwrapped() {
                        Expression::Variable(v) => match self.targets.get(&v.id) {
                            Some(Target::Node { node, .. }) => Some(*node),
                            _ => None,
                        },
                        _ => None,
                    })
                    .collect();
                if decls.len() == tuple.elements.len() {
                    self.destructure(stmt.span, &decls, &value_ty);
                }
            }
            _ => {
                self.infer_expression(&stmt.target);
            }
        }
    }

    // -- expressions ---------------------------------------------------------

    fn infer_expression(&mut self, expression: &Expression) -> Type {
        let ty = self.infer_expression_inner(expression);
        self.record(expression.id(), ty)
    }

    fn infer_expression_inner(&mut self, expression: &Expression) -> Type {
        match expression {
            Expression::Constant(constant) => match constant.value {
                ConstantValue::Integer(_) => Type::named(TypeName::Integer),
                ConstantValue::Float(_) => Type::named(TypeName::Float),
                ConstantValue::Boolean(_) => Type::named(TypeName::Boolean),
                ConstantValue::Null => Type::Dynamic,
            },
            Expression::Str(string) => {
                for part in &string.parts {
                    self.infer_expression(part);
                }
                if string.kind == StringTokenKind::Slashy {
                    // Uninterpolated patterns can be validated right here.
                    if string.parts.is_empty() {
                        if let Err(error) = regex::Regex::new(&string.value) {
                            self.warning(
                                string.span,
                                format!("Invalid regular expression: {}", simple_regex_error(&error)),
                            );
                        }
                    }
                    Type::named(TypeName::Regex)
                } else {
                    Type::named(TypeName::String)
                }
            }
            Expression::Variable(variable) => self.infer_variable(variable),
            Expression::List(list) => {
                let mut element = Type::Dynamic;
                for (index, item) in list.elements.iter().enumerate() {
                    let ty = self.infer_expression(item);
                    if index == 0 {
                        element = ty;
                    } else if let Some(common) = common_type(&element, &ty) {
                        element = common;
                    } else {
                        self.error(
                            item.span(),
                            format!("List element of type {} does not fit a List<{}>", ty, element),
                        );
                        element = Type::Dynamic;
                    }
                }
                Type::of(TypeName::List, vec![element])
            }
            Expression::Map(map) => {
                let mut value = Type::Dynamic;
                for (index, entry) in map.entries.iter().enumerate() {
                    let ty = self.infer_expression(&entry.value);
                    if index == 0 {
                        value = ty;
                    } else {
                        value = common_type(&value, &ty).unwrap_or(Type::Dynamic);
                    }
                }
                Type::of(TypeName::Map, vec![Type::named(TypeName::String), value])
            }
            Expression::Tuple(tuple) => Type::Tuple(
                tuple
                    .elements
                    .iter()
                    .map(|e| self.infer_expression(e))
                    .collect(),
            ),
            Expression::Range(range) => {
                let from = self.infer_expression(&range.from);
                self.infer_expression(&range.to);
                if from.is(TypeName::Integer) {
                    Type::of(TypeName::List, vec![Type::named(TypeName::Integer)])
                } else {
                    Type::of(TypeName::List, vec![Type::Dynamic])
                }
            }
            Expression::Paren(paren) => self.infer_expression(&paren.expression),
            Expression::Ternary(ternary) => {
                self.infer_expression(&ternary.condition);
                let true_ty = self.infer_expression(&ternary.true_expr);
                let false_ty = self.infer_expression(&ternary.false_expr);
                match common_type(&true_ty, &false_ty) {
                    Some(common) => common,
                    None => {
                        self.error(
                            ternary.span,
                            format!(
                                "Conditional branches have incompatible types {} and {}",
                                true_ty, false_ty
                            ),
                        );
                        Type::Dynamic
                    }
                }
            }
            Expression::Elvis(elvis) => {
                let value_ty = self.infer_expression(&elvis.value);
                let fallback_ty = self.infer_expression(&elvis.fallback);
                common_type(&value_ty, &fallback_ty).unwrap_or(Type::Dynamic)
            }
            Expression::Cast(cast) => {
                let source = self.infer_expression(&cast.expression);
                let target = annotation_type(Some(&cast.ty));
                if target.is_dynamic() {
                    self.error(
                        cast.ty.span,
                        format!("Unknown type '{}' in cast", cast.ty.name),
                    );
                } else if !source.is_dynamic()
                    && !assignable(&target, &source)
                    && !assignable(&source, &target)
                {
                    self.error(
                        cast.span,
                        format!("Cannot cast {} to {}", source, target),
                    );
                }
                target
            }
            Expression::Unary(unary) => self.infer_unary(unary),
            Expression::Binary(binary) => self.infer_binary(binary),
            Expression::Index(index) => self.infer_index(index),
            Expression::Property(property) => self.infer_property(property),
            Expression::MethodCall(call) => self.infer_method_call(call),
            Expression::Closure(closure) => self.infer_closure(closure, None),
            Expression::Empty(_) => Type::Dynamic,
        }
    }

    fn infer_variable(&mut self, variable: &VariableExpr) -> Type {
        match self.targets.get(&variable.id) {
            Some(Target::Node { node, .. }) => {
                self.var_types.get(node).cloned().unwrap_or(Type::Dynamic)
            }
            Some(Target::Builtin { scope, member }) => builtin_member(scope, member)
                .map(|m| m.ret.clone())
                .unwrap_or(Type::Dynamic),
            None => Type::Dynamic,
        }
    }

    fn infer_unary(&mut self, unary: &UnaryExpr) -> Type {
        let operand = self.infer_expression(&unary.operand);
        if unary.op == "!" {
            return Type::named(TypeName::Boolean);
        }
        let Some(method) = dsl::unary_op_method(&unary.op) else {
            return Type::Dynamic;
        };
        if operand.is_dynamic() {
            return Type::Dynamic;
        }
        if let Type::Named { name, .. } = &operand {
            let bindings = receiver_bindings(&operand);
            for candidate in dsl::ops_of(*name) {
                if candidate.name == method && candidate.param.is_none() {
                    return substitute(&candidate.ret, &bindings);
                }
            }
        }
        self.error(
            unary.span,
            format!("Operator '{}' is not defined for {}", unary.op, operand),
        );
        Type::Dynamic
    }

    fn infer_binary(&mut self, binary: &BinaryExpr) -> Type {
        let op = binary.op.as_str();
        if op == "|" {
            return self.infer_pipe(binary);
        }

        let left = self.infer_expression(&binary.left);
        let right = self.infer_expression(&binary.right);

        match op {
            "==" | "!=" | "<" | ">" | "<=" | ">=" | "in" | "instanceof" | "==~" => {
                return Type::named(TypeName::Boolean);
            }
            "&&" | "||" => return Type::named(TypeName::Boolean),
            "<=>" => return Type::named(TypeName::Integer),
            "=~" => return Type::Dynamic,
            _ => {}
        }

        let Some(method) = dsl::binary_op_method(op) else {
            return Type::Dynamic;
        };
        if left.is_dynamic() || right.is_dynamic() {
            return Type::Dynamic;
        }

        // Ops class of the left operand first, then the right one.
        for (receiver, argument) in [(&left, &right), (&right, &left)] {
            if let Type::Named { name, .. } = receiver {
                let mut bindings = receiver_bindings(receiver);
                for candidate in dsl::ops_of(*name) {
                    if candidate.name != method {
                        continue;
                    }
                    let Some(param) = &candidate.param else { continue };
                    connect(param, argument, &mut bindings);
                    let param = substitute(param, &bindings);
                    if assignable(&param, argument) {
                        return substitute(&candidate.ret, &bindings);
                    }
                }
            }
        }

        self.error(
            binary.span,
            format!("Operator '{}' is not defined for {} and {}", op, left, right),
        );
        Type::Dynamic
    }

    /// `ch | map { ... } | view` applies the right-hand side as an
    /// operator on the left value.
    fn infer_pipe(&mut self, binary: &BinaryExpr) -> Type {
        let left = self.infer_expression(&binary.left);
        match binary.right.unwrapped() {
            Expression::Variable(name) => {
                let synthetic = MethodCallExpr {
                    id: name.id,
                    span: binary.span,
                    receiver: None,
                    name: name.name.clone(),
                    name_span: name.span,
                    args: Vec::new(),
                    named_args: Vec::new(),
                    safe: false,
                    command_form: true,
                };
                self.dispatch_on_receiver_type(&left, &synthetic)
            }
            Expression::MethodCall(call) if call.receiver.is_none() => {
                self.dispatch_on_receiver_type(&left, call)
            }
            _ => {
                self.infer_expression(&binary.right);
                Type::Dynamic
            }
        }
    }

    fn infer_index(&mut self, index: &IndexExpr) -> Type {
        let receiver = self.infer_expression(&index.receiver);
        let key = self.infer_expression(&index.index);

        // Tuple receivers with a literal index resolve to the component.
        if let Type::Tuple(elements) = &receiver {
            if let Expression::Constant(constant) = index.index.unwrapped() {
                if let ConstantValue::Integer(value) = constant.value {
                    let position = if value < 0 {
                        elements.len() as i64 + value
                    } else {
                        value
                    };
                    if position < 0 || position as usize >= elements.len() {
                        self.error(
                            index.span,
                            format!(
                                "Tuple index {} is out of range for a {}-tuple",
                                value,
                                elements.len()
                            ),
                        );
                        return Type::Dynamic;
                    }
                    return elements[position as usize].clone();
                }
            }
            return Type::Dynamic;
        }

        if receiver.is_dynamic() {
            return Type::Dynamic;
        }
        if let Type::Named { name, .. } = &receiver {
            let mut bindings = receiver_bindings(&receiver);
            for candidate in dsl::ops_of(*name) {
                if candidate.name != "getAt" {
                    continue;
                }
                let Some(param) = &candidate.param else { continue };
                connect(param, &key, &mut bindings);
                let param = substitute(param, &bindings);
                if assignable(&param, &key) {
                    return substitute(&candidate.ret, &bindings);
                }
            }
        }
        self.error(
            index.span,
            format!("Operator '[]' is not defined for {}", receiver),
        );
        Type::Dynamic
    }

    fn infer_property(&mut self, property: &PropertyExpr) -> Type {
        // Namespace members were already bound during name resolution.
        if let Some(Target::Builtin { scope, member }) = self.targets.get(&property.id) {
            let ty = builtin_member(scope, member)
                .map(|m| m.ret.clone())
                .unwrap_or(Type::Dynamic);
            self.infer_expression(&property.receiver);
            return ty;
        }

        let receiver_ty = self.infer_expression(&property.receiver);

        // `P.out` reads back a process or workflow call result.
        if let Expression::Variable(receiver) = property.receiver.unwrapped() {
            if let Some(Target::Node { node, .. }) = self.targets.get(&receiver.id) {
                if let Some(result) = self.call_results.get(node).cloned() {
                    if property.name == "out" {
                        return result;
                    }
                }
                let node = *node;
                if property.name == "out"
                    && (self.process_by_node(node).is_some()
                        || self.workflow_by_node(node).is_some())
                {
                    // Called before any call site was seen; assume value
                    // wrappers.
                    if let Some(signature) = self.process_by_node(node) {
                        return process_return_type(signature, TypeName::Value);
                    }
                    if let Some(signature) = self.workflow_by_node(node) {
                        return workflow_return_type(signature);
                    }
                }
            }
        }

        match &receiver_ty {
            Type::Record(fields) => {
                if let Some((_, ty)) = fields.iter().find(|(n, _)| n == &property.name) {
                    return ty.clone();
                }
                self.error(
                    property.name_span,
                    format!("Unknown field '{}' of {}", property.name, receiver_ty),
                );
                Type::Dynamic
            }
            Type::Named { name, .. } => {
                let members = dsl::members_of(*name);
                let bindings = receiver_bindings(&receiver_ty);
                if let Some(member) = members.iter().find(|m| m.name == property.name) {
                    self.new_targets.push((
                        property.id,
                        Target::Builtin {
                            scope: name.as_str(),
                            member: member.name.to_string(),
                        },
                    ));
                    let ty = match member.kind {
                        MemberKind::Method if member.params.is_empty() => member.ret.clone(),
                        MemberKind::Method => Type::Function {
                            params: member.params.clone(),
                            ret: Box::new(member.ret.clone()),
                        },
                        _ => member.ret.clone(),
                    };
                    return substitute(&ty, &bindings);
                }
                if *name == TypeName::Map {
                    // Maps expose entries as properties.
                    return bindings.get("V").cloned().unwrap_or(Type::Dynamic);
                }
                self.error(
                    property.name_span,
                    format!("Unknown member '{}' of {}", property.name, receiver_ty),
                );
                Type::Dynamic
            }
            _ => Type::Dynamic,
        }
    }

    fn process_by_node(&self, node: NodeId) -> Option<&ProcessSignature> {
        self.processes
            .values()
            .chain(self.external.processes.values())
            .find(|s| s.node == node)
    }

    fn workflow_by_node(&self, node: NodeId) -> Option<&WorkflowSignature> {
        self.workflows
            .values()
            .chain(self.external.workflows.values())
            .find(|s| s.node == node)
    }

    // -- calls ---------------------------------------------------------------

    fn infer_method_call(&mut self, call: &MethodCallExpr) -> Type {
        match &call.receiver {
            None => self.infer_plain_call(call),
            Some(receiver) => {
                // Namespace calls carry a resolver-bound builtin target.
                if let Some(Target::Builtin { scope, member }) =
                    self.targets.get(&call.id).cloned()
                {
                    self.infer_expression(receiver);
                    let Some(surface) = dsl::scope_by_name(scope) else {
                        return Type::Dynamic;
                    };
                    let candidates = surface.find_all(&member);
                    return self.dispatch(call, &candidates, Bindings::new(), Type::Dynamic);
                }
                let receiver_ty = self.infer_expression(receiver);
                self.dispatch_on_receiver_type(&receiver_ty, call)
            }
        }
    }

    fn infer_plain_call(&mut self, call: &MethodCallExpr) -> Type {
        // Process and workflow calls by local name.
        if let Some(signature) = self
            .processes
            .get(&call.name)
            .or_else(|| self.external.processes.get(&call.name))
            .cloned()
        {
            return self.infer_process_call(call, &signature);
        }
        if let Some(signature) = self
            .workflows
            .get(&call.name)
            .or_else(|| self.external.workflows.get(&call.name))
            .cloned()
        {
            return self.infer_workflow_call(call, &signature);
        }
        if let Some((params, ret, _)) = self.functions.get(&call.name).cloned() {
            if call.args.len() != params.len() {
                self.error(
                    call.span,
                    format!(
                        "'{}' expects {} arguments but was called with {}",
                        call.name,
                        params.len(),
                        call.args.len()
                    ),
                );
            }
            for (index, arg) in call.args.iter().enumerate() {
                let arg_ty = self.infer_call_argument(arg, params.get(index), &Bindings::new());
                if let Some(param) = params.get(index) {
                    if !assignable(param, &arg_ty) {
                        self.error(
                            arg.span(),
                            format!("Cannot pass {} where {} is expected", arg_ty, param),
                        );
                    }
                }
            }
            return ret;
        }

        if let Some(Target::Builtin { scope, member }) = self.targets.get(&call.id).cloned() {
            let Some(surface) = dsl::scope_by_name(scope) else {
                return Type::Dynamic;
            };
            let candidates = surface.find_all(&member);
            return self.dispatch(call, &candidates, Bindings::new(), Type::Dynamic);
        }

        // Unknown target; still type the arguments.
        for arg in &call.args {
            self.infer_expression(arg);
        }
        for named in &call.named_args {
            self.infer_expression(&named.value);
        }
        Type::Dynamic
    }

    fn infer_process_call(&mut self, call: &MethodCallExpr, signature: &ProcessSignature) -> Type {
        if call.args.len() != signature.inputs.len() {
            self.error(
                call.span,
                format!(
                    "Process '{}' expects {} inputs but was called with {}",
                    signature.name,
                    signature.inputs.len(),
                    call.args.len()
                ),
            );
        }

        let mut channel_args = 0usize;
        for (index, arg) in call.args.iter().enumerate() {
            let arg_ty = self.infer_expression(arg);
            if arg_ty.is(TypeName::Channel) {
                channel_args += 1;
            }
            if let Some((input_name, declared)) = signature.inputs.get(index) {
                let bare = match &arg_ty {
                    Type::Named { name: TypeName::Channel, args, .. }
                    | Type::Named { name: TypeName::Value, args, .. } => {
                        args.first().cloned().unwrap_or(Type::Dynamic)
                    }
                    other => other.clone(),
                };
                if !assignable(declared, &bare) {
                    self.error(
                        arg.span(),
                        format!(
                            "Input '{}' of process '{}' expects {} but got {}",
                            input_name, signature.name, declared, bare
                        ),
                    );
                }
            }
        }

        if channel_args >= 2 {
            self.future(
                call.span,
                format!(
                    "Process '{}' is called with {} queue channels; emission order is not deterministic",
                    signature.name, channel_args
                ),
            );
        }

        let wrapper = if channel_args > 0 {
            TypeName::Channel
        } else {
            TypeName::Value
        };
        let result = process_return_type(signature, wrapper);
        self.call_results.insert(signature.node, result.clone());
        result
    }

    fn infer_workflow_call(
        &mut self,
        call: &MethodCallExpr,
        signature: &WorkflowSignature,
    ) -> Type {
        if call.args.len() != signature.takes.len() {
            self.error(
                call.span,
                format!(
                    "Workflow '{}' expects {} inputs but was called with {}",
                    signature.name.as_deref().unwrap_or("<entry>"),
                    signature.takes.len(),
                    call.args.len()
                ),
            );
        }
        for arg in &call.args {
            self.infer_expression(arg);
        }
        let result = workflow_return_type(signature);
        self.call_results.insert(signature.node, result.clone());
        result
    }

    fn dispatch_on_receiver_type(&mut self, receiver_ty: &Type, call: &MethodCallExpr) -> Type {
        // Tuple-shaped channel operators get synthesized return types.
        if receiver_ty.is(TypeName::Channel) {
            match call.name.as_str() {
                "combine" => return self.infer_combine(receiver_ty, call),
                "join" => return self.infer_join(receiver_ty, call),
                "groupTuple" => return self.infer_group_tuple(receiver_ty, call),
                _ => {}
            }
        }

        if receiver_ty.is_dynamic() {
            for arg in &call.args {
                self.infer_call_argument(arg, None, &Bindings::new());
            }
            for named in &call.named_args {
                self.infer_expression(&named.value);
            }
            return Type::Dynamic;
        }

        let Type::Named { name, .. } = receiver_ty else {
            for arg in &call.args {
                self.infer_call_argument(arg, None, &Bindings::new());
            }
            return Type::Dynamic;
        };

        let members = dsl::members_of(*name);
        let candidates: Vec<&ClassMember> =
            members.iter().filter(|m| m.name == call.name).collect();
        if candidates.is_empty() {
            self.error(
                call.name_span,
                format!("Unknown method '{}' for {}", call.name, receiver_ty),
            );
            for arg in &call.args {
                self.infer_call_argument(arg, None, &Bindings::new());
            }
            return Type::Dynamic;
        }
        self.new_targets.push((
            call.id,
            Target::Builtin { scope: name.as_str(), member: call.name.clone() },
        ));
        let bindings = receiver_bindings(receiver_ty);
        self.dispatch(call, &candidates, bindings, receiver_ty.clone())
    }

    /// Candidate selection and generics instantiation for one call.
    fn dispatch(
        &mut self,
        call: &MethodCallExpr,
        candidates: &[&ClassMember],
        receiver_bindings: Bindings,
        receiver_ty: Type,
    ) -> Type {
        let selected = candidates.iter().find(|member| {
            if member.varargs {
                return call.args.len() + 1 >= member.params.len();
            }
            if member.params.len() == call.args.len() {
                return true;
            }
            // A trailing functional parameter is optional (`ch.view()`),
            // and named arguments satisfy a trailing options parameter.
            member.params.len() == call.args.len() + 1
                && (!call.named_args.is_empty()
                    || matches!(member.params.last(), Some(Type::Function { .. })))
        });

        let Some(member) = selected else {
            let arity: Vec<String> =
                candidates.iter().map(|m| m.params.len().to_string()).collect();
            self.error(
                call.span,
                format!(
                    "'{}' expects {} arguments but was called with {}",
                    call.name,
                    arity.join(" or "),
                    call.args.len()
                ),
            );
            for arg in &call.args {
                self.infer_call_argument(arg, None, &receiver_bindings);
            }
            self.infer_named_args(call);
            return Type::Dynamic;
        };

        let mut bindings = receiver_bindings;
        for (index, arg) in call.args.iter().enumerate() {
            let param = if member.varargs && index >= member.params.len() {
                member.params.last()
            } else {
                member.params.get(index).or(if member.varargs {
                    member.params.last()
                } else {
                    None
                })
            };
            let arg_ty = self.infer_call_argument(arg, param, &bindings);
            if let Some(param) = param {
                connect(param, &arg_ty, &mut bindings);
                // Closure arguments were already shape-checked during
                // parameter inference, including tuple destructuring.
                let is_closure = matches!(arg.unwrapped(), Expression::Closure(_));
                if !is_closure {
                    let instantiated = substitute(param, &bindings);
                    if !assignable(&instantiated, &arg_ty) {
                        self.error(
                            arg.span(),
                            format!("Cannot pass {} where {} is expected", arg_ty, instantiated),
                        );
                    }
                }
            }
        }
        self.infer_named_args(call);
        let _ = receiver_ty;
        substitute(&member.ret, &bindings)
    }

    /// Infer one call argument. Closure arguments against functional
    /// parameters pick up their parameter types from the target shape
    /// before their bodies are typed.
    fn infer_call_argument(
        &mut self,
        arg: &Expression,
        param: Option<&Type>,
        bindings: &Bindings,
    ) -> Type {
        if let Expression::Closure(closure) = arg.unwrapped() {
            let shape = param.map(|p| substitute(p, bindings));
            let sam = match &shape {
                Some(Type::Function { params, ret }) => {
                    Some((params.clone(), ret.as_ref().clone()))
                }
                _ => None,
            };
            if let Some((sam_params, _)) = sam {
                let ty = self.infer_closure(closure, Some(&sam_params));
                self.record(arg.id(), ty.clone());
                return ty;
            }
        }
        self.infer_expression(arg)
    }

    /// Infer a closure's function type. When a target shape is known,
    /// dynamic parameters adopt its parameter types, with a single tuple
    /// parameter destructuring across multiple closure parameters.
    fn infer_closure(&mut self, closure: &ClosureExpr, sam_params: Option<&[Type]>) -> Type {
        if self.inferred_closures.contains(&closure.id) {
            // Already typed during dispatch; reuse the recorded shape.
            if let Some((_, ty)) = self.types.iter().rev().find(|(id, _)| *id == closure.id) {
                return ty.clone();
            }
        }
        self.inferred_closures.insert(closure.id);

        let arity = if closure.implicit_params { 1 } else { closure.params.len() };
        let mut param_types: Vec<Type> = vec![Type::Dynamic; arity.max(1)];

        if let Some(sam_params) = sam_params {
            if sam_params.len() == arity {
                param_types = sam_params.to_vec();
            } else if sam_params.len() == 1 && arity > 1 {
                // Tuple destructure: a single tuple parameter spreads over
                // the closure's parameters.
                if let Type::Tuple(components) = &sam_params[0] {
                    if components.len() == arity {
                        param_types = components.clone();
                    } else {
                        self.error(
                            closure.span,
                            format!(
                                "Closure declares {} parameters but the tuple has {} components",
                                arity,
                                components.len()
                            ),
                        );
                    }
                } else {
                    self.error(
                        closure.span,
                        format!(
                            "Closure declares {} parameters but the target accepts 1",
                            arity
                        ),
                    );
                }
            } else if !sam_params.is_empty() {
                self.error(
                    closure.span,
                    format!(
                        "Closure declares {} parameters but the target accepts {}",
                        arity,
                        sam_params.len()
                    ),
                );
            }
        }

        // Bind parameter declarations to their inferred types.
        if closure.implicit_params {
            // The implicit `it` declaration points at the closure node.
            self.var_types
                .insert(closure.id, param_types.first().cloned().unwrap_or(Type::Dynamic));
        } else {
            for (param, ty) in closure.params.iter().zip(param_types.iter()) {
                let declared = annotation_type(param.ty.as_ref());
                if declared.is_dynamic() {
                    self.var_types.insert(param.id, ty.clone());
                } else {
                    self.var_types.insert(param.id, declared);
                }
            }
        }

        let declared_ret = Type::Dynamic;
        self.return_stack.push(ReturnCtx { declared: declared_ret, inferred: None });
        self.visit_body_with_trailing_return(&closure.body);
        let inferred = self
            .return_stack
            .pop()
            .and_then(|ctx| ctx.inferred)
            .unwrap_or(Type::Dynamic);

        Type::Function { params: param_types, ret: Box::new(inferred) }
    }

    /// Type the named arguments once, validating against the member's
    /// accepted set when one is known.
    fn infer_named_args(&mut self, call: &MethodCallExpr) {
        let accepted = named_params_of(&call.name);
        for named in &call.named_args {
            let ty = self.infer_expression(&named.value);
            let Some(accepted) = accepted else { continue };
            match accepted.iter().find(|(name, _)| *name == named.name) {
                None => {
                    self.warning(
                        named.name_span,
                        format!("Unknown named argument '{}' for '{}'", named.name, call.name),
                    );
                }
                Some((_, expected)) => {
                    if !assignable(&Type::named(*expected), &ty) {
                        self.warning(
                            named.value.span(),
                            format!(
                                "Named argument '{}' of '{}' expects {} but got {}",
                                named.name,
                                call.name,
                                expected.as_str(),
                                ty
                            ),
                        );
                    }
                }
            }
        }
    }

    // -- tuple-shaped channel operators --------------------------------------

    fn has_by_arg(&self, call: &MethodCallExpr) -> bool {
        call.named_args.iter().any(|n| n.name == "by")
    }

    fn tuple_components(ty: &Type) -> Vec<Type> {
        match ty {
            Type::Tuple(elements) => elements.clone(),
            other => vec![other.clone()],
        }
    }

    /// `combine((L1..Lm), R) → Channel<(L1..Lm, R)>`
    fn infer_combine(&mut self, receiver_ty: &Type, call: &MethodCallExpr) -> Type {
        let arg_ty = match call.args.first() {
            Some(arg) => self.infer_expression(arg),
            None => Type::Dynamic,
        };
        self.infer_named_args(call);
        if self.has_by_arg(call) {
            // Keyed combine projects on the shared element; out of scope.
            return Type::of(TypeName::Channel, vec![Type::Dynamic]);
        }
        let left = receiver_ty.item_type();
        let right = match &arg_ty {
            Type::Named { name: TypeName::Channel, args, .. }
            | Type::Named { name: TypeName::Value, args, .. } => {
                args.first().cloned().unwrap_or(Type::Dynamic)
            }
            other => other.clone(),
        };
        let mut components = Self::tuple_components(&left);
        components.push(right);
        Type::of(TypeName::Channel, vec![Type::Tuple(components)])
    }

    /// `join((K, L1..Lm), (K, R1..Rn)) → Channel<(K, L1..Lm, R1..Rn)>`
    fn infer_join(&mut self, receiver_ty: &Type, call: &MethodCallExpr) -> Type {
        let arg_ty = match call.args.first() {
            Some(arg) => self.infer_expression(arg),
            None => Type::Dynamic,
        };
        self.infer_named_args(call);
        if self.has_by_arg(call) {
            return Type::of(TypeName::Channel, vec![Type::Dynamic]);
        }
        let left = receiver_ty.item_type();
        let right = match &arg_ty {
            Type::Named { name: TypeName::Channel, args, .. } => {
                args.first().cloned().unwrap_or(Type::Dynamic)
            }
            other => other.clone(),
        };
        let (Type::Tuple(left_parts), Type::Tuple(right_parts)) = (&left, &right) else {
            return Type::of(TypeName::Channel, vec![Type::Dynamic]);
        };
        if left_parts.is_empty() || right_parts.is_empty() {
            return Type::of(TypeName::Channel, vec![Type::Dynamic]);
        }
        let mut components = vec![left_parts[0].clone()];
        components.extend(left_parts[1..].iter().cloned());
        components.extend(right_parts[1..].iter().cloned());
        Type::of(TypeName::Channel, vec![Type::Tuple(components)])
    }

    /// `groupTuple((K, V1..Vn)) → Channel<(K, Bag<V1>..Bag<Vn>)>`
    fn infer_group_tuple(&mut self, receiver_ty: &Type, call: &MethodCallExpr) -> Type {
        self.infer_named_args(call);
        if self.has_by_arg(call) {
            return Type::of(TypeName::Channel, vec![Type::Dynamic]);
        }
        let item = receiver_ty.item_type();
        let Type::Tuple(parts) = &item else {
            return Type::of(TypeName::Channel, vec![Type::Dynamic]);
        };
        if parts.is_empty() {
            return Type::of(TypeName::Channel, vec![Type::Dynamic]);
        }
        let mut components = vec![parts[0].clone()];
        for value in &parts[1..] {
            components.push(Type::of(TypeName::Bag, vec![value.clone()]));
        }
        Type::of(TypeName::Channel, vec![Type::Tuple(components)])
    }
}

fn builtin_member(scope: &str, member: &str) -> Option<&'static ClassMember> {
    dsl::builtin_member(scope, member)
}

/// The dataflow return shape of a process call: one wrapper for a single
/// unnamed output, a record of wrappers otherwise.
fn process_return_type(signature: &ProcessSignature, wrapper: TypeName) -> Type {
    match signature.outputs.len() {
        0 => Type::Dynamic,
        1 if signature.outputs[0].0.is_none() => {
            Type::of(wrapper, vec![signature.outputs[0].1.clone()])
        }
        _ => Type::Record(
            signature
                .outputs
                .iter()
                .enumerate()
                .map(|(index, (name, ty))| {
                    (
                        name.clone().unwrap_or_else(|| index.to_string()),
                        Type::of(wrapper, vec![ty.clone()]),
                    )
                })
                .collect(),
        ),
    }
}

/// The return shape of a workflow call: its emissions as channels.
fn workflow_return_type(signature: &WorkflowSignature) -> Type {
    match signature.emits.len() {
        0 => Type::Dynamic,
        1 if signature.emits[0].0.is_none() => {
            Type::of(TypeName::Channel, vec![signature.emits[0].1.clone()])
        }
        _ => Type::Record(
            signature
                .emits
                .iter()
                .enumerate()
                .map(|(index, (name, ty))| {
                    (
                        name.clone().unwrap_or_else(|| index.to_string()),
                        Type::of(TypeName::Channel, vec![ty.clone()]),
                    )
                })
                .collect(),
        ),
    }
}

/// First line of a regex parse error, which is all a diagnostic needs.
fn simple_regex_error(error: &regex::Error) -> String {
    let rendered = error.to_string();
    rendered
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty() && !line.trim_start().starts_with('^'))
        .unwrap_or("malformed pattern")
        .trim()
        .to_string()
}

/// Least common shape of two types, if any.
fn common_type(a: &Type, b: &Type) -> Option<Type> {
    if a == b {
        return Some(a.clone());
    }
    if a.is_dynamic() {
        return Some(b.clone());
    }
    if b.is_dynamic() {
        return Some(a.clone());
    }
    if assignable(a, b) {
        return Some(a.clone());
    }
    if assignable(b, a) {
        return Some(b.clone());
    }
    None
}
