//! Script Formatter
//!
//! Prints a parsed script back in canonical form. Formatting is a pure
//! function of the AST, so formatting an already-formatted file is a
//! no-op. Two style options: `harshil_alignment` aligns the `=` of
//! consecutive assignments, `mahesh_form` breaks pipe chains one operator
//! per line.

use crate::config::ast::*;
use crate::script::ast::*;

#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    pub harshil_alignment: bool,
    pub mahesh_form: bool,
}

pub struct Formatter {
    options: FormatOptions,
    out: String,
    indent: usize,
}

impl Formatter {
    pub fn new(options: FormatOptions) -> Self {
        Formatter { options, out: String::new(), indent: 0 }
    }

    pub fn format_script(mut self, module: &ScriptModule) -> String {
        let mut first = true;
        for declaration in &module.declarations {
            if !first && !matches!(declaration, Declaration::Include(_) | Declaration::Stmt(_))
            {
                self.out.push('\n');
            }
            self.print_declaration(declaration);
            first = false;
        }
        self.out
    }

    pub fn format_config(mut self, module: &ConfigModule) -> String {
        self.print_config_statements(&module.statements);
        self.out
    }

    // -- helpers ------------------------------------------------------------

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    // -- script -------------------------------------------------------------

    fn print_declaration(&mut self, declaration: &Declaration) {
        match declaration {
            Declaration::Include(include) => {
                let entries: Vec<String> = include
                    .entries
                    .iter()
                    .map(|e| match &e.alias {
                        Some(alias) => format!("{} as {}", e.name, alias),
                        None => e.name.clone(),
                    })
                    .collect();
                self.line(&format!(
                    "include {{ {} }} from '{}'",
                    entries.join(" ; "),
                    include.source
                ));
            }
            Declaration::FeatureFlag(flag) => {
                let value = print_expression(&flag.value, self.options);
                self.line(&format!("{} = {}", flag.name, value));
            }
            Declaration::Process(process) => self.print_process(process),
            Declaration::Workflow(workflow) => self.print_workflow(workflow),
            Declaration::Function(function) => self.print_function(function),
            Declaration::Output(output) => {
                self.line("output {");
                self.indent += 1;
                for target in &output.targets {
                    self.line(&format!("{} {{", target.name));
                    self.indent += 1;
                    self.print_statements(&target.body);
                    self.indent -= 1;
                    self.line("}");
                }
                self.indent -= 1;
                self.line("}");
            }
            Declaration::Stmt(statement) => self.print_statement(statement),
        }
    }

    fn print_process(&mut self, process: &ProcessDef) {
        self.line(&format!("process {} {{", process.name));
        self.indent += 1;
        self.print_statements(&process.directives);
        if !process.inputs.is_empty() {
            self.blank();
            self.line("input:");
            self.print_statements(&process.inputs);
        }
        if !process.outputs.is_empty() {
            self.blank();
            self.line("output:");
            self.print_statements(&process.outputs);
        }
        if let Some(when) = &process.when {
            self.blank();
            self.line("when:");
            let printed = print_expression(when, self.options);
            self.line(&printed);
        }
        if let Some(body) = &process.body {
            self.blank();
            let label = match body.kind {
                ProcessBodyKind::Script => "script:",
                ProcessBodyKind::Shell => "shell:",
                ProcessBodyKind::Exec => "exec:",
            };
            self.line(label);
            self.print_statements(&body.statements);
        }
        if !process.stub.is_empty() {
            self.blank();
            self.line("stub:");
            self.print_statements(&process.stub);
        }
        self.indent -= 1;
        self.line("}");
    }

    fn print_workflow(&mut self, workflow: &WorkflowDef) {
        match &workflow.name {
            Some(name) => self.line(&format!("workflow {} {{", name)),
            None => self.line("workflow {"),
        }
        self.indent += 1;
        if !workflow.takes.is_empty() {
            self.line("take:");
            let takes: Vec<TakeEntry> = workflow.takes.clone();
            for take in &takes {
                self.line(&take.name);
            }
            self.blank();
        }
        if !workflow.takes.is_empty() || !workflow.emits.is_empty() {
            self.line("main:");
        }
        self.print_statements(&workflow.main);
        if let Some(handler) = &workflow.on_complete {
            self.print_statement(handler);
        }
        if let Some(handler) = &workflow.on_error {
            self.print_statement(handler);
        }
        if !workflow.emits.is_empty() {
            self.blank();
            self.line("emit:");
            let emits: Vec<String> = workflow
                .emits
                .iter()
                .map(|emit| match (&emit.name, &emit.value) {
                    (Some(name), Some(value)) => {
                        let printed = print_expression(value, self.options);
                        if printed == *name {
                            printed
                        } else {
                            format!("{} = {}", name, printed)
                        }
                    }
                    (_, Some(value)) => print_expression(value, self.options),
                    (Some(name), None) => name.clone(),
                    (None, None) => String::new(),
                })
                .collect();
            for emit in emits {
                self.line(&emit);
            }
        }
        if !workflow.publishers.is_empty() {
            self.blank();
            self.line("publish:");
            let publishers: Vec<String> = workflow
                .publishers
                .iter()
                .map(|p| {
                    format!(
                        "{} >> '{}'",
                        print_expression(&p.source, self.options),
                        p.target
                    )
                })
                .collect();
            for publisher in publishers {
                self.line(&publisher);
            }
        }
        self.indent -= 1;
        self.line("}");
    }

    fn print_function(&mut self, function: &FunctionDef) {
        let params: Vec<String> = function
            .params
            .iter()
            .map(|p| match &p.ty {
                Some(ty) => format!("{} {}", print_type(ty), p.name),
                None => p.name.clone(),
            })
            .collect();
        let prefix = match &function.return_type {
            Some(ty) => print_type(ty),
            None => "def".to_string(),
        };
        self.line(&format!("{} {}({}) {{", prefix, function.name, params.join(", ")));
        self.indent += 1;
        self.print_statements(&function.body);
        self.indent -= 1;
        self.line("}");
    }

    fn print_statements(&mut self, statements: &[Statement]) {
        // With alignment on, pad the `=` of consecutive assignments.
        if self.options.harshil_alignment {
            let mut run: Vec<String> = Vec::new();
            let mut rendered: Vec<(Option<(String, String)>, String)> = Vec::new();
            for statement in statements {
                rendered.push(self.render_statement(statement));
            }
            let mut index = 0;
            while index < rendered.len() {
                if rendered[index].0.is_some() {
                    let mut end = index;
                    while end < rendered.len() && rendered[end].0.is_some() {
                        end += 1;
                    }
                    let width = rendered[index..end]
                        .iter()
                        .filter_map(|(lhs, _)| lhs.as_ref().map(|(l, _)| l.len()))
                        .max()
                        .unwrap_or(0);
                    for (lhs, _) in &rendered[index..end] {
                        let (left, right) = lhs.as_ref().unwrap();
                        run.push(format!("{:width$} = {}", left, right, width = width));
                    }
                    for line in run.drain(..) {
                        self.line(&line);
                    }
                    index = end;
                } else {
                    let text = rendered[index].1.clone();
                    for line in text.lines() {
                        self.line(line);
                    }
                    index += 1;
                }
            }
            return;
        }
        for statement in statements {
            self.print_statement(statement);
        }
    }

    /// Render one statement; assignments come back split for alignment.
    fn render_statement(&mut self, statement: &Statement) -> (Option<(String, String)>, String) {
        match statement {
            Statement::Assignment(stmt) if stmt.op == "=" => {
                let left = print_expression(&stmt.target, self.options);
                let right = print_expression(&stmt.value, self.options);
                let text = format!("{} = {}", left, right);
                (Some((left, right)), text)
            }
            other => {
                let mut nested = Formatter::new(self.options);
                nested.print_statement(other);
                let text = nested.out.trim_end().to_string();
                (None, text)
            }
        }
    }

    fn print_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Expr(stmt) => {
                let printed = print_expression(&stmt.expression, self.options);
                for line in printed.lines() {
                    self.line(line);
                }
            }
            Statement::VarDecl(decl) => {
                let names: Vec<String> = decl
                    .names
                    .iter()
                    .map(|n| match &n.ty {
                        Some(ty) => format!("{} {}", print_type(ty), n.name),
                        None => n.name.clone(),
                    })
                    .collect();
                let lhs = if decl.names.len() > 1 {
                    format!("def ({})", names.join(", "))
                } else if decl.names.first().map(|n| n.ty.is_some()).unwrap_or(false) {
                    names.join(", ")
                } else {
                    format!("def {}", names.join(", "))
                };
                match &decl.initializer {
                    Some(init) => {
                        let value = print_expression(init, self.options);
                        self.line(&format!("{} = {}", lhs, value));
                    }
                    None => self.line(&lhs),
                }
            }
            Statement::Assignment(stmt) => {
                let target = print_expression(&stmt.target, self.options);
                let value = print_expression(&stmt.value, self.options);
                self.line(&format!("{} {} {}", target, stmt.op, value));
            }
            Statement::Block(block) => {
                self.line("{");
                self.indent += 1;
                self.print_statements(&block.statements);
                self.indent -= 1;
                self.line("}");
            }
            Statement::If(stmt) => {
                let condition = print_expression(&stmt.condition, self.options);
                self.line(&format!("if ({}) {{", condition));
                self.indent += 1;
                self.print_branch(&stmt.then_branch);
                self.indent -= 1;
                match &stmt.else_branch {
                    Some(else_branch) => {
                        self.line("} else {");
                        self.indent += 1;
                        self.print_branch(else_branch);
                        self.indent -= 1;
                        self.line("}");
                    }
                    None => self.line("}"),
                }
            }
            Statement::Return(stmt) => match &stmt.value {
                Some(value) => {
                    let printed = print_expression(value, self.options);
                    self.line(&format!("return {}", printed));
                }
                None => self.line("return"),
            },
            Statement::Throw(stmt) => {
                let printed = print_expression(&stmt.value, self.options);
                self.line(&format!("throw {}", printed));
            }
            Statement::TryCatch(stmt) => {
                self.line("try {");
                self.indent += 1;
                self.print_statements(&stmt.body);
                self.indent -= 1;
                for clause in &stmt.catches {
                    self.line(&format!("}} catch ({}) {{", clause.param_name));
                    self.indent += 1;
                    self.print_statements(&clause.body);
                    self.indent -= 1;
                }
                if let Some(finally) = &stmt.finally {
                    self.line("} finally {");
                    self.indent += 1;
                    self.print_statements(finally);
                    self.indent -= 1;
                }
                self.line("}");
            }
            Statement::Incomplete(stmt) => self.line(&stmt.text),
        }
    }

    fn print_branch(&mut self, statement: &Statement) {
        match statement {
            Statement::Block(block) => self.print_statements(&block.statements),
            other => self.print_statement(other),
        }
    }

    // -- config -------------------------------------------------------------

    fn print_config_statements(&mut self, statements: &[ConfigStatement]) {
        for statement in statements {
            match statement {
                ConfigStatement::Assign(assign) => {
                    let value = print_expression(&assign.value, self.options);
                    self.line(&format!("{} = {}", assign.names.join("."), value));
                }
                ConfigStatement::Block(block) => {
                    self.line(&format!("{} {{", block.name()));
                    self.indent += 1;
                    self.print_config_statements(&block.statements);
                    self.indent -= 1;
                    self.line("}");
                }
                ConfigStatement::Include(include) => {
                    let source = print_expression(&include.source, self.options);
                    self.line(&format!("includeConfig {}", source));
                }
                ConfigStatement::Apply(apply) => {
                    self.line(&format!("{} {{", apply.name));
                    self.indent += 1;
                    self.print_statements(&apply.statements);
                    self.indent -= 1;
                    self.line("}");
                }
                ConfigStatement::Incomplete(stmt) => self.line(&stmt.text),
            }
        }
    }
}

fn print_type(ty: &TypeAnnotation) -> String {
    if ty.args.is_empty() {
        return ty.name.clone();
    }
    let args: Vec<String> = ty.args.iter().map(print_type).collect();
    format!("{}<{}>", ty.name, args.join(", "))
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn print_expression(expression: &Expression, options: FormatOptions) -> String {
    match expression {
        Expression::Binary(e) => {
            let left = print_expression(&e.left, options);
            let right = print_expression(&e.right, options);
            if e.op == "|" && options.mahesh_form {
                format!("{}\n    | {}", left, right)
            } else {
                format!("{} {} {}", left, e.op, right)
            }
        }
        Expression::Unary(e) => format!("{}{}", e.op, print_expression(&e.operand, options)),
        Expression::Property(e) => {
            let receiver = print_expression(&e.receiver, options);
            let dot = if e.safe {
                "?."
            } else if e.spread {
                "*."
            } else {
                "."
            };
            format!("{}{}{}", receiver, dot, e.name)
        }
        Expression::MethodCall(e) => print_call(e, options),
        Expression::Index(e) => format!(
            "{}[{}]",
            print_expression(&e.receiver, options),
            print_expression(&e.index, options)
        ),
        Expression::Variable(e) => e.name.clone(),
        Expression::Tuple(e) => {
            let elements: Vec<String> =
                e.elements.iter().map(|x| print_expression(x, options)).collect();
            format!("({})", elements.join(", "))
        }
        Expression::Range(e) => format!(
            "{}{}{}",
            print_expression(&e.from, options),
            if e.exclusive { "..<" } else { ".." },
            print_expression(&e.to, options)
        ),
        Expression::List(e) => {
            let elements: Vec<String> =
                e.elements.iter().map(|x| print_expression(x, options)).collect();
            format!("[{}]", elements.join(", "))
        }
        Expression::Map(e) => {
            if e.entries.is_empty() {
                return "[:]".to_string();
            }
            let entries: Vec<String> = e
                .entries
                .iter()
                .map(|entry| {
                    format!("{}: {}", entry.key, print_expression(&entry.value, options))
                })
                .collect();
            format!("[{}]", entries.join(", "))
        }
        Expression::Constant(e) => match &e.value {
            ConstantValue::Integer(value) => value.to_string(),
            ConstantValue::Float(value) => {
                if value.fract() == 0.0 {
                    format!("{:.1}", value)
                } else {
                    value.to_string()
                }
            }
            ConstantValue::Boolean(value) => value.to_string(),
            ConstantValue::Null => "null".to_string(),
        },
        Expression::Str(e) => match e.kind {
            StringTokenKind::SingleQuoted => quote(&e.value),
            StringTokenKind::DoubleQuoted => format!("\"{}\"", e.value),
            StringTokenKind::TripleSingleQuoted => format!("'''{}'''", e.value),
            StringTokenKind::TripleDoubleQuoted => format!("\"\"\"{}\"\"\"", e.value),
            StringTokenKind::Slashy => format!("/{}/", e.value),
        },
        Expression::Closure(e) => {
            let mut body = String::new();
            let mut nested = Formatter::new(options);
            nested.print_statements(&e.body);
            let inner = nested.out.trim_end().replace('\n', "; ");
            if e.params.is_empty() {
                body.push_str(&format!("{{ {} }}", inner));
            } else {
                let params: Vec<String> = e
                    .params
                    .iter()
                    .map(|p| match &p.ty {
                        Some(ty) => format!("{} {}", print_type(ty), p.name),
                        None => p.name.clone(),
                    })
                    .collect();
                body.push_str(&format!("{{ {} -> {} }}", params.join(", "), inner));
            }
            if e.body.is_empty() {
                "{ }".to_string()
            } else {
                body
            }
        }
        Expression::Cast(e) => format!(
            "{} as {}",
            print_expression(&e.expression, options),
            print_type(&e.ty)
        ),
        Expression::Ternary(e) => format!(
            "{} ? {} : {}",
            print_expression(&e.condition, options),
            print_expression(&e.true_expr, options),
            print_expression(&e.false_expr, options)
        ),
        Expression::Elvis(e) => format!(
            "{} ?: {}",
            print_expression(&e.value, options),
            print_expression(&e.fallback, options)
        ),
        Expression::Paren(e) => format!("({})", print_expression(&e.expression, options)),
        Expression::Empty(_) => String::new(),
    }
}

fn print_call(call: &MethodCallExpr, options: FormatOptions) -> String {
    let mut parts: Vec<String> = Vec::new();
    for named in &call.named_args {
        parts.push(format!(
            "{}: {}",
            named.name,
            print_expression(&named.value, options)
        ));
    }
    let mut trailing_closure = None;
    let mut args = call.args.as_slice();
    if call.command_form {
        if let Some(Expression::Closure(_)) = args.last() {
            trailing_closure = args.last();
            args = &args[..args.len() - 1];
        }
    }
    for arg in args {
        parts.push(print_expression(arg, options));
    }

    let prefix = match &call.receiver {
        Some(receiver) => {
            let dot = if call.safe { "?." } else { "." };
            format!("{}{}{}", print_expression(receiver, options), dot, call.name)
        }
        None => call.name.clone(),
    };

    let mut printed = if call.command_form && call.receiver.is_none() && trailing_closure.is_none()
    {
        if parts.is_empty() {
            prefix
        } else {
            format!("{} {}", prefix, parts.join(", "))
        }
    } else if call.command_form && parts.is_empty() {
        prefix
    } else {
        format!("{}({})", prefix, parts.join(", "))
    };

    if let Some(closure) = trailing_closure {
        printed.push(' ');
        printed.push_str(&print_expression(closure, options));
    }
    printed
}
