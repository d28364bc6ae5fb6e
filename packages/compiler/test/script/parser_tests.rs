//! Parser Tests
//!
//! Structural checks over the script parser: module declarations,
//! process and workflow sections, expression precedence, error recovery
//! and determinism.

#[cfg(test)]
mod tests {
    use nextflow_compiler::script::ast::*;
    use nextflow_compiler::script::parser::Parser;

    fn parse(text: &str) -> nextflow_compiler::script::parser::ParseResult {
        Parser::new().parse(text)
    }

    fn parse_ok(text: &str) -> ScriptModule {
        let result = parse(text);
        assert!(
            result.errors.is_empty(),
            "unexpected syntax errors: {:?}",
            result.errors
        );
        result.module
    }

    fn first_expression(module: &ScriptModule) -> &Expression {
        for declaration in &module.declarations {
            if let Declaration::Stmt(Statement::Expr(stmt)) = declaration {
                return &stmt.expression;
            }
            if let Declaration::Stmt(Statement::VarDecl(decl)) = declaration {
                if let Some(init) = &decl.initializer {
                    return init;
                }
            }
        }
        panic!("no expression statement in module");
    }

    #[test]
    fn should_parse_an_empty_file_to_an_empty_module() {
        let result = parse("");
        assert!(result.errors.is_empty());
        assert!(result.module.declarations.is_empty());
    }

    #[test]
    fn should_parse_twice_to_identical_trees_and_diagnostics() {
        let text = "def x = 1\nworkflow { println x }\nprocess P { cpus 4 }\n";
        let first = parse(text);
        let second = parse(text);
        assert_eq!(
            serde_json::to_string(&first.module).unwrap(),
            serde_json::to_string(&second.module).unwrap()
        );
        assert_eq!(first.errors, second.errors);
    }

    #[test]
    fn should_parse_an_include_with_aliases() {
        let module = parse_ok("include { FOO; BAR as BAZ } from './modules/common'\n");
        let Declaration::Include(include) = &module.declarations[0] else {
            panic!("expected include declaration");
        };
        assert_eq!(include.source, "./modules/common");
        assert_eq!(include.entries.len(), 2);
        assert_eq!(include.entries[0].name, "FOO");
        assert_eq!(include.entries[0].local_name(), "FOO");
        assert_eq!(include.entries[1].name, "BAR");
        assert_eq!(include.entries[1].local_name(), "BAZ");
    }

    #[test]
    fn should_parse_a_feature_flag_declaration() {
        let module = parse_ok("nextflow.enable.strict = true\n");
        let Declaration::FeatureFlag(flag) = &module.declarations[0] else {
            panic!("expected feature flag declaration");
        };
        assert_eq!(flag.name, "nextflow.enable.strict");
    }

    #[test]
    fn should_parse_process_sections() {
        let module = parse_ok(
            "process ALIGN {\n\
             cpus 4\n\
             memory '2 GB'\n\
             input:\n\
             val sample\n\
             path reads\n\
             output:\n\
             path 'aligned.bam'\n\
             when:\n\
             sample != null\n\
             script:\n\
             \"align ${sample}\"\n\
             }\n",
        );
        let Declaration::Process(process) = &module.declarations[0] else {
            panic!("expected process declaration");
        };
        assert_eq!(process.name, "ALIGN");
        assert_eq!(process.directives.len(), 2);
        assert_eq!(process.inputs.len(), 2);
        assert_eq!(process.outputs.len(), 1);
        assert!(process.when.is_some());
        let body = process.body.as_ref().expect("script body");
        assert_eq!(body.kind, ProcessBodyKind::Script);
        assert_eq!(body.statements.len(), 1);
    }

    #[test]
    fn should_parse_directives_as_command_calls() {
        let module = parse_ok("process P {\npublishDir 'results', mode: 'copy'\n}\n");
        let Declaration::Process(process) = &module.declarations[0] else {
            panic!("expected process");
        };
        let Statement::Expr(stmt) = &process.directives[0] else {
            panic!("expected directive statement");
        };
        let Expression::MethodCall(call) = &stmt.expression else {
            panic!("expected a call, got {:?}", stmt.expression);
        };
        assert_eq!(call.name, "publishDir");
        assert!(call.command_form);
        assert_eq!(call.args.len(), 1);
        assert_eq!(call.named_args.len(), 1);
        assert_eq!(call.named_args[0].name, "mode");
    }

    #[test]
    fn should_parse_workflow_sections() {
        let module = parse_ok(
            "workflow FLOW {\n\
             take:\n\
             samples\n\
             main:\n\
             def counted = samples\n\
             emit:\n\
             counted\n\
             }\n",
        );
        let Declaration::Workflow(workflow) = &module.declarations[0] else {
            panic!("expected workflow");
        };
        assert_eq!(workflow.name.as_deref(), Some("FLOW"));
        assert_eq!(workflow.takes.len(), 1);
        assert_eq!(workflow.takes[0].name, "samples");
        assert_eq!(workflow.main.len(), 1);
        assert_eq!(workflow.emits.len(), 1);
        assert_eq!(workflow.emits[0].name.as_deref(), Some("counted"));
    }

    #[test]
    fn should_parse_an_entry_workflow() {
        let module = parse_ok("workflow {\nprintln 'hi'\n}\n");
        let Declaration::Workflow(workflow) = &module.declarations[0] else {
            panic!("expected workflow");
        };
        assert!(workflow.is_entry());
    }

    #[test]
    fn should_parse_function_definitions() {
        let module = parse_ok("def greet(String name) {\nreturn name\n}\n");
        let Declaration::Function(function) = &module.declarations[0] else {
            panic!("expected function");
        };
        assert_eq!(function.name, "greet");
        assert_eq!(function.params.len(), 1);
        assert_eq!(function.params[0].name, "name");
        assert!(function.params[0].ty.is_some());
    }

    #[test]
    fn should_respect_arithmetic_precedence() {
        let module = parse_ok("def x = 1 + 2 * 3\n");
        let Expression::Binary(add) = first_expression(&module) else {
            panic!("expected binary expression");
        };
        assert_eq!(add.op, "+");
        let Expression::Binary(mul) = add.right.as_ref() else {
            panic!("expected nested multiplication");
        };
        assert_eq!(mul.op, "*");
    }

    #[test]
    fn should_parse_ternary_and_elvis() {
        let module = parse_ok("def x = a ? b : c\n");
        assert!(matches!(first_expression(&module), Expression::Ternary(_)));
        let module = parse_ok("def y = a ?: b\n");
        assert!(matches!(first_expression(&module), Expression::Elvis(_)));
    }

    #[test]
    fn should_parse_closures_with_explicit_parameters() {
        let module = parse_ok("def f = { a, b -> a }\n");
        let Expression::Closure(closure) = first_expression(&module) else {
            panic!("expected closure");
        };
        assert!(!closure.implicit_params);
        assert_eq!(closure.params.len(), 2);
    }

    #[test]
    fn should_parse_closures_with_implicit_it() {
        let module = parse_ok("def f = { it * 2 }\n");
        let Expression::Closure(closure) = first_expression(&module) else {
            panic!("expected closure");
        };
        assert!(closure.implicit_params);
        assert!(closure.params.is_empty());
    }

    #[test]
    fn should_parse_pipe_chains() {
        let module = parse_ok("workflow {\nch | view\n}\n");
        let Declaration::Workflow(workflow) = &module.declarations[0] else {
            panic!("expected workflow");
        };
        let Statement::Expr(stmt) = &workflow.main[0] else {
            panic!("expected expression statement");
        };
        let Expression::Binary(pipe) = &stmt.expression else {
            panic!("expected pipe, got {:?}", stmt.expression);
        };
        assert_eq!(pipe.op, "|");
    }

    #[test]
    fn should_parse_method_calls_with_trailing_closures() {
        let module = parse_ok("def x = Channel.of(1).map { it }\n");
        let Expression::MethodCall(map) = first_expression(&module) else {
            panic!("expected call");
        };
        assert_eq!(map.name, "map");
        assert!(matches!(map.args[0], Expression::Closure(_)));
        let Expression::MethodCall(of) = map.receiver.as_ref().unwrap().as_ref() else {
            panic!("expected inner call");
        };
        assert_eq!(of.name, "of");
    }

    #[test]
    fn should_parse_list_and_map_literals() {
        let module = parse_ok("def a = [1, 2, 3]\n");
        assert!(matches!(first_expression(&module), Expression::List(_)));
        let module = parse_ok("def b = [mode: 'copy', enabled: true]\n");
        let Expression::Map(map) = first_expression(&module) else {
            panic!("expected map literal");
        };
        assert_eq!(map.entries.len(), 2);
        let module = parse_ok("def c = [:]\n");
        assert!(matches!(first_expression(&module), Expression::Map(_)));
    }

    #[test]
    fn should_parse_tuple_destructuring_declarations() {
        let module = parse_ok("def (a, b) = pair\n");
        let Declaration::Stmt(Statement::VarDecl(decl)) = &module.declarations[0] else {
            panic!("expected declaration");
        };
        assert_eq!(decl.names.len(), 2);
    }

    #[test]
    fn should_parse_string_interpolation_into_embedded_expressions() {
        let module = parse_ok("def msg = \"got ${1 + 2} items\"\n");
        let Expression::Str(string) = first_expression(&module) else {
            panic!("expected string");
        };
        assert_eq!(string.parts.len(), 1);
        assert!(matches!(string.parts[0], Expression::Binary(_)));
    }

    #[test]
    fn should_keep_incomplete_trailing_paths_for_completion() {
        let result = parse("foo.\n");
        let Declaration::Stmt(Statement::Incomplete(incomplete)) =
            &result.module.declarations[0]
        else {
            panic!("expected incomplete statement");
        };
        assert_eq!(incomplete.text, "foo.");
    }

    #[test]
    fn should_recover_from_errors_and_keep_later_declarations() {
        let result = parse("process P {\n@@@\n}\nworkflow { println 'ok' }\n");
        assert!(!result.errors.is_empty());
        assert!(result
            .module
            .declarations
            .iter()
            .any(|d| matches!(d, Declaration::Workflow(_))));
    }

    #[test]
    fn should_report_positions_on_syntax_errors() {
        let result = parse("def x = \n");
        assert!(!result.errors.is_empty());
        assert_eq!(result.errors[0].phase, nextflow_compiler::CompilePhase::Syntax);
    }
}
