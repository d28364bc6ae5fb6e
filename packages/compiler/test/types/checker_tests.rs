//! Type Checker Tests
//!
//! Inference over whole scripts: literals and operators, process-call
//! dataflow shapes, tuple-shaped channel operators, closure parameter
//! inference against functional targets, and the non-fatal error set.

#[cfg(test)]
mod tests {
    use nextflow_compiler::compiler::Compiler;
    use nextflow_compiler::parse_util::{ParseError, ParseErrorLevel};
    use nextflow_compiler::resolve::script_resolver::resolve_script;
    use nextflow_compiler::script::ast::*;
    use nextflow_compiler::types::checker::{check_script, ExternalSignatures};
    use nextflow_compiler::types::ty::{Type, TypeName};
    use nextflow_compiler::unit::{FileKind, SourceUnit};

    fn analyze(text: &str) -> SourceUnit {
        let mut unit =
            Compiler::new().compile("file:///ws/main.nf", text, FileKind::Script);
        resolve_script(&mut unit);
        check_script(&mut unit, &ExternalSignatures::default());
        unit
    }

    /// Type recorded for the variable declared as `def <name> = ...`,
    /// wherever it appears in the module.
    fn type_of_var(unit: &SourceUnit, name: &str) -> Type {
        let mut found = None;
        nextflow_compiler::node::walk(unit.root(), &mut |node| {
            if let nextflow_compiler::node::AnyNode::VarDeclName(decl) = node {
                if decl.name == name {
                    found = unit.metadata.variable_type(decl.id).cloned();
                }
            }
        });
        found.unwrap_or_else(|| panic!("no type recorded for '{}'", name))
    }

    fn type_errors(unit: &SourceUnit) -> Vec<&ParseError> {
        unit.errors
            .phase(nextflow_compiler::CompilePhase::TypeChecking)
            .filter(|e| e.level == ParseErrorLevel::Error)
            .collect()
    }

    fn assert_no_type_errors(unit: &SourceUnit) {
        assert!(
            type_errors(unit).is_empty(),
            "unexpected type errors: {:?}",
            type_errors(unit)
        );
    }

    #[test]
    fn should_infer_literal_types() {
        let unit = analyze("def a = 1\ndef b = 2.5\ndef c = 'x'\ndef d = true\n");
        assert_no_type_errors(&unit);
        assert!(type_of_var(&unit, "a").is(TypeName::Integer));
        assert!(type_of_var(&unit, "b").is(TypeName::Float));
        assert!(type_of_var(&unit, "c").is(TypeName::String));
        assert!(type_of_var(&unit, "d").is(TypeName::Boolean));
    }

    #[test]
    fn should_infer_collection_literals() {
        let unit = analyze("def l = [1, 2, 3]\ndef m = [mode: 'copy']\n");
        assert_no_type_errors(&unit);
        assert_eq!(type_of_var(&unit, "l").to_string(), "List<Integer>");
        assert_eq!(type_of_var(&unit, "m").to_string(), "Map<String, String>");
    }

    #[test]
    fn should_report_inconsistent_list_elements() {
        let unit = analyze("def l = [1, 'a']\n");
        assert_eq!(type_errors(&unit).len(), 1);
    }

    #[test]
    fn should_dispatch_arithmetic_through_ops_classes() {
        let unit = analyze("def a = 1 + 2\ndef b = 1 + 2.5\ndef c = 'id: ' + 7\n");
        assert_no_type_errors(&unit);
        assert!(type_of_var(&unit, "a").is(TypeName::Integer));
        assert!(type_of_var(&unit, "b").is(TypeName::Float));
        assert!(type_of_var(&unit, "c").is(TypeName::String));
    }

    #[test]
    fn should_keep_commutative_operators_invariant_under_swap() {
        let unit = analyze("def a = 1 + 2.5\ndef b = 2.5 + 1\n");
        assert_no_type_errors(&unit);
        assert_eq!(type_of_var(&unit, "a"), type_of_var(&unit, "b"));
    }

    #[test]
    fn should_degrade_comparisons_to_boolean() {
        let unit = analyze("def a = 1 < 2\ndef b = 'x' == 'y'\n");
        assert_no_type_errors(&unit);
        assert!(type_of_var(&unit, "a").is(TypeName::Boolean));
        assert!(type_of_var(&unit, "b").is(TypeName::Boolean));
    }

    #[test]
    fn should_report_incompatible_operators() {
        let unit = analyze("def x = true + 1\n");
        assert_eq!(type_errors(&unit).len(), 1);
        assert!(type_errors(&unit)[0].msg.contains("Operator '+'"));
    }

    #[test]
    fn should_resolve_tuple_indexing_with_literal_indexes() {
        let unit = analyze("def t = (1, 'a')\ndef first = t[0]\ndef second = t[1]\n");
        assert_no_type_errors(&unit);
        assert!(type_of_var(&unit, "first").is(TypeName::Integer));
        assert!(type_of_var(&unit, "second").is(TypeName::String));
    }

    #[test]
    fn should_report_tuple_indexes_out_of_range() {
        let unit = analyze("def t = (1, 'a')\ndef broken = t[5]\n");
        assert_eq!(type_errors(&unit).len(), 1);
        assert!(type_errors(&unit)[0].msg.contains("out of range"));
    }

    #[test]
    fn should_destructure_tuples_with_an_arity_check() {
        let unit = analyze("def t = (1, 'a')\ndef (x, y) = t\n");
        assert_no_type_errors(&unit);
        assert!(type_of_var(&unit, "x").is(TypeName::Integer));
        assert!(type_of_var(&unit, "y").is(TypeName::String));

        let unit = analyze("def t = (1, 'a')\ndef (x, y, z) = t\n");
        assert_eq!(type_errors(&unit).len(), 1);
    }

    #[test]
    fn should_infer_string_method_calls() {
        let unit = analyze("def s = 'abc'.toUpperCase()\ndef n = 'abc'.size()\n");
        assert_no_type_errors(&unit);
        assert!(type_of_var(&unit, "s").is(TypeName::String));
        assert!(type_of_var(&unit, "n").is(TypeName::Integer));
    }

    #[test]
    fn should_report_unknown_members() {
        let unit = analyze("def s = 'abc'.frobnicate()\n");
        assert_eq!(type_errors(&unit).len(), 1);
        assert!(type_errors(&unit)[0].msg.contains("frobnicate"));
    }

    #[test]
    fn should_instantiate_channel_factory_generics() {
        let unit = analyze("workflow {\ndef ch = Channel.of(1)\nprintln ch\n}\n");
        assert_no_type_errors(&unit);
        assert_eq!(type_of_var(&unit, "ch").to_string(), "Channel<Integer>");
    }

    #[test]
    fn should_infer_closure_parameters_from_the_functional_target() {
        let unit = analyze("workflow {\ndef doubled = [1, 2].collect { it * 2 }\nprintln doubled\n}\n");
        assert_no_type_errors(&unit);
        assert_eq!(type_of_var(&unit, "doubled").to_string(), "List<Integer>");
    }

    #[test]
    fn should_propagate_closure_returns_through_map() {
        let unit = analyze(
            "workflow {\ndef names = Channel.of(1).map { it.toString() }\nprintln names\n}\n",
        );
        assert_no_type_errors(&unit);
        assert_eq!(type_of_var(&unit, "names").to_string(), "Channel<String>");
    }

    #[test]
    fn should_return_value_wrappers_for_calls_without_channel_arguments() {
        let unit = analyze(
            "process P {\ninput:\nval x\noutput:\nval y\n}\nworkflow {\ndef r = P(1)\nprintln r\n}\n",
        );
        assert_no_type_errors(&unit);
        assert_eq!(type_of_var(&unit, "r").to_string(), "Value<?>");
    }

    #[test]
    fn should_return_channel_wrappers_for_calls_with_a_channel_argument() {
        let unit = analyze(
            "process P {\ninput:\nval x\noutput:\nval y\n}\nworkflow {\ndef r = P(Channel.of(1))\nprintln r\n}\n",
        );
        assert_no_type_errors(&unit);
        assert!(type_of_var(&unit, "r").is(TypeName::Channel));
    }

    #[test]
    fn should_warn_on_multiple_queue_channel_arguments() {
        let unit = analyze(
            "process P {\ninput:\nval a\nval b\noutput:\nval y\n}\n\
             workflow {\ndef r = P(Channel.of(1), Channel.of(2))\nprintln r\n}\n",
        );
        let futures: Vec<_> = unit
            .errors
            .iter()
            .filter(|e| e.level == ParseErrorLevel::Future)
            .collect();
        assert!(futures.iter().any(|f| f.msg.contains("not deterministic")));
        assert!(type_of_var(&unit, "r").is(TypeName::Channel));
    }

    #[test]
    fn should_build_records_for_multiple_named_outputs() {
        let unit = analyze(
            "process P {\ninput:\nval x\noutput:\nval a, emit: left\nval b, emit: right\n}\n\
             workflow {\ndef r = P(1)\nprintln r\n}\n",
        );
        assert_no_type_errors(&unit);
        let ty = type_of_var(&unit, "r").to_string();
        assert!(ty.contains("left: Value"), "got {}", ty);
        assert!(ty.contains("right: Value"), "got {}", ty);
    }

    #[test]
    fn should_report_process_arity_mismatches() {
        let unit = analyze(
            "process P {\ninput:\nval x\noutput:\nval y\n}\nworkflow {\nP(1, 2)\n}\n",
        );
        assert!(type_errors(&unit)
            .iter()
            .any(|e| e.msg.contains("expects 1 inputs")));
    }

    #[test]
    fn should_synthesize_combine_return_shapes() {
        let unit = analyze(
            "workflow {\ndef c = Channel.of(1).combine(Channel.of('a'))\nprintln c\n}\n",
        );
        assert_no_type_errors(&unit);
        assert_eq!(
            type_of_var(&unit, "c").to_string(),
            "Channel<(Integer, String)>"
        );
    }

    #[test]
    fn should_synthesize_group_tuple_return_shapes() {
        let unit = analyze(
            "workflow {\ndef g = Channel.of(1).combine(Channel.of('a')).groupTuple()\nprintln g\n}\n",
        );
        assert_no_type_errors(&unit);
        assert_eq!(
            type_of_var(&unit, "g").to_string(),
            "Channel<(Integer, Bag<String>)>"
        );
    }

    #[test]
    fn should_synthesize_join_return_shapes() {
        let unit = analyze(
            "workflow {\ndef j = Channel.of(1).combine(Channel.of('a'))\n\
             .join(Channel.of(2).combine(Channel.of(3.5)))\nprintln j\n}\n",
        );
        assert_no_type_errors(&unit);
        assert_eq!(
            type_of_var(&unit, "j").to_string(),
            "Channel<(Integer, String, Float)>"
        );
    }

    #[test]
    fn should_downgrade_tuple_ops_with_a_by_argument() {
        let unit = analyze(
            "workflow {\ndef g = Channel.of(1).combine(Channel.of('a')).groupTuple(by: 0)\nprintln g\n}\n",
        );
        assert_eq!(type_of_var(&unit, "g").to_string(), "Channel<?>");
    }

    #[test]
    fn should_destructure_tuples_across_closure_parameters() {
        let unit = analyze(
            "workflow {\ndef firsts = Channel.of(1).combine(Channel.of('a')).map { a, b -> a }\nprintln firsts\n}\n",
        );
        assert_no_type_errors(&unit);
        assert_eq!(type_of_var(&unit, "firsts").to_string(), "Channel<Integer>");
    }

    #[test]
    fn should_report_closure_arity_against_the_tuple_shape() {
        let unit = analyze(
            "workflow {\ndef broken = Channel.of(1).combine(Channel.of('a')).map { a, b, c -> a }\nprintln broken\n}\n",
        );
        assert!(type_errors(&unit)
            .iter()
            .any(|e| e.msg.contains("tuple has 2 components")));
    }

    #[test]
    fn should_check_declared_return_types() {
        let unit = analyze("Integer answer() {\nreturn 'nope'\n}\n");
        assert!(type_errors(&unit)
            .iter()
            .any(|e| e.msg.contains("declared to return Integer")));
    }

    #[test]
    fn should_treat_trailing_expressions_as_returns() {
        let unit = analyze("def answer() {\n42\n}\nworkflow {\ndef a = answer()\nprintln a\n}\n");
        assert_no_type_errors(&unit);
    }

    #[test]
    fn should_report_inconsistent_conditional_branches() {
        let unit = analyze("def q = true ? 1 : 'a'\n");
        assert_eq!(type_errors(&unit).len(), 1);
        assert!(type_errors(&unit)[0].msg.contains("incompatible types"));
    }

    #[test]
    fn should_check_named_arguments_against_known_sets() {
        let unit = analyze(
            "workflow {\ndef g = Channel.of(1).combine(Channel.of('a')).groupTuple(bogus: 1)\nprintln g\n}\n",
        );
        let warnings: Vec<_> = unit
            .errors
            .iter()
            .filter(|e| e.level == ParseErrorLevel::Warning)
            .filter(|e| e.msg.contains("bogus"))
            .collect();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn should_check_assignments_against_declared_types() {
        let unit = analyze("workflow {\nString s = 'ok'\ns = 42\nprintln s\n}\n");
        assert!(type_errors(&unit)
            .iter()
            .any(|e| e.msg.contains("variable of type String")));
    }

    #[test]
    fn should_run_idempotently() {
        let text = "workflow {\ndef ch = Channel.of(1).map { it * 2 }\nprintln ch\n}\n";
        let mut unit =
            Compiler::new().compile("file:///ws/main.nf", text, FileKind::Script);
        resolve_script(&mut unit);
        check_script(&mut unit, &ExternalSignatures::default());
        let first: Vec<ParseError> = unit.errors.all().to_vec();
        let first_ty = type_of_var(&unit, "ch");
        resolve_script(&mut unit);
        check_script(&mut unit, &ExternalSignatures::default());
        assert_eq!(unit.errors.all().to_vec(), first);
        assert_eq!(type_of_var(&unit, "ch"), first_ty);
    }

    #[test]
    fn should_keep_the_inferred_type_slot_in_sync() {
        let unit = analyze("def n = 1 + 2\n");
        // The most recently recorded INFERRED_TYPE for the initializer
        // matches the declaration's type.
        let module = unit.script().unwrap();
        let Declaration::Stmt(Statement::VarDecl(decl)) = &module.declarations[0] else {
            panic!("expected declaration");
        };
        let init = decl.initializer.as_ref().unwrap();
        assert_eq!(unit.metadata.get_type(init.id()), type_of_var(&unit, "n"));
    }
}
