//! Script Resolver Tests
//!
//! End-to-end name resolution over parsed scripts: shadowing, unused
//! variables, deprecated built-ins, closure rules, process scoping and
//! workflow checks.

#[cfg(test)]
mod tests {
    use nextflow_compiler::compiler::Compiler;
    use nextflow_compiler::parse_util::{CompilePhase, ParseError, ParseErrorLevel};
    use nextflow_compiler::resolve::script_resolver::resolve_script;
    use nextflow_compiler::unit::{FileKind, SourceUnit};

    fn analyze(text: &str) -> SourceUnit {
        let mut unit =
            Compiler::new().compile("file:///ws/main.nf", text, FileKind::Script);
        assert!(
            unit.errors.is_empty(),
            "fixture must be syntactically valid: {:?}",
            unit.errors.all()
        );
        resolve_script(&mut unit);
        unit
    }

    fn errors(unit: &SourceUnit) -> Vec<&ParseError> {
        unit.errors
            .iter()
            .filter(|e| e.level == ParseErrorLevel::Error)
            .collect()
    }

    fn warnings(unit: &SourceUnit) -> Vec<&ParseError> {
        unit.errors
            .iter()
            .filter(|e| e.level == ParseErrorLevel::Warning)
            .collect()
    }

    fn futures(unit: &SourceUnit) -> Vec<&ParseError> {
        unit.errors
            .iter()
            .filter(|e| e.level == ParseErrorLevel::Future)
            .collect()
    }

    #[test]
    fn should_allow_workflow_locals_to_shadow_module_locals() {
        let unit = analyze("def x = 1\nworkflow {\ndef x = 2\n}\n");
        assert!(errors(&unit).is_empty(), "got {:?}", errors(&unit));
        // Both declarations are distinct and both unused.
        let unused: Vec<&ParseError> = warnings(&unit)
            .into_iter()
            .filter(|w| w.msg.contains("declared but not used"))
            .collect();
        assert_eq!(unused.len(), 2);
        assert_ne!(unused[0].span, unused[1].span);
    }

    #[test]
    fn should_report_duplicate_declarations_with_a_back_reference() {
        let unit = analyze("workflow {\ndef a = 1\ndef a = 2\nprintln a\n}\n");
        let errors = errors(&unit);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].msg.contains("already declared"));
        assert!(errors[0].related.is_some());
    }

    #[test]
    fn should_report_unknown_names() {
        let unit = analyze("workflow {\nprintln undefined_thing\n}\n");
        let errors = errors(&unit);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].msg.contains("'undefined_thing' is not defined"));
    }

    #[test]
    fn should_report_unknown_names_once_per_scope() {
        let unit = analyze("workflow {\nprintln missing\nprintln missing\n}\n");
        assert_eq!(errors(&unit).len(), 1);
    }

    #[test]
    fn should_warn_on_deprecated_builtins_with_related_information() {
        let unit = analyze("def report() {\ndef d = baseDir\nreturn d\n}\n");
        let futures = futures(&unit);
        assert_eq!(futures.len(), 1);
        assert!(futures[0].msg.contains("baseDir"));
        assert!(futures[0].msg.contains("deprecated"));
        assert!(futures[0].related.is_some());
        assert_eq!(futures[0].phase, CompilePhase::NameResolution);
    }

    #[test]
    fn should_reject_builtin_reassignment() {
        let unit = analyze("workflow {\nparams = 1\n}\n");
        let errors = errors(&unit);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].msg.contains("cannot be reassigned"));
    }

    #[test]
    fn should_promote_implicit_assignments_in_workflow_bodies() {
        let unit = analyze("workflow {\ncounted = 1\nprintln counted\n}\n");
        assert!(errors(&unit).is_empty(), "got {:?}", errors(&unit));
    }

    #[test]
    fn should_reject_implicit_assignments_inside_closures() {
        let unit = analyze("workflow {\ndef c = { y = 2 }\nprintln c\n}\n");
        let errors = errors(&unit);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].msg.contains("closure"));
    }

    #[test]
    fn should_warn_on_external_mutation_inside_closures() {
        let unit = analyze(
            "workflow {\ndef total = 0\ndef c = { total = 5 }\nprintln total\nprintln c\n}\n",
        );
        let futures = futures(&unit);
        assert_eq!(futures.len(), 1);
        assert!(futures[0].msg.contains("race condition"));
    }

    #[test]
    fn should_warn_on_implicit_it() {
        let unit = analyze("workflow {\ndef c = { it }\nprintln c\n}\n");
        let warnings = warnings(&unit);
        assert!(warnings.iter().any(|w| w.msg.contains("Implicit closure parameter")));
    }

    #[test]
    fn should_exempt_underscore_prefixed_variables_from_unused_warnings() {
        let unit = analyze("workflow {\ndef _scratch = 1\n}\n");
        assert!(warnings(&unit).is_empty(), "got {:?}", warnings(&unit));
    }

    #[test]
    fn should_inject_process_inputs_into_the_process_scope() {
        let unit = analyze(
            "process P {\ninput:\nval sample\nscript:\n\"run ${sample}\"\n}\n",
        );
        assert!(errors(&unit).is_empty(), "got {:?}", errors(&unit));
        // The input was referenced by the script body, so no unused
        // warning either.
        assert!(warnings(&unit).is_empty(), "got {:?}", warnings(&unit));
    }

    #[test]
    fn should_warn_on_launch_paths_read_inside_process_bodies() {
        let unit = analyze("process P {\nscript:\n\"ls ${workDir}\"\n}\n");
        let warnings = warnings(&unit);
        assert!(warnings
            .iter()
            .any(|w| w.msg.contains("should not be read inside a process")));
    }

    #[test]
    fn should_warn_on_unknown_process_directives() {
        let unit = analyze("process P {\nfrobnicate 4\n}\n");
        let warnings = warnings(&unit);
        assert!(warnings.iter().any(|w| w.msg.contains("frobnicate")));
    }

    #[test]
    fn should_reject_unknown_input_qualifiers() {
        let unit = analyze("process P {\ninput:\nblob sample\n}\n");
        let errors = errors(&unit);
        assert!(errors.iter().any(|e| e.msg.contains("input qualifier")));
    }

    #[test]
    fn should_bind_set_operator_names_into_the_enclosing_scope() {
        let unit = analyze(
            "workflow {\nChannel.of(1).set { counts }\nprintln counts\n}\n",
        );
        assert!(errors(&unit).is_empty(), "got {:?}", errors(&unit));
    }

    #[test]
    fn should_reject_duplicate_emit_names() {
        let unit = analyze(
            "workflow W {\nmain:\ndef a = 1\ndef b = 2\nemit:\nout = a\nout = b\n}\n",
        );
        let errors = errors(&unit);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].msg.contains("more than once"));
    }

    #[test]
    fn should_warn_on_params_outside_the_entry_workflow() {
        let unit = analyze("def f() {\nreturn params\n}\n");
        let futures = futures(&unit);
        assert!(futures.iter().any(|f| f.msg.contains("entry workflow")));
    }

    #[test]
    fn should_reject_unknown_feature_flags() {
        let unit = analyze("nextflow.enable.bogus = true\n");
        let errors = errors(&unit);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].msg.contains("bogus"));
    }

    #[test]
    fn should_cross_check_publish_targets_against_the_output_block() {
        let unit = analyze(
            "workflow {\nmain:\ndef data = 1\npublish:\ndata >> 'results'\n}\noutput {\nsummaries {\n}\n}\n",
        );
        let warnings = warnings(&unit);
        assert!(warnings.iter().any(|w| w.msg.contains("'results'")));
        assert!(warnings.iter().any(|w| w.msg.contains("'summaries'")));
    }

    #[test]
    fn should_resolve_includes_through_the_module_scope() {
        let mut unit =
            Compiler::new().compile("file:///ws/main.nf", "include { FOO } from './mod'\nworkflow {\nFOO()\n}\n", FileKind::Script);
        resolve_script(&mut unit);
        // The include target is unresolved (no workspace here) but the
        // local name still resolves; only the unused warning may appear.
        assert!(errors(&unit).is_empty(), "got {:?}", errors(&unit));
    }
}
