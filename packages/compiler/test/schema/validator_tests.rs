//! Config Schema Validator Tests

#[cfg(test)]
mod tests {
    use nextflow_compiler::compiler::Compiler;
    use nextflow_compiler::parse_util::{CompilePhase, ParseError, ParseErrorLevel};
    use nextflow_compiler::schema::plugins::PluginRegistry;
    use nextflow_compiler::schema::validator::{validate_config, ValidatorOptions};
    use nextflow_compiler::unit::{FileKind, SourceUnit};

    fn analyze_with(text: &str, registry: &PluginRegistry) -> SourceUnit {
        let mut unit = Compiler::new().compile(
            "file:///ws/nextflow.config",
            text,
            FileKind::Config,
        );
        assert!(unit.errors.is_empty(), "fixture must parse: {:?}", unit.errors.all());
        validate_config(&mut unit, registry, &ValidatorOptions::default());
        unit
    }

    fn analyze(text: &str) -> SourceUnit {
        analyze_with(text, &PluginRegistry::new())
    }

    fn diagnostics(unit: &SourceUnit) -> Vec<&ParseError> {
        unit.errors.iter().collect()
    }

    #[test]
    fn should_accept_known_options() {
        let unit = analyze("process.cpus = 4\nworkDir = '/tmp/work'\n");
        assert!(diagnostics(&unit).is_empty(), "got {:?}", diagnostics(&unit));
    }

    #[test]
    fn should_warn_once_on_unknown_options() {
        let unit = analyze("foo.bar = 1\n");
        let diagnostics = diagnostics(&unit);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].level, ParseErrorLevel::Warning);
        assert_eq!(diagnostics[0].phase, CompilePhase::NameResolution);
        assert!(diagnostics[0].msg.contains("'foo.bar'"));
    }

    #[test]
    fn should_resolve_paths_through_nested_blocks() {
        let unit = analyze("process {\ncpus = 4\nmemory = '2 GB'\n}\n");
        assert!(diagnostics(&unit).is_empty(), "got {:?}", diagnostics(&unit));
    }

    #[test]
    fn should_treat_profile_scopes_as_transparent() {
        let nested = analyze("profiles {\nstandard {\nprocess.cpus = 2\n}\n}\n");
        assert!(diagnostics(&nested).is_empty(), "got {:?}", diagnostics(&nested));

        let dotted = analyze("profiles.standard.process.cpus = 2\n");
        assert!(diagnostics(&dotted).is_empty(), "got {:?}", diagnostics(&dotted));
    }

    #[test]
    fn should_warn_on_unknown_options_inside_profiles_like_at_top_level() {
        let unit = analyze("profiles {\nstandard {\nfoo.bar = 1\n}\n}\n");
        let diagnostics = diagnostics(&unit);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].msg.contains("'foo.bar'"));
    }

    #[test]
    fn should_bypass_the_schema_for_params_and_env() {
        let unit = analyze("params.outdir = 'results'\nenv {\nTMPDIR = '/tmp'\n}\n");
        assert!(diagnostics(&unit).is_empty(), "got {:?}", diagnostics(&unit));
    }

    #[test]
    fn should_enforce_flat_env_names() {
        let unit = analyze("env.java.opts = '-Xmx1g'\n");
        let diagnostics = diagnostics(&unit);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].msg.contains("flat names"));
    }

    #[test]
    fn should_check_value_types_against_the_option() {
        let unit = analyze("process.cpus = 'many'\n");
        let diagnostics = diagnostics(&unit);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].level, ParseErrorLevel::Warning);
        assert_eq!(diagnostics[0].phase, CompilePhase::TypeChecking);
        assert!(diagnostics[0].msg.contains("Integer"));
    }

    #[test]
    fn should_accept_strings_for_duration_and_memory_options() {
        let unit = analyze("process.time = '2h'\nprocess.memory = '4 GB'\n");
        assert!(diagnostics(&unit).is_empty(), "got {:?}", diagnostics(&unit));
    }

    #[test]
    fn should_skip_type_checks_when_disabled() {
        let mut unit = Compiler::new().compile(
            "file:///ws/nextflow.config",
            "process.cpus = 'many'\n",
            FileKind::Config,
        );
        validate_config(
            &mut unit,
            &PluginRegistry::new(),
            &ValidatorOptions { type_checking: false },
        );
        assert!(unit.errors.is_empty(), "got {:?}", unit.errors.all());
    }

    #[test]
    fn should_reject_scope_assignments() {
        let unit = analyze("process = 4\n");
        let diagnostics = diagnostics(&unit);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].msg.contains("config scope"));
    }

    #[test]
    fn should_reject_includes_outside_the_top_level() {
        let unit = analyze("process {\nincludeConfig 'extra.config'\n}\n");
        let diagnostics = diagnostics(&unit);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].msg.contains("top level"));
        assert_eq!(diagnostics[0].level, ParseErrorLevel::Error);
    }

    #[test]
    fn should_allow_includes_at_the_top_level_and_in_profiles() {
        let unit = analyze(
            "includeConfig 'base.config'\nprofiles {\nstandard {\nincludeConfig 'std.config'\n}\n}\n",
        );
        assert!(diagnostics(&unit).is_empty(), "got {:?}", diagnostics(&unit));
    }

    #[test]
    fn should_resolve_placeholder_scopes_per_instance() {
        let unit = analyze("azure.batch.pools.mypool.vmCount = 8\n");
        assert!(diagnostics(&unit).is_empty(), "got {:?}", diagnostics(&unit));

        let unknown = analyze("azure.batch.pools.mypool.frobnicate = 8\n");
        assert_eq!(diagnostics(&unknown).len(), 1);
    }

    #[test]
    fn should_merge_plugin_scopes_for_the_plugins_block() {
        let mut registry = PluginRegistry::new();
        registry
            .register(
                "nf-hello",
                Some("0.5.0"),
                r#"[{"type": "ConfigScope", "spec": {"name": "hello", "description": "Greeting plugin.", "children": [
                    {"type": "ConfigOption", "spec": {"name": "greeting", "description": "Message to print.", "type": "String"}}
                ]}}]"#,
            )
            .unwrap();

        let with_plugin = analyze_with(
            "plugins {\nid 'nf-hello@0.5.0'\n}\nhello.greeting = 'hi'\n",
            &registry,
        );
        assert!(
            diagnostics(&with_plugin).is_empty(),
            "got {:?}",
            diagnostics(&with_plugin)
        );

        let without_plugin = analyze("hello.greeting = 'hi'\n");
        assert_eq!(diagnostics(&without_plugin).len(), 1);
    }

    #[test]
    fn should_validate_selector_blocks_against_the_ambient_scope() {
        let unit = analyze("process {\nwithLabel:big {\nmemory = '64 GB'\n}\n}\n");
        assert!(diagnostics(&unit).is_empty(), "got {:?}", diagnostics(&unit));
    }
}
