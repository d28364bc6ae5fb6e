//! Config Parser Tests

#[cfg(test)]
mod tests {
    use nextflow_compiler::config::ast::*;
    use nextflow_compiler::config::parser::{ConfigParseResult, ConfigParser};

    fn parse(text: &str) -> ConfigParseResult {
        ConfigParser::new().parse(text)
    }

    fn parse_ok(text: &str) -> ConfigModule {
        let result = parse(text);
        assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
        result.module
    }

    #[test]
    fn should_parse_an_empty_config() {
        let result = parse("");
        assert!(result.errors.is_empty());
        assert!(result.module.statements.is_empty());
    }

    #[test]
    fn should_parse_dotted_assignments() {
        let module = parse_ok("process.executor = 'slurm'\n");
        let ConfigStatement::Assign(assign) = &module.statements[0] else {
            panic!("expected assignment");
        };
        assert_eq!(assign.names, vec!["process".to_string(), "executor".to_string()]);
    }

    #[test]
    fn should_parse_named_blocks() {
        let module = parse_ok("process {\ncpus = 4\nmemory = '2 GB'\n}\n");
        let ConfigStatement::Block(block) = &module.statements[0] else {
            panic!("expected block");
        };
        assert_eq!(block.kind, ConfigBlockKind::Named("process".to_string()));
        assert_eq!(block.statements.len(), 2);
    }

    #[test]
    fn should_parse_selector_blocks() {
        let module = parse_ok("process {\nwithLabel:big_mem {\nmemory = '64 GB'\n}\n}\n");
        let ConfigStatement::Block(process) = &module.statements[0] else {
            panic!("expected block");
        };
        let ConfigStatement::Block(selector) = &process.statements[0] else {
            panic!("expected selector block");
        };
        assert_eq!(
            selector.kind,
            ConfigBlockKind::Selector {
                kind: "withLabel".to_string(),
                target: "big_mem".to_string()
            }
        );
    }

    #[test]
    fn should_parse_include_statements() {
        let module = parse_ok("includeConfig 'base.config'\n");
        assert!(matches!(module.statements[0], ConfigStatement::Include(_)));
    }

    #[test]
    fn should_parse_plugin_apply_blocks() {
        let module = parse_ok("plugins {\nid 'nf-amazon@2.4.0'\n}\n");
        let ConfigStatement::Apply(apply) = &module.statements[0] else {
            panic!("expected apply block");
        };
        assert_eq!(apply.name, "plugins");
        assert_eq!(apply.statements.len(), 1);
    }

    #[test]
    fn should_keep_incomplete_paths_for_completion() {
        let result = parse("process.\n");
        let ConfigStatement::Incomplete(incomplete) = &result.module.statements[0] else {
            panic!("expected incomplete statement");
        };
        assert_eq!(incomplete.text, "process.");
    }

    #[test]
    fn should_parse_nested_profile_blocks() {
        let module = parse_ok(
            "profiles {\nstandard {\nprocess.executor = 'local'\n}\ncluster {\nprocess.executor = 'slurm'\n}\n}\n",
        );
        let ConfigStatement::Block(profiles) = &module.statements[0] else {
            panic!("expected profiles block");
        };
        assert_eq!(profiles.statements.len(), 2);
    }

    #[test]
    fn should_recover_after_malformed_statements() {
        let result = parse("= broken\nprocess.cpus = 2\n");
        assert!(!result.errors.is_empty());
        assert!(result
            .module
            .statements
            .iter()
            .any(|s| matches!(s, ConfigStatement::Assign(_))));
    }
}
