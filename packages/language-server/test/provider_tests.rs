//! Provider Tests
//!
//! Feature answers computed against an analyzed in-memory workspace.

#[cfg(test)]
mod tests {
    use nextflow_compiler::parse_util::{
        CompilePhase, ParseError, ParseLocation, ParseSourceSpan,
    };
    use nextflow_language_server::providers;
    use nextflow_language_server::state::AnalysisState;
    use tower_lsp::lsp_types::DiagnosticSeverity;

    const MAIN: &str = "file:///ws/main.nf";
    const CONFIG: &str = "file:///ws/nextflow.config";

    const MAIN_TEXT: &str = "process TICK {\n\
                             input:\n\
                             val x\n\
                             output:\n\
                             val y\n\
                             }\n\
                             workflow {\n\
                             TICK(1)\n\
                             }\n";

    fn workspace() -> AnalysisState {
        let mut state = AnalysisState::new();
        state.files.did_open(MAIN, MAIN_TEXT.to_string());
        state
            .files
            .did_open(CONFIG, "process {\ncpus = 4\n}\n".to_string());
        state.analyze();
        state
    }

    #[test]
    fn should_complete_namespace_members_after_a_dot() {
        let mut state = workspace();
        state.apply_change(MAIN, None, "workflow {\nChannel.\n}\n");
        state.analyze();
        let items = providers::completion::completion(&state, MAIN, 1, 8);
        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
        assert!(labels.contains(&"of"), "got {:?}", labels);
        assert!(labels.contains(&"fromPath"));
    }

    #[test]
    fn should_complete_definitions_and_globals_in_name_position() {
        let state = workspace();
        let items = providers::completion::completion(&state, MAIN, 7, 0);
        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
        assert!(labels.contains(&"TICK"), "got {:?}", labels);
        assert!(labels.contains(&"println"));
        assert!(labels.contains(&"workflow"));
    }

    #[test]
    fn should_complete_config_schema_paths() {
        let state = workspace();
        // Completing after `process.` offers the process options.
        let mut config_state = AnalysisState::new();
        config_state
            .files
            .did_open(CONFIG, "process.\n".to_string());
        config_state.analyze();
        let items = providers::completion::completion(&config_state, CONFIG, 0, 8);
        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
        assert!(labels.contains(&"cpus"), "got {:?}", labels);
        assert!(labels.contains(&"executor"));
        drop(state);
    }

    #[test]
    fn should_find_the_definition_of_a_process_call() {
        let state = workspace();
        // Position on `TICK` in the workflow body (line 7).
        let location = providers::definition::definition(&state, MAIN, 7, 1)
            .expect("definition location");
        assert_eq!(location.uri.as_str(), MAIN);
        assert_eq!(location.range.start.line, 0);
        assert_eq!(location.range.start.character, 8);
    }

    #[test]
    fn should_list_references_including_the_declaration() {
        let state = workspace();
        let references = providers::references::references(&state, MAIN, 7, 1);
        assert!(references.len() >= 2, "got {:?}", references);
    }

    #[test]
    fn should_hover_builtin_members_with_documentation() {
        let mut state = AnalysisState::new();
        state
            .files
            .did_open(MAIN, "workflow {\nprintln workDir\n}\n".to_string());
        state.analyze();
        let hover = providers::hover::hover(&state, MAIN, 1, 9).expect("hover");
        let tower_lsp::lsp_types::HoverContents::Markup(markup) = hover.contents else {
            panic!("expected markup hover");
        };
        assert!(markup.value.contains("workDir"), "got {}", markup.value);
    }

    #[test]
    fn should_provide_document_symbols_for_scripts_and_configs() {
        let state = workspace();
        let symbols = providers::symbols::document_symbols(&state, MAIN);
        assert!(symbols.iter().any(|s| s.name == "TICK"));

        let config_symbols = providers::symbols::document_symbols(&state, CONFIG);
        assert!(config_symbols.iter().any(|s| s.name == "process"));
    }

    #[test]
    fn should_search_workspace_symbols_case_insensitively() {
        let state = workspace();
        let symbols = providers::symbols::workspace_symbols(&state, "tick");
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "TICK");
        assert!(providers::symbols::workspace_symbols(&state, "nothing").is_empty());
    }

    #[test]
    fn should_link_resolved_includes() {
        let mut state = AnalysisState::new();
        state.files.did_open(
            MAIN,
            "include { TICK } from './lib'\n".to_string(),
        );
        state
            .files
            .did_open("file:///ws/lib.nf", "process TICK {\ncpus 1\n}\n".to_string());
        state.analyze();
        let links = providers::links::document_links(&state, MAIN);
        assert_eq!(links.len(), 1);
        assert_eq!(
            links[0].target.as_ref().unwrap().as_str(),
            "file:///ws/lib.nf"
        );
    }

    #[test]
    fn should_emit_sorted_semantic_tokens() {
        let state = workspace();
        let tokens = providers::semantic_tokens::semantic_tokens(&state, MAIN);
        assert!(!tokens.is_empty());
        // Delta encoding: the first token is absolute, the rest relative.
        assert!(tokens.iter().skip(1).all(|t| t.delta_line > 0 || t.delta_start > 0));
        // The contextual `process`/`workflow` words are keywords (legend
        // index 6).
        assert!(tokens.iter().any(|t| t.token_type == 6), "no keyword tokens");
    }

    #[test]
    fn should_tag_parameters_and_keywords() {
        let mut state = AnalysisState::new();
        state.files.did_open(
            MAIN,
            "def greet(String name) {\nreturn name\n}\n".to_string(),
        );
        state.analyze();
        let tokens = providers::semantic_tokens::semantic_tokens(&state, MAIN);
        // Legend indexes: 4 = parameter, 6 = keyword.
        assert!(
            tokens.iter().any(|t| t.token_type == 4),
            "no parameter tokens in {:?}",
            tokens
        );
        assert!(
            tokens.iter().any(|t| t.token_type == 6),
            "no keyword tokens in {:?}",
            tokens
        );
    }

    #[test]
    fn should_format_whole_documents() {
        let mut state = AnalysisState::new();
        state
            .files
            .did_open(MAIN, "def x=1\nprintln x\n".to_string());
        state.analyze();
        let edits = providers::formatting::format(&state, MAIN);
        assert_eq!(edits.len(), 1);
        assert!(edits[0].new_text.contains("def x = 1"));
    }

    #[test]
    fn should_map_future_warnings_by_the_suppression_flag() {
        let error = ParseError::future(
            ParseSourceSpan::new(ParseLocation::zero(), ParseLocation::new(1, 0, 1)),
            "'baseDir' is deprecated",
            CompilePhase::NameResolution,
        );
        let normal = providers::diagnostics::to_lsp_diagnostics(&[error.clone()], false);
        assert_eq!(normal[0].severity, Some(DiagnosticSeverity::WARNING));
        let suppressed = providers::diagnostics::to_lsp_diagnostics(&[error], true);
        assert_eq!(suppressed[0].severity, Some(DiagnosticSeverity::INFORMATION));
    }

    #[test]
    fn should_map_error_levels_to_lsp_severities() {
        let span = ParseSourceSpan::new(ParseLocation::zero(), ParseLocation::new(1, 0, 1));
        let errors = vec![
            ParseError::new(span, "bad", CompilePhase::Syntax),
            ParseError::warning(span, "meh", CompilePhase::NameResolution),
        ];
        let out = providers::diagnostics::to_lsp_diagnostics(&errors, false);
        assert_eq!(out[0].severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(out[1].severity, Some(DiagnosticSeverity::WARNING));
    }
}
