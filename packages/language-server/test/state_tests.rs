//! Analysis State Tests

#[cfg(test)]
mod tests {
    use nextflow_compiler::parse_util::{CompilePhase, ParseErrorLevel};
    use nextflow_compiler::SourceFile;
    use nextflow_language_server::state::AnalysisState;

    const SCRIPT: &str = "file:///ws/main.nf";
    const CONFIG: &str = "file:///ws/nextflow.config";

    #[test]
    fn should_publish_diagnostics_for_changed_files() {
        let mut state = AnalysisState::new();
        state.files.did_open(CONFIG, "foo.bar = 1\n".to_string());
        let publishes = state.analyze();
        assert_eq!(publishes.len(), 1);
        let (uri, errors) = &publishes[0];
        assert_eq!(uri, CONFIG);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].level, ParseErrorLevel::Warning);
        assert_eq!(errors[0].phase, CompilePhase::NameResolution);
        assert!(errors[0].msg.contains("'foo.bar'"));
    }

    #[test]
    fn should_publish_nothing_when_nothing_changed() {
        let mut state = AnalysisState::new();
        state.files.did_open(SCRIPT, "workflow {\nprintln 'hi'\n}\n".to_string());
        state.analyze();
        assert!(state.analyze().is_empty());
    }

    #[test]
    fn should_apply_incremental_content_changes() {
        let mut state = AnalysisState::new();
        state.files.did_open(SCRIPT, "abc\ndef\n".to_string());
        state.apply_change(SCRIPT, Some((0, 1, 0, 2)), "X");
        assert_eq!(state.files.contents(SCRIPT).unwrap(), "aXc\ndef\n");

        state.apply_change(SCRIPT, Some((1, 0, 1, 3)), "ghi");
        assert_eq!(state.files.contents(SCRIPT).unwrap(), "aXc\nghi\n");
    }

    #[test]
    fn should_replace_the_document_without_a_range() {
        let mut state = AnalysisState::new();
        state.files.did_open(SCRIPT, "old".to_string());
        state.apply_change(SCRIPT, None, "new contents");
        assert_eq!(state.files.contents(SCRIPT).unwrap(), "new contents");
    }

    #[test]
    fn should_bump_the_edit_generation_on_changes() {
        let mut state = AnalysisState::new();
        state.files.did_open(SCRIPT, "a".to_string());
        let before = state.edit_generation;
        state.apply_change(SCRIPT, None, "b");
        assert!(state.edit_generation > before);
    }

    #[test]
    fn should_round_trip_positions_and_offsets() {
        let file = SourceFile::new("one\ntwo\nthree\n".to_string(), SCRIPT.to_string());
        for (line, col) in [(0, 0), (0, 3), (1, 1), (2, 4)] {
            let offset = file.offset_at(line, col);
            assert_eq!(file.position_at(offset), Some((line, col)));
        }
        // Offsets past the end of the file have no position.
        assert_eq!(file.position_at(1000), None);
    }

    #[test]
    fn should_respect_the_type_checking_setting() {
        let mut state = AnalysisState::new();
        state.settings.type_checking = false;
        state
            .files
            .did_open(SCRIPT, "workflow {\ndef x = true + 1\nprintln x\n}\n".to_string());
        let publishes = state.analyze();
        assert!(
            publishes.is_empty(),
            "type errors must be off, got {:?}",
            publishes
        );
    }
}
