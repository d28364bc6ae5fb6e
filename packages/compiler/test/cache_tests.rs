//! Cache Tests
//!
//! The incremental pipeline end to end: parse on change, include
//! widening, diagnostic diffing, idempotence, and covering-node lookups.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use nextflow_compiler::cache::{AnalysisOptions, AstNodeCache, FileCache};
    use nextflow_compiler::schema::plugins::PluginRegistry;
    use nextflow_compiler::unit::FileKind;

    const A: &str = "file:///ws/a.nf";
    const B: &str = "file:///ws/b.nf";
    const C: &str = "file:///ws/c.nf";

    struct Harness {
        files: FileCache,
        cache: AstNodeCache,
        registry: PluginRegistry,
        options: AnalysisOptions,
    }

    impl Harness {
        fn new() -> Self {
            Harness {
                files: FileCache::new(),
                cache: AstNodeCache::new(FileKind::Script),
                registry: PluginRegistry::new(),
                options: AnalysisOptions::default(),
            }
        }

        fn update(&mut self) -> HashSet<String> {
            let changed = self.files.take_changed();
            self.cache
                .update(&changed, &self.files, &self.registry, &self.options)
        }
    }

    fn clean_workspace() -> Harness {
        let mut harness = Harness::new();
        harness.files.did_open(
            A,
            "include { TICK } from './b'\nworkflow {\nTICK(1)\n}\n".to_string(),
        );
        harness.files.did_open(
            B,
            "process TICK {\ninput:\nval x\noutput:\nval y\n}\n".to_string(),
        );
        harness
    }

    #[test]
    fn should_analyze_changed_files_and_publish_nothing_when_clean() {
        let mut harness = clean_workspace();
        let republish = harness.update();
        assert!(republish.is_empty(), "got {:?}", republish);
        assert!(harness.cache.diagnostics(A).is_empty());
        assert!(harness.cache.diagnostics(B).is_empty());
        assert!(harness.cache.unit(A).is_some());
    }

    #[test]
    fn should_be_idempotent_for_identical_contents() {
        let mut harness = clean_workspace();
        harness.update();
        let first: Vec<_> = harness.cache.diagnostics(A).to_vec();

        harness.files.did_change(
            A,
            "include { TICK } from './b'\nworkflow {\nTICK(1)\n}\n".to_string(),
        );
        let republish = harness.update();
        assert!(republish.is_empty(), "got {:?}", republish);
        assert_eq!(harness.cache.diagnostics(A).to_vec(), first);
    }

    #[test]
    fn should_republish_when_diagnostics_appear_and_when_they_clear() {
        let mut harness = clean_workspace();
        harness.update();

        harness
            .files
            .did_change(A, "include { MISSING } from './b'\n".to_string());
        let republish = harness.update();
        assert!(republish.contains(A));
        assert!(!harness.cache.diagnostics(A).is_empty());

        harness.files.did_change(
            A,
            "include { TICK } from './b'\nworkflow {\nTICK(1)\n}\n".to_string(),
        );
        let republish = harness.update();
        assert!(republish.contains(A));
        assert!(harness.cache.diagnostics(A).is_empty());
    }

    #[test]
    fn should_not_touch_includes_when_an_unrelated_file_changes() {
        let mut harness = clean_workspace();
        harness.update();

        harness
            .files
            .did_open(C, "process OTHER {\ncpus 1\n}\n".to_string());
        let republish = harness.update();
        // Neither A nor B re-analyzed; C is clean.
        assert!(republish.is_empty(), "got {:?}", republish);
        assert!(harness.cache.diagnostics(A).is_empty());
    }

    #[test]
    fn should_widen_the_changed_set_to_dependents_of_an_edited_target() {
        let mut harness = clean_workspace();
        harness.update();

        // Renaming the process breaks A's include binding.
        harness
            .files
            .did_change(B, "process RENAMED {\ncpus 1\n}\n".to_string());
        let republish = harness.update();
        assert!(republish.contains(A), "got {:?}", republish);
        assert!(harness
            .cache
            .diagnostics(A)
            .iter()
            .any(|e| e.msg.contains("TICK")));
    }

    #[test]
    fn should_drop_units_for_removed_files() {
        let mut harness = clean_workspace();
        harness.update();

        harness.files.remove(B);
        let republish = harness.update();
        assert!(harness.cache.unit(B).is_none());
        // A now fails to resolve its include.
        assert!(republish.contains(A));
        assert!(!harness.cache.diagnostics(A).is_empty());
    }

    #[test]
    fn should_answer_covering_node_stacks_innermost_first() {
        let mut harness = Harness::new();
        harness
            .files
            .did_open(A, "workflow {\ndef x = 1\nprintln x\n}\n".to_string());
        harness.update();

        // Position on the `x` of `println x`.
        let stack = harness.cache.nodes_at(A, 2, 8);
        assert!(!stack.is_empty());
        let unit = harness.cache.unit(A).unwrap();
        // The innermost node resolves to the declaration.
        let target = unit.metadata.target(stack[0]);
        assert!(target.is_some(), "innermost node should carry a target");
    }

    #[test]
    fn should_find_references_across_units() {
        let mut harness = clean_workspace();
        harness.update();

        let unit = harness.cache.unit(A).unwrap();
        // Find the call node for TICK inside the workflow body.
        let stack = harness.cache.nodes_at(A, 2, 1);
        let target = stack
            .iter()
            .find_map(|node| unit.metadata.target(*node))
            .expect("call target");
        let references = harness.cache.references(target);
        assert!(
            references.len() >= 2,
            "expected call site and declaration, got {:?}",
            references
        );
    }

    #[test]
    fn should_skip_type_checking_when_disabled() {
        let mut harness = Harness::new();
        harness.options = AnalysisOptions { type_checking: false };
        harness
            .files
            .did_open(A, "workflow {\ndef x = 'a' + true + [1] * 'x'\nprintln x\n}\n".to_string());
        harness.update();
        assert!(harness
            .cache
            .diagnostics(A)
            .iter()
            .all(|e| e.phase != nextflow_compiler::CompilePhase::TypeChecking));
    }
}
