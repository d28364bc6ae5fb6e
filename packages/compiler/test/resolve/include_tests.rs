//! Include Resolver Tests
//!
//! Cross-file binding and the incremental re-resolution contract: with
//! an empty changed set nothing moves; unrelated changes leave resolved
//! edges alone.

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use nextflow_compiler::compiler::Compiler;
    use nextflow_compiler::resolve::include_resolver::IncludeResolver;
    use nextflow_compiler::unit::{FileKind, SourceUnit};

    const A: &str = "file:///ws/a.nf";
    const B: &str = "file:///ws/b.nf";
    const C: &str = "file:///ws/c.nf";

    fn unit(uri: &str, text: &str) -> SourceUnit {
        Compiler::new().compile(uri, text, FileKind::Script)
    }

    fn workspace() -> HashMap<String, SourceUnit> {
        let mut units = HashMap::new();
        units.insert(
            A.to_string(),
            unit(A, "include { TICK } from './b'\nworkflow {\nTICK()\n}\n"),
        );
        units.insert(B.to_string(), unit(B, "process TICK {\ncpus 1\n}\n"));
        units
    }

    fn changed(uris: &[&str]) -> HashSet<String> {
        uris.iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn should_bind_include_entries_to_exported_definitions() {
        let mut units = workspace();
        let resolved = IncludeResolver::resolve(&mut units, &changed(&[A, B]));
        assert!(resolved.contains(A));

        let a = &units[A];
        assert_eq!(a.includes.len(), 1);
        let state = &a.includes[0];
        assert_eq!(state.resolved_uri.as_deref(), Some(B));
        assert_eq!(state.entries.len(), 1);
        let definition = state.entries[0].definition.as_ref().expect("bound definition");
        assert_eq!(definition.name, "TICK");
        assert_eq!(definition.uri, B);
        assert!(a.errors.is_empty(), "got {:?}", a.errors.all());
    }

    #[test]
    fn should_respect_aliases() {
        let mut units = workspace();
        units.insert(
            A.to_string(),
            unit(A, "include { TICK as TOCK } from './b'\nworkflow {\nTOCK()\n}\n"),
        );
        IncludeResolver::resolve(&mut units, &changed(&[A, B]));
        let a = &units[A];
        assert_eq!(a.includes[0].entries[0].local_name, "TOCK");
        assert!(a.include_table().contains_key("TOCK"));
    }

    #[test]
    fn should_do_no_work_for_an_empty_changed_set() {
        let mut units = workspace();
        IncludeResolver::resolve(&mut units, &changed(&[A, B]));
        let resolved = IncludeResolver::resolve(&mut units, &HashSet::new());
        assert!(resolved.is_empty());
    }

    #[test]
    fn should_skip_resolution_when_an_unrelated_file_changes() {
        let mut units = workspace();
        IncludeResolver::resolve(&mut units, &changed(&[A, B]));
        units.insert(C.to_string(), unit(C, "process OTHER {\ncpus 1\n}\n"));
        let resolved = IncludeResolver::resolve(&mut units, &changed(&[C]));
        assert!(!resolved.contains(A));
        assert!(units[A].errors.is_empty());
    }

    #[test]
    fn should_re_resolve_when_the_target_changes() {
        let mut units = workspace();
        IncludeResolver::resolve(&mut units, &changed(&[A, B]));
        units.insert(B.to_string(), unit(B, "process RENAMED {\ncpus 1\n}\n"));
        let resolved = IncludeResolver::resolve(&mut units, &changed(&[B]));
        assert!(resolved.contains(A));
        assert!(units[A]
            .errors
            .iter()
            .any(|e| e.msg.contains("'TICK' is not defined in module")));
    }

    #[test]
    fn should_report_unresolvable_sources() {
        let mut units = HashMap::new();
        units.insert(
            A.to_string(),
            unit(A, "include { TICK } from './nowhere'\n"),
        );
        IncludeResolver::resolve(&mut units, &changed(&[A]));
        assert!(units[A]
            .errors
            .iter()
            .any(|e| e.msg.contains("Unable to resolve include")));
    }

    #[test]
    fn should_report_missing_definitions_in_the_target() {
        let mut units = workspace();
        units.insert(
            A.to_string(),
            unit(A, "include { MISSING } from './b'\n"),
        );
        IncludeResolver::resolve(&mut units, &changed(&[A, B]));
        assert!(units[A]
            .errors
            .iter()
            .any(|e| e.msg.contains("'MISSING' is not defined in module './b'")));
    }

    #[test]
    fn should_report_duplicate_local_names() {
        let mut units = workspace();
        units.insert(
            A.to_string(),
            unit(A, "include { TICK; TICK } from './b'\n"),
        );
        IncludeResolver::resolve(&mut units, &changed(&[A, B]));
        let duplicates: Vec<_> = units[A]
            .errors
            .iter()
            .filter(|e| e.msg.contains("included more than once"))
            .collect();
        assert_eq!(duplicates.len(), 1);
        assert!(duplicates[0].related.is_some());
    }

    #[test]
    fn should_resolve_module_directories_through_main_nf() {
        let mut units = HashMap::new();
        units.insert(
            A.to_string(),
            unit(A, "include { ALIGN } from './align'\n"),
        );
        units.insert(
            "file:///ws/align/main.nf".to_string(),
            unit("file:///ws/align/main.nf", "process ALIGN {\ncpus 2\n}\n"),
        );
        IncludeResolver::resolve(&mut units, &changed(&[A, "file:///ws/align/main.nf"]));
        assert_eq!(
            units[A].includes[0].resolved_uri.as_deref(),
            Some("file:///ws/align/main.nf")
        );
    }
}
