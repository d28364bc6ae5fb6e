//! Scope Tests
//!
//! Frame-level semantics of the scope stack: declaration conflicts,
//! parent-ward resolution with promotion, the unreferenced registry and
//! shadowing across routine boundaries.

#[cfg(test)]
mod tests {
    use nextflow_compiler::parse_util::ParseSourceSpan;
    use nextflow_compiler::resolve::scope::{
        Resolution, ScopeKind, ScopeStack, Variable,
    };
    use nextflow_compiler::script::ast::NodeId;
    use nextflow_compiler::types::dsl;

    fn var(name: &str, id: u32) -> Variable {
        Variable::local(name, NodeId(id), ParseSourceSpan::empty())
    }

    fn stack() -> ScopeStack {
        ScopeStack::new(vec![dsl::global_scope()])
    }

    #[test]
    fn should_declare_and_resolve_in_the_same_frame() {
        let mut scopes = stack();
        scopes.declare(var("x", 1)).unwrap();
        let Some(Resolution::Variable(found)) = scopes.resolve("x") else {
            panic!("expected variable resolution");
        };
        assert_eq!(found.name, "x");
        assert_eq!(found.decl, Some(NodeId(1)));
    }

    #[test]
    fn should_reject_a_duplicate_declaration_in_the_same_routine() {
        let mut scopes = stack();
        scopes.declare(var("x", 1)).unwrap();
        scopes.push(ScopeKind::Block, Vec::new());
        let existing = scopes.declare(var("x", 2)).unwrap_err();
        assert_eq!(existing.decl, Some(NodeId(1)));
    }

    #[test]
    fn should_allow_shadowing_across_a_routine_boundary() {
        let mut scopes = stack();
        scopes.declare(var("x", 1)).unwrap();
        scopes.push(ScopeKind::Workflow { entry: true }, Vec::new());
        assert!(scopes.declare(var("x", 2)).is_ok());
    }

    #[test]
    fn should_resolve_outward_through_parent_frames() {
        let mut scopes = stack();
        scopes.declare(var("outer", 1)).unwrap();
        scopes.push(ScopeKind::Workflow { entry: true }, Vec::new());
        scopes.push(ScopeKind::Block, Vec::new());
        let Some(Resolution::Variable(found)) = scopes.resolve("outer") else {
            panic!("expected variable resolution");
        };
        assert_eq!(found.decl, Some(NodeId(1)));
    }

    #[test]
    fn should_resolve_dsl_members_from_class_scopes() {
        let mut scopes = stack();
        let Some(Resolution::Member { member, .. }) = scopes.resolve("println") else {
            panic!("expected member resolution");
        };
        assert_eq!(member.name, "println");
    }

    #[test]
    fn should_drain_the_unreferenced_registry_on_first_resolve() {
        let mut scopes = stack();
        scopes.declare(var("x", 1)).unwrap();
        scopes.declare(var("y", 2)).unwrap();
        assert_eq!(scopes.current().unused().len(), 2);
        scopes.resolve("x");
        let unused: Vec<&str> = scopes
            .current()
            .unused()
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(unused, vec!["y"]);
    }

    #[test]
    fn declared_iter_retains_referenced_variable() {
        // Resolving a name removes it from the unreferenced registry but
        // never from the frame's declared list.
        let mut scopes = stack();
        scopes.declare(var("x", 1)).unwrap();
        scopes.resolve("x");
        assert_eq!(scopes.current().declared.len(), 1);
        assert_eq!(scopes.current().declared[0].name, "x");
        assert!(scopes.current().unused().is_empty());
    }

    #[test]
    fn should_exempt_underscore_names_from_unused_tracking() {
        let mut scopes = stack();
        scopes.declare(var("_scratch", 1)).unwrap();
        assert!(scopes.current().unused().is_empty());
    }

    #[test]
    fn should_promote_into_intermediate_frames() {
        let mut scopes = stack();
        scopes.declare(var("shared", 1)).unwrap();
        scopes.push(ScopeKind::Workflow { entry: true }, Vec::new());
        scopes.push(ScopeKind::Block, Vec::new());
        scopes.resolve("shared");
        // A second resolve from a sibling depth finds the promoted entry
        // without walking back to the module frame; observable through
        // lookup on the intermediate frame after popping the block.
        scopes.pop();
        let Some(Resolution::Variable(found)) = scopes.lookup("shared") else {
            panic!("expected promoted variable");
        };
        assert_eq!(found.decl, Some(NodeId(1)));
    }

    #[test]
    fn should_mark_variables_captured_through_closures() {
        let mut scopes = stack();
        scopes.push(ScopeKind::Workflow { entry: true }, Vec::new());
        scopes.declare(var("captured", 1)).unwrap();
        scopes.push(ScopeKind::Closure, Vec::new());
        let Some(Resolution::Variable(found)) = scopes.resolve("captured") else {
            panic!("expected variable resolution");
        };
        assert!(found.closure_shared);
    }
}
