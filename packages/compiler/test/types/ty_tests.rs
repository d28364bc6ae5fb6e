//! Type Model Tests

#[cfg(test)]
mod tests {
    use nextflow_compiler::types::ty::*;

    fn t(name: TypeName) -> Type {
        Type::named(name)
    }

    #[test]
    fn should_normalize_host_spellings_onto_canonicals() {
        assert_eq!(normalize_name("int"), Some(TypeName::Integer));
        assert_eq!(normalize_name("java.lang.String"), Some(TypeName::String));
        assert_eq!(normalize_name("GString"), Some(TypeName::String));
        assert_eq!(normalize_name("double"), Some(TypeName::Float));
        assert_eq!(normalize_name("File"), Some(TypeName::Path));
        assert_eq!(normalize_name("DataflowWriteChannel"), Some(TypeName::Channel));
        assert_eq!(normalize_name("Frobnicator"), None);
    }

    #[test]
    fn should_accept_identity_assignments() {
        assert!(assignable(&t(TypeName::Integer), &t(TypeName::Integer)));
        assert!(assignable(
            &Type::of(TypeName::List, vec![t(TypeName::String)]),
            &Type::of(TypeName::List, vec![t(TypeName::String)])
        ));
    }

    #[test]
    fn should_treat_dynamic_as_assignable_in_both_directions() {
        assert!(assignable(&Type::Dynamic, &t(TypeName::String)));
        assert!(assignable(&t(TypeName::String), &Type::Dynamic));
    }

    #[test]
    fn should_widen_integer_to_float_only() {
        assert!(assignable(&t(TypeName::Float), &t(TypeName::Integer)));
        assert!(!assignable(&t(TypeName::Integer), &t(TypeName::Float)));
    }

    #[test]
    fn should_accept_collections_where_iterable_is_expected() {
        assert!(assignable(&t(TypeName::Iterable), &t(TypeName::List)));
        assert!(assignable(&t(TypeName::Iterable), &t(TypeName::Set)));
        assert!(!assignable(&t(TypeName::List), &t(TypeName::Iterable)));
    }

    #[test]
    fn should_accept_strings_for_paths_durations_and_memory() {
        assert!(assignable(&t(TypeName::Path), &t(TypeName::String)));
        assert!(assignable(&t(TypeName::Duration), &t(TypeName::String)));
        assert!(assignable(&t(TypeName::MemoryUnit), &t(TypeName::String)));
        assert!(!assignable(&t(TypeName::String), &t(TypeName::Duration)));
    }

    #[test]
    fn should_check_generics_parameter_by_parameter() {
        let list_int = Type::of(TypeName::List, vec![t(TypeName::Integer)]);
        let list_float = Type::of(TypeName::List, vec![t(TypeName::Float)]);
        let list_string = Type::of(TypeName::List, vec![t(TypeName::String)]);
        assert!(assignable(&list_float, &list_int));
        assert!(!assignable(&list_int, &list_string));
        // A bare target accepts any instantiation.
        assert!(assignable(&t(TypeName::List), &list_string));
    }

    #[test]
    fn should_check_tuples_elementwise_with_arity() {
        let pair = Type::Tuple(vec![t(TypeName::Integer), t(TypeName::String)]);
        let same = Type::Tuple(vec![t(TypeName::Integer), t(TypeName::String)]);
        let triple = Type::Tuple(vec![
            t(TypeName::Integer),
            t(TypeName::String),
            t(TypeName::Boolean),
        ]);
        assert!(assignable(&pair, &same));
        assert!(!assignable(&pair, &triple));
    }

    #[test]
    fn should_connect_placeholders_covariantly() {
        let mut bindings = Bindings::new();
        connect(
            &Type::of(TypeName::Channel, vec![Type::placeholder("T")]),
            &Type::of(TypeName::Channel, vec![t(TypeName::Integer)]),
            &mut bindings,
        );
        assert_eq!(bindings.get("T"), Some(&t(TypeName::Integer)));
    }

    #[test]
    fn should_keep_the_first_binding_for_a_placeholder() {
        let mut bindings = Bindings::new();
        connect(&Type::placeholder("T"), &t(TypeName::Integer), &mut bindings);
        connect(&Type::placeholder("T"), &t(TypeName::String), &mut bindings);
        assert_eq!(bindings.get("T"), Some(&t(TypeName::Integer)));
    }

    #[test]
    fn should_descend_into_function_shapes_when_connecting() {
        let mut bindings = Bindings::new();
        connect(
            &Type::function(vec![Type::placeholder("T")], Type::placeholder("R")),
            &Type::function(vec![t(TypeName::Integer)], t(TypeName::String)),
            &mut bindings,
        );
        assert_eq!(bindings.get("T"), Some(&t(TypeName::Integer)));
        assert_eq!(bindings.get("R"), Some(&t(TypeName::String)));
    }

    #[test]
    fn should_substitute_unbound_placeholders_to_dynamic() {
        let bindings = Bindings::new();
        let out = substitute(
            &Type::of(TypeName::Channel, vec![Type::placeholder("T")]),
            &bindings,
        );
        assert_eq!(out, Type::of(TypeName::Channel, vec![Type::Dynamic]));
    }

    #[test]
    fn should_render_types_readably() {
        assert_eq!(t(TypeName::Integer).to_string(), "Integer");
        assert_eq!(
            Type::of(TypeName::Channel, vec![t(TypeName::Integer)]).to_string(),
            "Channel<Integer>"
        );
        assert_eq!(
            Type::Tuple(vec![t(TypeName::Integer), t(TypeName::String)]).to_string(),
            "(Integer, String)"
        );
        assert_eq!(Type::Dynamic.to_string(), "?");
        assert_eq!(
            Type::of(TypeName::Value, vec![Type::Dynamic]).to_string(),
            "Value<?>"
        );
    }
}
