//! End-to-end resolver tests against the in-memory object manager

mod common;

use common::*;
use polyref::*;
use pretty_assertions::assert_eq;

// ═══════════════════════════════════════════════════════════════════════
// Assign and Resolve
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_assign_then_resolve_loads_by_type_and_ids() {
    let manager = InMemoryManager::new();
    manager.insert(Entity::saved(TARGET, 7));
    let resolver = resolver(manager);
    let mut source = SourceRecord::new(resolver.registry(), SOURCE);

    resolver
        .assign(&mut source, "nullable", Some(&Entity::saved(TARGET, 7)))
        .unwrap();
    let loaded = resolver.resolve(&source, "nullable").unwrap();

    assert_eq!(loaded, Some(Entity::saved(TARGET, 7)));
    assert_eq!(
        *resolver.manager().finds.borrow(),
        vec![(tag(TARGET), Identifiers::single("id", 7))]
    );
}

#[test]
fn test_resolve_unset_reference_skips_manager() {
    let resolver = resolver(InMemoryManager::new());
    let source = SourceRecord::new(resolver.registry(), SOURCE);

    assert_eq!(resolver.resolve(&source, "required").unwrap(), None);
    assert!(resolver.manager().finds.borrow().is_empty());
}

#[test]
fn test_resolve_unknown_reference() {
    let resolver = resolver(InMemoryManager::new());
    let source = SourceRecord::new(resolver.registry(), SOURCE);

    let err = resolver.resolve(&source, "undefined").unwrap_err();
    assert!(matches!(err, ReferenceError::UnknownReference { .. }));
}

#[test]
fn test_resolve_missing_record_is_none() {
    let resolver = resolver(InMemoryManager::new());
    let mut source = SourceRecord::new(resolver.registry(), SOURCE);
    resolver
        .assign(&mut source, "required", Some(&Entity::saved(TARGET, 99)))
        .unwrap();

    assert_eq!(resolver.resolve(&source, "required").unwrap(), None);
}

#[test]
fn test_resolve_propagates_repository_failure() {
    let manager = InMemoryManager::new();
    manager.offline.set(true);
    let resolver = resolver(manager);
    let mut source = SourceRecord::new(resolver.registry(), SOURCE);
    resolver
        .assign(&mut source, "required", Some(&Entity::saved(TARGET, 1)))
        .unwrap();

    let err = resolver.resolve(&source, "required").unwrap_err();
    match err {
        ReferenceError::Repository { type_tag, source } => {
            assert_eq!(type_tag, tag(TARGET));
            assert_eq!(source.to_string(), "database is offline");
        }
        other => panic!("expected Repository error, got {:?}", other),
    }
}

#[test]
fn test_persisted_owner_round_trip() {
    let manager = InMemoryManager::new();
    let mut target = Entity::new(TARGET);
    manager.persist(&mut target);
    let resolver = resolver(manager);

    let mut source = SourceRecord::new(resolver.registry(), SOURCE);
    resolver.assign(&mut source, "required", Some(&target)).unwrap();

    // Write the columns out and hydrate a fresh record from them.
    let row = source.references().columns();
    let mut reloaded = SourceRecord::new(resolver.registry(), SOURCE);
    reloaded
        .references_mut()
        .load_columns(
            "required",
            row["required_class"].clone(),
            row["required_identifiers"].clone(),
        )
        .unwrap();

    assert_eq!(resolver.resolve(&reloaded, "required").unwrap(), Some(target));
}

#[test]
fn test_set_null_reference() {
    let manager = InMemoryManager::new();
    let mut target = Entity::new(TARGET);
    manager.persist(&mut target);
    let resolver = resolver(manager);
    let mut source = SourceRecord::new(resolver.registry(), SOURCE);

    resolver.assign(&mut source, "nullable", Some(&target)).unwrap();
    assert_eq!(resolver.resolve(&source, "nullable").unwrap(), Some(target));

    resolver.assign(&mut source, "nullable", None).unwrap();
    assert_eq!(resolver.resolve(&source, "nullable").unwrap(), None);
}

#[test]
fn test_detach_required_reference_fails() {
    let resolver = resolver(InMemoryManager::new());
    let mut source = SourceRecord::new(resolver.registry(), SOURCE);
    resolver
        .assign(&mut source, "required", Some(&Entity::saved(TARGET, 1)))
        .unwrap();

    let err = resolver.detach(&mut source, "required").unwrap_err();
    assert!(matches!(err, ReferenceError::InvalidState(_)));
    assert!(source.references().is_set("required").unwrap());
}

#[test]
fn test_reference_without_identifiers_denied() {
    let resolver = resolver(InMemoryManager::new());
    let mut source = SourceRecord::new(resolver.registry(), SOURCE);

    let err = resolver
        .assign(&mut source, "nullable", Some(&Entity::new(TARGET)))
        .unwrap_err();

    assert!(matches!(err, ReferenceError::NotPersisted { ref type_tag } if type_tag == &tag(TARGET)));
    assert_eq!(
        err.to_string(),
        "Target object of type Target has no identifiers, must be persisted first"
    );
    assert!(!source.references().is_set("nullable").unwrap());
}

#[test]
fn test_forbidden_target_prevented() {
    let resolver = resolver(InMemoryManager::new());
    let mut source = SourceRecord::new(resolver.registry(), SOURCE);

    let err = resolver
        .assign(&mut source, "nullable", Some(&Entity::saved(NOT_ALLOWED, 1)))
        .unwrap_err();

    match err {
        ReferenceError::InvalidState(msg) => assert_eq!(
            msg,
            "Type NotAllowed is not allowed for reference 'nullable' on Source"
        ),
        other => panic!("expected InvalidState, got {:?}", other),
    }
    assert!(!source.references().is_set("nullable").unwrap());
}

#[test]
fn test_extract_reference_data() {
    let resolver = resolver(InMemoryManager::new());

    let reference = resolver
        .extract_reference_data(&Entity::saved(TARGET_CHILD, 3))
        .unwrap();
    assert_eq!(reference, Reference::new(TARGET_CHILD, Identifiers::single("id", 3)));

    let err = resolver
        .extract_reference_data(&Entity::new(TARGET))
        .unwrap_err();
    assert!(matches!(err, ReferenceError::NotPersisted { .. }));
}

#[test]
fn test_load_by_reference_data() {
    let manager = InMemoryManager::new();
    manager.insert(Entity::saved(TARGET_CHILD, 8));
    let resolver = resolver(manager);

    let reference = resolver
        .extract_reference_data(&Entity::saved(TARGET_CHILD, 8))
        .unwrap();
    let loaded = resolver.load(&reference).unwrap();

    assert_eq!(loaded, Some(Entity::saved(TARGET_CHILD, 8)));
    assert_eq!(
        *resolver.manager().finds.borrow(),
        vec![(tag(TARGET_CHILD), Identifiers::single("id", 8))]
    );
}

#[test]
fn test_load_checks_reference_data() {
    let resolver = resolver(InMemoryManager::new());

    let no_type = resolver
        .load(&Reference::new("", Identifiers::single("id", 1)))
        .unwrap_err();
    assert!(matches!(no_type, ReferenceError::InvalidArgument(_)));

    let no_ids = resolver
        .load(&Reference::new(TARGET, Identifiers::new()))
        .unwrap_err();
    assert!(matches!(no_ids, ReferenceError::InvalidArgument(_)));

    assert!(resolver.manager().finds.borrow().is_empty());
}

#[test]
fn test_resolve_empty_type_column_skips_manager() {
    let resolver = resolver(InMemoryManager::new());
    let mut source = SourceRecord::new(resolver.registry(), SOURCE);
    source
        .references_mut()
        .load_columns("nullable", Some(String::new()), Some(r#"{"id":1}"#.to_string()))
        .unwrap();

    assert_eq!(resolver.resolve(&source, "nullable").unwrap(), None);
    assert!(resolver.manager().finds.borrow().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════
// Query Filters
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_entity_filter_for_null() {
    let resolver = resolver(InMemoryManager::new());
    let filter = resolver
        .entity_filter_criteria(&tag(SOURCE), "nullable", None)
        .unwrap();

    let expected: FilterCriteria = vec![
        ("nullable_class", None::<&str>),
        ("nullable_identifiers", None),
    ]
    .into_iter()
    .collect();
    assert_eq!(filter, expected);
}

#[test]
fn test_entity_filter_for_target() {
    let resolver = resolver(InMemoryManager::new());
    let filter = resolver
        .entity_filter_criteria(&tag(SOURCE), "nullable", Some(&Entity::saved(TARGET, 4)))
        .unwrap();

    let expected: FilterCriteria = vec![
        ("nullable_class", Some("Target")),
        ("nullable_identifiers", Some(r#"{"id":4}"#)),
    ]
    .into_iter()
    .collect();
    assert_eq!(filter, expected);
}

#[test]
fn test_entity_filter_with_unsupported_target() {
    let resolver = resolver(InMemoryManager::new());
    let err = resolver
        .entity_filter_criteria(&tag(SOURCE), "nullable", Some(&Entity::saved(NOT_ALLOWED, 1)))
        .unwrap_err();
    assert!(err.to_string().contains("is not allowed for reference"));
}

#[test]
fn test_entity_filter_with_unsupported_source() {
    let resolver = resolver(InMemoryManager::new());
    // The capability check comes first, even for an unsaved target.
    let err = resolver
        .entity_filter_criteria(&tag(TARGET), "nullable", Some(&Entity::new(TARGET)))
        .unwrap_err();
    match err {
        ReferenceError::InvalidArgument(msg) => {
            assert_eq!(msg, "Type Target does not support references")
        }
        other => panic!("expected InvalidArgument, got {:?}", other),
    }
}

#[test]
fn test_entity_filter_with_unsaved_target() {
    let resolver = resolver(InMemoryManager::new());
    let err = resolver
        .entity_filter_criteria(&tag(SOURCE), "nullable", Some(&Entity::new(TARGET)))
        .unwrap_err();
    assert!(matches!(err, ReferenceError::NotPersisted { .. }));
}

#[test]
fn test_class_filter() {
    let resolver = resolver(InMemoryManager::new());
    let filter = resolver
        .class_filter_criteria(&tag(SOURCE), "nullable", &tag(TARGET))
        .unwrap();

    let expected: FilterCriteria = vec![("nullable_class", Some("Target"))].into_iter().collect();
    assert_eq!(filter, expected);
}

#[test]
fn test_class_filter_for_descendants() {
    let resolver = resolver(InMemoryManager::new());
    let filter = resolver
        .class_filter_criteria(&tag(SOURCE_CHILD), "nullable", &tag(TARGET_CHILD))
        .unwrap();
    assert_eq!(filter.get("nullable_class"), Some(Some("TargetChild")));
    assert!(!filter.constrains("nullable_identifiers"));
}

#[test]
fn test_class_filter_with_unsupported_source() {
    let resolver = resolver(InMemoryManager::new());
    let err = resolver
        .class_filter_criteria(&tag(TARGET), "nullable", &tag(TARGET))
        .unwrap_err();
    assert!(matches!(err, ReferenceError::InvalidArgument(_)));
}

#[test]
fn test_class_filter_with_unregistered_source() {
    let resolver = resolver(InMemoryManager::new());
    let err = resolver
        .class_filter_criteria(&tag("Ghost"), "nullable", &tag(TARGET))
        .unwrap_err();
    assert!(matches!(err, ReferenceError::Registry(RegistryError::UnknownType(_))));
}

#[test]
fn test_class_filter_with_unsupported_target() {
    let resolver = resolver(InMemoryManager::new());
    let err = resolver
        .class_filter_criteria(&tag(SOURCE), "nullable", &tag(NOT_ALLOWED))
        .unwrap_err();
    assert!(matches!(err, ReferenceError::InvalidState(_)));
}

#[test]
fn test_class_filter_unknown_reference_names_runtime_owner() {
    let resolver = resolver(InMemoryManager::new());
    let err = resolver
        .class_filter_criteria(&tag(SOURCE_CHILD), "undefined", &tag(TARGET))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unknown reference name 'undefined' on SourceChild"
    );
}
