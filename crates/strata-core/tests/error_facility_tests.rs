use strata_core::errors::{ExError, ExErrorKind, StrataError};

#[test]
fn test_not_found_carries_entity_id() {
    let ex: ExError = StrataError::PageNotFound {
        page_id: "p-1".to_string(),
    }
    .into();

    assert_eq!(ex.kind(), ExErrorKind::NotFound);
    assert_eq!(ex.code(), "ERR_NOT_FOUND");
    assert_eq!(ex.entity_id(), Some("p-1"));
}

#[test]
fn test_schema_errors_map_to_deploy_kinds() {
    let unknown: ExError = StrataError::UnknownBaseType {
        type_name: "Article".to_string(),
        base: "Missing".to_string(),
    }
    .into();
    assert_eq!(unknown.kind(), ExErrorKind::UnresolvedSchemaDependency);
    assert_eq!(unknown.code(), "ERR_UNRESOLVED_SCHEMA_DEPENDENCY");

    let cycle: ExError = StrataError::InheritanceCycle {
        type_name: "A".to_string(),
    }
    .into();
    assert_eq!(cycle.kind(), ExErrorKind::ConflictingInheritance);
}

#[test]
fn test_stable_codes() {
    let kinds = [
        (ExErrorKind::UnreadableEntity, "ERR_UNREADABLE_ENTITY"),
        (ExErrorKind::UnresolvedPrincipal, "ERR_UNRESOLVED_PRINCIPAL"),
        (ExErrorKind::CyclicShutdownGuard, "ERR_CYCLIC_SHUTDOWN_GUARD"),
        (ExErrorKind::StructuralMismatch, "ERR_STRUCTURAL_MISMATCH"),
        (ExErrorKind::InvalidExport, "ERR_INVALID_EXPORT"),
    ];
    for (kind, code) in kinds {
        assert_eq!(kind.code(), code);
    }
}

#[test]
fn test_source_chain() {
    let inner = ExError::new(ExErrorKind::Io).with_message("disk full");
    let outer = ExError::new(ExErrorKind::Persistence)
        .with_op("save_store")
        .with_source(inner);
    assert_eq!(outer.source_error().map(|e| e.kind()), Some(ExErrorKind::Io));
    assert!(std::error::Error::source(&outer).is_some());
}
