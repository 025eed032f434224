#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{new_store, user_in_group};
use strata_core::access::{can, effective_permissions, is_visible_to};
use strata_core::model::{Permissions, PrincipalKind, Subject};
use strata_core::ops::{principal_ops, record_ops, schema_ops};
use strata_core::EntityRef;

#[test]
fn test_schema_grant_applies_to_existing_and_new_instances() {
    // GIVEN a record created before any schema-level grant
    let mut store = new_store();
    schema_ops::define_type(&mut store, "Article", &[], vec![]).unwrap();
    let before = record_ops::create_record(&mut store, "Article", Some("old")).unwrap();
    let (user, group) = user_in_group(&mut store, "ann", "editors");

    // WHEN the group is granted write on the type
    principal_ops::grant_on_type(&mut store, "Article", Subject::resolved(&group), Permissions::WRITE)
        .unwrap();
    let after = record_ops::create_record(&mut store, "Article", Some("new")).unwrap();

    // THEN both records are writable by the member
    assert!(can(&store, &user, &EntityRef::record(&before), Permissions::WRITE).unwrap());
    assert!(can(&store, &user, &EntityRef::record(&after), Permissions::WRITE).unwrap());
}

#[test]
fn test_schema_grant_inherited_by_subtype_instances() {
    let mut store = new_store();
    schema_ops::define_type(&mut store, "Base", &[], vec![]).unwrap();
    schema_ops::define_type(&mut store, "Derived", &["Base"], vec![]).unwrap();
    let rec = record_ops::create_record(&mut store, "Derived", None).unwrap();
    let user = principal_ops::create_principal(&mut store, "bob", PrincipalKind::User).unwrap();

    principal_ops::grant_on_type(&mut store, "Base", Subject::resolved(&user), Permissions::READ)
        .unwrap();

    assert_eq!(
        effective_permissions(&store, &user, &EntityRef::record(&rec)).unwrap(),
        Permissions::READ
    );
    assert!(is_visible_to(&store, Some(&user), &EntityRef::record(&rec)).unwrap());
}

#[test]
fn test_unresolved_schema_grant_binds_on_creation() {
    // GIVEN a schema grant naming a principal that does not exist yet
    let mut store = new_store();
    schema_ops::define_type(&mut store, "Doc", &[], vec![]).unwrap();
    let rec = record_ops::create_record(&mut store, "Doc", None).unwrap();
    principal_ops::grant_on_type(&mut store, "Doc", Subject::unresolved("late"), Permissions::READ)
        .unwrap();

    // WHEN the principal is created
    let late = principal_ops::create_principal(&mut store, "late", PrincipalKind::User).unwrap();

    // THEN the grant takes effect immediately
    assert!(can(&store, &late, &EntityRef::record(&rec), Permissions::READ).unwrap());
}

#[test]
fn test_owner_holds_everything() {
    let mut store = new_store();
    schema_ops::define_type(&mut store, "Doc", &[], vec![]).unwrap();
    let rec = record_ops::create_record(&mut store, "Doc", None).unwrap();
    let (user, group) = user_in_group(&mut store, "cy", "owners");
    let entity = EntityRef::record(&rec);

    principal_ops::set_owner(&mut store, &entity, Some(Subject::resolved(&group))).unwrap();

    assert_eq!(
        effective_permissions(&store, &user, &entity).unwrap(),
        Permissions::FULL
    );
}

#[test]
fn test_no_grant_no_access() {
    let mut store = new_store();
    schema_ops::define_type(&mut store, "Doc", &[], vec![]).unwrap();
    let rec = record_ops::create_record(&mut store, "Doc", None).unwrap();
    let user = principal_ops::create_principal(&mut store, "dee", PrincipalKind::User).unwrap();

    assert!(effective_permissions(&store, &user, &EntityRef::record(&rec))
        .unwrap()
        .is_empty());
    assert!(!is_visible_to(&store, Some(&user), &EntityRef::record(&rec)).unwrap());
}
