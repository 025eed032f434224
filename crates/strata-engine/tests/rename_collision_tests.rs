#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{define_ordered_item, export_to, import_from, page_id};
use strata_core::ops::{content_ops, file_ops, schema_ops};
use strata_core::{ExErrorKind, Store};
use strata_engine::DeployOutcome;

/// Source with the opted-in root folders `names`, exported and imported
/// into a fresh target; returns `(export_dir, target)`
fn deployed_folders(names: &[&str]) -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let mut source = Store::new();
    for name in names {
        let id = file_ops::create_folder(&mut source, name, None).unwrap();
        file_ops::set_folder_included(&mut source, &id, true).unwrap();
        file_ops::create_file(&mut source, "readme.txt", Some(&id), name.as_bytes().to_vec())
            .unwrap();
    }
    export_to(&mut source, dir.path());
    let mut target = Store::new();
    let report = import_from(&mut target, dir.path(), false);
    assert_eq!(report.outcome(), DeployOutcome::Success);
    (dir, target)
}

/// Source with type `Item` and an `index` page, deployed into a fresh target
fn deployed_schema() -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let mut source = Store::new();
    define_ordered_item(&mut source);
    schema_ops::define_type(&mut source, "Tag", &[], Vec::new()).unwrap();
    content_ops::create_page(&mut source, "index").unwrap();
    export_to(&mut source, dir.path());
    let mut target = Store::new();
    let report = import_from(&mut target, dir.path(), false);
    assert_eq!(report.outcome(), DeployOutcome::Success);
    (dir, target)
}

#[test]
fn test_folder_name_taken_by_local_folder_is_corrected() {
    // GIVEN "resources" deployed, renamed to "rezources" in the target and a
    // new local "resources" created
    let (dir, mut target) = deployed_folders(&["resources"]);
    let original = file_ops::resolve_folder_path(&target, "resources").unwrap();
    file_ops::move_folder(&mut target, &original, "rezources", None).unwrap();
    let local = file_ops::create_folder(&mut target, "resources", None).unwrap();

    // WHEN the export is imported again
    let report = import_from(&mut target, dir.path(), false);

    // THEN the deployed folder has its name back and the local one moved aside
    assert_eq!(file_ops::folder_path(&target, &original).unwrap(), "resources");
    assert_eq!(
        file_ops::folder_path(&target, &local).unwrap(),
        "resources (local)"
    );
    assert!(file_ops::resolve_file_path(&target, "resources/readme.txt").is_some());

    // AND the move is reported without skipping anything
    assert_eq!(report.outcome(), DeployOutcome::Partial);
    let moved = report.issues_of(ExErrorKind::StructuralMismatch);
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].entity, "folder");
    assert_eq!(moved[0].name.as_deref(), Some("resources (local)"));
    assert!(report.issues_of(ExErrorKind::AlreadyExists).is_empty());
    assert_eq!(report.tallies["folder"].skipped, 0);
}

#[test]
fn test_swapped_folder_names_are_corrected() {
    let (dir, mut target) = deployed_folders(&["a", "b"]);
    let a = file_ops::resolve_folder_path(&target, "a").unwrap();
    let b = file_ops::resolve_folder_path(&target, "b").unwrap();
    file_ops::move_folder(&mut target, &a, "swap", None).unwrap();
    file_ops::move_folder(&mut target, &b, "a", None).unwrap();
    file_ops::move_folder(&mut target, &a, "b", None).unwrap();

    let report = import_from(&mut target, dir.path(), false);

    assert_eq!(report.outcome(), DeployOutcome::Success);
    assert_eq!(file_ops::folder_path(&target, &a).unwrap(), "a");
    assert_eq!(file_ops::folder_path(&target, &b).unwrap(), "b");
    assert_eq!(target.list_folders().len(), 2);
}

#[test]
fn test_swapped_file_names_are_corrected() {
    let (dir, mut target) = deployed_folders(&["docs"]);
    let docs = file_ops::resolve_folder_path(&target, "docs").unwrap();
    let readme = file_ops::resolve_file_path(&target, "docs/readme.txt").unwrap();
    let other = file_ops::create_file(&mut target, "other.txt", Some(&docs), Vec::new()).unwrap();
    file_ops::move_file(&mut target, &readme, "tmp.txt", Some(&docs)).unwrap();
    file_ops::move_file(&mut target, &other, "readme.txt", Some(&docs)).unwrap();

    import_from(&mut target, dir.path(), false);

    assert_eq!(file_ops::file_path(&target, &readme).unwrap(), "docs/readme.txt");
    assert_eq!(target.get_file(&readme).unwrap().content, b"docs".to_vec());
    assert_eq!(
        file_ops::file_path(&target, &other).unwrap(),
        "docs/readme.txt (local)"
    );
}

#[test]
fn test_type_name_taken_by_local_type_is_corrected() {
    // GIVEN Item renamed to Itemz in the target, a new local Item and a
    // renamed page
    let (dir, mut target) = deployed_schema();
    let original = target.type_by_name("Item").unwrap().id.clone();
    schema_ops::rename_type(&mut target, "Item", "Itemz").unwrap();
    schema_ops::define_type(&mut target, "Item", &[], Vec::new()).unwrap();
    let local = target.type_by_name("Item").unwrap().id.clone();
    let page = page_id(&target, "index");
    content_ops::rename_page(&mut target, &page, "changed").unwrap();

    // WHEN the export is imported again
    let report = import_from(&mut target, dir.path(), false);

    // THEN the import goes through and every rename is corrected
    assert!(report.fatal.is_none(), "{}", report.summary());
    assert_eq!(target.get_type(&original).unwrap().name, "Item");
    assert_eq!(target.get_type(&local).unwrap().name, "Item_local");
    assert_eq!(target.get_page(&page).unwrap().name, "index");
    let moved = report.issues_of(ExErrorKind::StructuralMismatch);
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].entity, "schema_type");
}

#[test]
fn test_swapped_type_names_are_corrected() {
    let (dir, mut target) = deployed_schema();
    let item = target.type_by_name("Item").unwrap().id.clone();
    let tag = target.type_by_name("Tag").unwrap().id.clone();
    schema_ops::rename_type(&mut target, "Item", "Swap").unwrap();
    schema_ops::rename_type(&mut target, "Tag", "Item").unwrap();
    schema_ops::rename_type(&mut target, "Swap", "Tag").unwrap();

    let report = import_from(&mut target, dir.path(), false);

    assert_eq!(report.outcome(), DeployOutcome::Success);
    assert_eq!(target.get_type(&item).unwrap().name, "Item");
    assert_eq!(target.get_type(&tag).unwrap().name, "Tag");
    assert_eq!(target.list_types().len(), 2);
}
