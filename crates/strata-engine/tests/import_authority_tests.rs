#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{export_to, folder_id, import_from, page_id, sample_site, target_with_principals};
use strata_core::model::{
    EntityRef, Localization, Permissions, PrincipalKind, Subject, Visibility,
};
use strata_core::ops::{content_ops, file_ops, principal_ops};
use strata_core::{ExErrorKind, Store};
use strata_engine::DeployOutcome;

fn deployed_target() -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let mut source = sample_site();
    export_to(&mut source, dir.path());
    let mut target = target_with_principals();
    import_from(&mut target, dir.path(), false);
    (dir, target)
}

// =============================================================================
// Permissions and ownership
// =============================================================================

#[test]
fn test_import_restores_exported_permissions() {
    // GIVEN a deployed page whose access was changed locally
    let (dir, mut target) = deployed_target();
    let page = EntityRef::page(page_id(&target, "index"));
    let intruders =
        principal_ops::create_principal(&mut target, "intruders", PrincipalKind::Group).unwrap();
    principal_ops::grant(
        &mut target,
        &page,
        Subject::resolved(&intruders),
        Permissions::FULL,
    )
    .unwrap();
    principal_ops::set_owner(&mut target, &page, Some(Subject::resolved(&intruders))).unwrap();
    principal_ops::set_visibility(&mut target, &page, Visibility::new(true, true)).unwrap();

    // WHEN the export is imported again
    let report = import_from(&mut target, dir.path(), false);

    // THEN the exported access control wins
    assert_eq!(report.outcome(), DeployOutcome::Success);
    let acl = target.access(&page).unwrap();
    let admin = target.principal_by_name("admin").unwrap().id.clone();
    let editors = target.principal_by_name("editors").unwrap().id.clone();
    assert_eq!(acl.owner, Some(Subject::resolved(admin)));
    assert_eq!(acl.grants.len(), 1);
    assert_eq!(acl.grants[0].subject, Subject::resolved(editors));
    assert_eq!(
        acl.grants[0].permissions,
        Permissions::READ.union(Permissions::WRITE)
    );
    assert_eq!(acl.visibility, Visibility::default());
}

#[test]
fn test_import_never_creates_principals() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = sample_site();
    export_to(&mut source, dir.path());
    let mut target = Store::new();

    import_from(&mut target, dir.path(), false);

    assert!(target.list_principals().is_empty());
}

#[test]
fn test_unresolved_principals_are_reported_once_and_bound_later() {
    // GIVEN a target without the principals the export names
    let dir = tempfile::tempdir().unwrap();
    let mut source = sample_site();
    export_to(&mut source, dir.path());
    let mut target = Store::new();

    // WHEN imported
    let report = import_from(&mut target, dir.path(), false);

    // THEN the run is a partial success with one warning per missing name
    assert_eq!(report.outcome(), DeployOutcome::Partial);
    let mut names: Vec<String> = report
        .issues_of(ExErrorKind::UnresolvedPrincipal)
        .iter()
        .filter_map(|i| i.name.clone())
        .collect();
    names.sort();
    assert_eq!(names, vec!["admin", "editors"]);

    // AND the owner is kept as a marker until the principal appears
    let page = EntityRef::page(page_id(&target, "index"));
    assert_eq!(
        target.access(&page).unwrap().owner,
        Some(Subject::unresolved("admin"))
    );
    let admin = principal_ops::create_principal(&mut target, "admin", PrincipalKind::User).unwrap();
    assert_eq!(
        target.access(&page).unwrap().owner,
        Some(Subject::resolved(admin))
    );
}

// =============================================================================
// Children reconciliation
// =============================================================================

#[test]
fn test_local_children_of_matched_parent_are_removed() {
    // GIVEN a deployed page where the target added a node under the div
    let (dir, mut target) = deployed_target();
    let page = page_id(&target, "index");
    let div = target.get_page(&page).unwrap().children[0].clone();
    let extra = content_ops::create_text(&mut target, "local edit").unwrap();
    content_ops::append_child(
        &mut target,
        &strata_core::model::ParentRef::Node(div.clone()),
        &extra,
    )
    .unwrap();
    let children_before = target.get_node(&div).unwrap().children.len();

    // WHEN re-imported
    import_from(&mut target, dir.path(), false);

    // THEN the div holds exactly the exported children again
    let children = &target.get_node(&div).unwrap().children;
    assert_eq!(children.len(), children_before - 1);
    assert!(!children.contains(&extra));
    assert!(target.get_node(&extra).is_err());
}

#[test]
fn test_children_order_follows_export() {
    let (dir, mut target) = deployed_target();
    let page = page_id(&target, "index");
    let div = target.get_page(&page).unwrap().children[0].clone();
    let exported_order = target.get_node(&div).unwrap().children.clone();

    let mut reversed = exported_order.clone();
    reversed.reverse();
    for (i, child) in reversed.iter().enumerate() {
        content_ops::insert_child(
            &mut target,
            &strata_core::model::ParentRef::Node(div.clone()),
            i,
            child,
        )
        .unwrap();
    }
    assert_ne!(target.get_node(&div).unwrap().children, exported_order);

    import_from(&mut target, dir.path(), false);

    assert_eq!(target.get_node(&div).unwrap().children, exported_order);
}

// =============================================================================
// Replace mode
// =============================================================================

#[test]
fn test_replace_removes_absent_entities() {
    // GIVEN a target with content the export does not know
    let (dir, mut target) = deployed_target();
    content_ops::create_page(&mut target, "stale").unwrap();
    let old = file_ops::create_folder(&mut target, "old", None).unwrap();
    file_ops::set_folder_included(&mut target, &old, true).unwrap();
    let local = file_ops::create_folder(&mut target, "local", None).unwrap();
    content_ops::create_shared_component(&mut target, "footer", "footer").unwrap();
    target
        .insert_localization(Localization::new(
            strata_core::model::new_id(),
            strata_core::model::new_key(),
            "farewell".to_string(),
            "en".to_string(),
            "Bye".to_string(),
        ))
        .unwrap();

    // WHEN imported in replace mode
    let report = import_from(&mut target, dir.path(), true);

    // THEN everything absent from the export within exported groups is gone
    assert_eq!(report.outcome(), DeployOutcome::Success);
    assert!(target.page_by_name("stale").is_none());
    assert!(target.get_folder(&old).is_err());
    assert_eq!(target.shadow_components().len(), 1);
    assert_eq!(target.list_localizations().len(), 1);
    // Folders outside the opt-in chains are not deployment content
    assert!(target.get_folder(&local).is_ok());
    assert!(report.tallies["page"].deleted >= 1);
}

#[test]
fn test_merge_mode_keeps_absent_entities() {
    let (dir, mut target) = deployed_target();
    content_ops::create_page(&mut target, "stale").unwrap();

    import_from(&mut target, dir.path(), false);

    assert!(target.page_by_name("stale").is_some());
    assert_eq!(target.list_pages().len(), 2);
}

#[test]
fn test_replace_keeps_entities_that_failed_to_import() {
    // GIVEN a deployed page and an export whose page document is corrupted
    let (dir, mut target) = deployed_target();
    let page = page_id(&target, "index");
    let pages_dir = dir.path().join("pages");
    let doc = std::fs::read_dir(&pages_dir).unwrap().next().unwrap().unwrap().path();
    std::fs::write(&doc, "<div><!-- @strata {not json} --></div>").unwrap();

    // WHEN imported in replace mode
    let report = import_from(&mut target, dir.path(), true);

    // THEN the page is reported and left in place
    assert_eq!(report.outcome(), DeployOutcome::Partial);
    assert!(target.get_page(&page).is_ok());
}

// =============================================================================
// Opt-in flag on import
// =============================================================================

#[test]
fn test_flag_written_on_roots_only() {
    let (_dir, target) = deployed_target();

    let assets = folder_id(&target, "assets");
    let images = folder_id(&target, "assets/images");
    assert!(target.get_folder(&assets).unwrap().include_in_export);
    assert!(!target.get_folder(&images).unwrap().include_in_export);
    assert!(file_ops::is_folder_included(&target, &images).unwrap());
    let logo = file_ops::resolve_file_path(&target, "assets/images/logo.svg").unwrap();
    assert_eq!(target.get_file(&logo).unwrap().content, b"<svg/>".to_vec());
}

#[test]
fn test_tampered_file_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = sample_site();
    export_to(&mut source, dir.path());
    std::fs::write(dir.path().join("files/assets/images/logo.svg"), b"<svg>changed</svg>").unwrap();
    let mut target = target_with_principals();

    let report = import_from(&mut target, dir.path(), false);

    assert_eq!(report.outcome(), DeployOutcome::Partial);
    let mismatches = report.issues_of(ExErrorKind::StructuralMismatch);
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].entity, "file");
    assert!(file_ops::resolve_file_path(&target, "assets/images/logo.svg").is_none());
}
