#![allow(dead_code)]

use std::path::Path;

use strata_core::model::{
    EntityRef, Localization, MailTemplate, ParentRef, Permissions, PrincipalKind, SchemaProperty,
    SchemaView, Subject,
};
use strata_core::ops::{content_ops, file_ops, principal_ops, schema_ops};
use strata_core::Store;
use strata_engine::{run_deploy, DeployCommand, DeployConfig, DeployReport};

/// A small site touching every exported entity kind
///
/// - page `index` with a `div.main` holding text and a placement of `menu`
/// - shared component `menu` (a `nav` with one link)
/// - opted-in folder `assets` with `logo.svg`, plus an unflagged `drafts` folder
/// - type `Item` with the ordered public view
/// - one mail template and one localization
/// - group `editors` with write access to the page, owned by `admin`
pub fn sample_site() -> Store {
    let mut store = Store::new();

    let editors =
        principal_ops::create_principal(&mut store, "editors", PrincipalKind::Group).unwrap();
    principal_ops::create_principal(&mut store, "admin", PrincipalKind::User).unwrap();

    let page = content_ops::create_page(&mut store, "index").unwrap();
    let div = content_ops::create_element(&mut store, "div").unwrap();
    content_ops::set_attribute(&mut store, &div, "class", Some("main")).unwrap();
    content_ops::append_child(&mut store, &ParentRef::Page(page.clone()), &div).unwrap();
    let text = content_ops::create_text(&mut store, "Welcome\nhome").unwrap();
    content_ops::append_child(&mut store, &ParentRef::Node(div.clone()), &text).unwrap();

    let menu = content_ops::create_shared_component(&mut store, "nav", "menu").unwrap();
    let link = content_ops::create_element(&mut store, "a").unwrap();
    content_ops::set_attribute(&mut store, &link, "href", Some("/")).unwrap();
    content_ops::append_child(&mut store, &ParentRef::Node(menu.clone()), &link).unwrap();
    content_ops::place_component(&mut store, &ParentRef::Node(div), &menu).unwrap();

    principal_ops::grant(
        &mut store,
        &EntityRef::page(&page),
        Subject::resolved(&editors),
        Permissions::READ.union(Permissions::WRITE),
    )
    .unwrap();
    let admin = store.principal_by_name("admin").unwrap().id.clone();
    principal_ops::set_owner(&mut store, &EntityRef::page(&page), Some(Subject::resolved(admin)))
        .unwrap();

    let assets = file_ops::create_folder(&mut store, "assets", None).unwrap();
    file_ops::set_folder_included(&mut store, &assets, true).unwrap();
    let images = file_ops::create_folder(&mut store, "images", Some(&assets)).unwrap();
    file_ops::create_file(&mut store, "logo.svg", Some(&images), b"<svg/>".to_vec()).unwrap();
    file_ops::create_folder(&mut store, "drafts", None).unwrap();

    define_ordered_item(&mut store);

    store
        .insert_mail_template(MailTemplate::new(
            strata_core::model::new_id(),
            strata_core::model::new_key(),
            "welcome".to_string(),
            "en".to_string(),
            "Hello ${name}".to_string(),
        ))
        .unwrap();
    store
        .insert_localization(Localization::new(
            strata_core::model::new_id(),
            strata_core::model::new_key(),
            "greeting".to_string(),
            "de".to_string(),
            "Hallo".to_string(),
        ))
        .unwrap();

    store
}

/// Type `Item` with properties one..four and the ordered public view
pub fn define_ordered_item(store: &mut Store) {
    let props = ["one", "two", "three", "four"]
        .iter()
        .map(|n| SchemaProperty::new(*n, "String"))
        .collect();
    schema_ops::define_type(store, "Item", &[], props).unwrap();
    let mut view = SchemaView::new("public");
    view.order = Some(
        ["type", "one", "id", "two", "three", "four", "name"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    schema_ops::set_view(store, "Item", view).unwrap();
}

/// Target environment holding the principals `sample_site` refers to
pub fn target_with_principals() -> Store {
    let mut store = Store::new();
    principal_ops::create_principal(&mut store, "editors", PrincipalKind::Group).unwrap();
    principal_ops::create_principal(&mut store, "admin", PrincipalKind::User).unwrap();
    store
}

pub fn export_to(store: &mut Store, dir: &Path) -> DeployReport {
    run_deploy(
        &DeployCommand::Export {
            dir: dir.to_path_buf(),
        },
        store,
        &DeployConfig::default(),
    )
}

pub fn import_from(store: &mut Store, dir: &Path, replace: bool) -> DeployReport {
    run_deploy(
        &DeployCommand::Import {
            dir: dir.to_path_buf(),
            replace,
        },
        store,
        &DeployConfig::default(),
    )
}

pub fn page_id(store: &Store, name: &str) -> String {
    store.page_by_name(name).unwrap().id.clone()
}

pub fn folder_id(store: &Store, path: &str) -> String {
    file_ops::resolve_folder_path(store, path).unwrap()
}
