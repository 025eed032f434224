use strata_core::model::{
    EntityRef, Localization, MailTemplate, ParentRef, Permissions, PrincipalKind,
    SchemaProperty, Subject,
};
use strata_core::ops::{content_ops, file_ops, principal_ops, record_ops, schema_ops};
use strata_core::{site_digest, Store};
use strata_store::db;
use strata_store::repo::{load_store, SqliteRepo};

fn sample_store() -> Store {
    let mut store = Store::new();

    let page = content_ops::create_page(&mut store, "index").unwrap();
    let div = content_ops::create_element(&mut store, "div").unwrap();
    content_ops::append_child(&mut store, &ParentRef::Page(page.clone()), &div).unwrap();
    content_ops::set_attribute(&mut store, &div, "class", Some("main")).unwrap();
    let text = content_ops::create_text(&mut store, "hello").unwrap();
    content_ops::append_child(&mut store, &ParentRef::Node(div.clone()), &text).unwrap();

    let nav = content_ops::create_shared_component(&mut store, "nav", "menu").unwrap();
    content_ops::place_component(&mut store, &ParentRef::Node(div.clone()), &nav).unwrap();

    let editors = principal_ops::create_principal(&mut store, "editors", PrincipalKind::Group)
        .unwrap();
    principal_ops::grant(
        &mut store,
        &EntityRef::node(div.clone()),
        Subject::resolved(&editors),
        Permissions::READ.union(Permissions::WRITE),
    )
    .unwrap();
    principal_ops::set_owner(
        &mut store,
        &EntityRef::page(page),
        Some(Subject::unresolved("admin")),
    )
    .unwrap();

    let assets = file_ops::create_folder(&mut store, "assets", None).unwrap();
    file_ops::set_folder_included(&mut store, &assets, true).unwrap();
    file_ops::create_file(&mut store, "logo.svg", Some(&assets), b"<svg/>".to_vec()).unwrap();

    schema_ops::define_type(
        &mut store,
        "Article",
        &[],
        vec![SchemaProperty::new("title", "String")],
    )
    .unwrap();
    let record = record_ops::create_record(&mut store, "Article", Some("first")).unwrap();
    record_ops::set_property(&mut store, &record, "title", serde_json::json!("Hi")).unwrap();

    store
        .insert_mail_template(MailTemplate::new(
            strata_core::model::new_id(),
            strata_core::model::new_key(),
            "welcome".to_string(),
            "en".to_string(),
            "Hello".to_string(),
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

#[test]
fn test_save_then_load_preserves_site_digest() {
    // GIVEN a populated store saved to a file database
    let dir = tempfile::tempdir().unwrap();
    let mut conn = db::open_and_migrate(dir.path().join("store.db")).unwrap();
    let store = sample_store();
    SqliteRepo::save_store(&mut conn, &store).unwrap();

    // WHEN it is loaded back
    let loaded = load_store(&conn).unwrap();

    // THEN the deployable state is identical, file bytes included
    assert_eq!(site_digest(&loaded), site_digest(&store));
    assert_eq!(loaded.node_count(), store.node_count());
    assert_eq!(loaded.shadow_components(), store.shadow_components());
    let file = loaded.list_files()[0];
    assert_eq!(file.content, b"<svg/>".to_vec());
    assert_eq!(loaded.list_records().len(), 1);
}

#[test]
fn test_save_prunes_deleted_entities() {
    // GIVEN a saved store
    let mut conn = db::open_in_memory().unwrap();
    strata_store::migrations::apply_migrations(&mut conn).unwrap();
    let mut store = sample_store();
    SqliteRepo::save_store(&mut conn, &store).unwrap();

    // WHEN a page is deleted and the store saved again
    let page = store.page_by_name("index").unwrap().id.clone();
    content_ops::delete_page(&mut store, &page).unwrap();
    SqliteRepo::save_store(&mut conn, &store).unwrap();

    // THEN the page and its nodes are gone from the database
    let pages: i64 = conn
        .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))
        .unwrap();
    assert_eq!(pages, 0);
    let loaded = load_store(&conn).unwrap();
    assert_eq!(loaded.node_count(), store.node_count());
    assert_eq!(site_digest(&loaded), site_digest(&store));
}

#[test]
fn test_load_resolves_keys() {
    let mut conn = db::open_in_memory().unwrap();
    strata_store::migrations::apply_migrations(&mut conn).unwrap();
    let store = sample_store();
    SqliteRepo::save_store(&mut conn, &store).unwrap();

    let loaded = load_store(&conn).unwrap();

    let page = store.page_by_name("index").unwrap();
    let found = loaded.find_by_key(&page.key).unwrap();
    assert_eq!(found, &EntityRef::page(page.id.clone()));
}
