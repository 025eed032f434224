#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{new_store, page_with_div};
use strata_core::expand::expand_page;
use strata_core::model::ParentRef;
use strata_core::ops::content_ops::{self, ContentRoot};
use strata_core::{transact, StrataError};

#[test]
fn test_shared_component_placed_twice_has_two_instances() {
    // GIVEN a page whose div is turned into a shared component
    let mut store = new_store();
    let (page, div) = page_with_div(&mut store, "index", "hello");
    let (component, _) = content_ops::share_subtree(&mut store, &div).unwrap();

    // WHEN it is placed a second time
    content_ops::place_component(&mut store, &ParentRef::Page(page.clone()), &component).unwrap();

    // THEN the component is stored once and expanded twice
    assert_eq!(store.shadow_components(), &[component.clone()]);
    let exp = expand_page(&store, &page).unwrap();
    assert_eq!(exp.instances_of(&component).len(), 2);
    assert_ne!(exp.instances[0].path, exp.instances[1].path);
}

#[test]
fn test_shared_root_cannot_be_attached_directly() {
    let mut store = new_store();
    let page = content_ops::create_page(&mut store, "index").unwrap();
    let comp = content_ops::create_shared_component(&mut store, "nav", "menu").unwrap();

    let result = content_ops::append_child(&mut store, &ParentRef::Page(page), &comp);

    assert!(matches!(result, Err(StrataError::InvalidOperation { .. })));
}

#[test]
fn test_place_unknown_component_fails() {
    let mut store = new_store();
    let page = content_ops::create_page(&mut store, "index").unwrap();
    let plain = content_ops::create_element(&mut store, "div").unwrap();
    let result = content_ops::place_component(&mut store, &ParentRef::Page(page), &plain);
    assert!(matches!(result, Err(StrataError::ComponentNotFound { .. })));
}

#[test]
fn test_containing_root_walks_to_page() {
    let mut store = new_store();
    let (page, div) = page_with_div(&mut store, "index", "t");
    let text = store.get_node(&div).unwrap().children[0].clone();
    assert_eq!(
        content_ops::containing_root(&store, &text).unwrap(),
        ContentRoot::Page(page)
    );
}

#[test]
fn test_failed_transaction_keeps_store_untouched() {
    // GIVEN a page with content
    let mut store = new_store();
    let (page, div) = page_with_div(&mut store, "index", "t");
    let before = strata_core::site_digest(&store);

    // WHEN a multi-step change fails halfway
    let result: Result<(), StrataError> = transact(&mut store, |s| {
        content_ops::rename_page(s, &page, "renamed")?;
        content_ops::remove_node(s, &div)?;
        content_ops::remove_node(s, &div)?;
        Ok(())
    });

    // THEN nothing of it is visible
    assert!(result.is_err());
    assert_eq!(before, strata_core::site_digest(&store));
    assert_eq!(store.get_page(&page).unwrap().name, "index");
}

#[test]
fn test_page_nodes_depth_first() {
    let mut store = new_store();
    let (page, div) = page_with_div(&mut store, "index", "t");
    let text = store.get_node(&div).unwrap().children[0].clone();
    let footer = content_ops::create_element(&mut store, "footer").unwrap();
    content_ops::append_child(&mut store, &ParentRef::Page(page.clone()), &footer).unwrap();

    assert_eq!(
        content_ops::page_nodes(&store, &page).unwrap(),
        vec![div, text, footer]
    );
}
