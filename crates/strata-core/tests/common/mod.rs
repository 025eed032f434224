#![allow(dead_code)]

use strata_core::model::{ParentRef, PrincipalKind, SchemaProperty, SchemaView};
use strata_core::ops::{content_ops, principal_ops, schema_ops};
use strata_core::Store;

/// Create a new empty Store for testing
pub fn new_store() -> Store {
    Store::new()
}

/// Page with a `div` holding one text node; returns `(page_id, div_id)`
pub fn page_with_div(store: &mut Store, name: &str, text: &str) -> (String, String) {
    let page = content_ops::create_page(store, name).unwrap();
    let div = content_ops::create_element(store, "div").unwrap();
    content_ops::append_child(store, &ParentRef::Page(page.clone()), &div).unwrap();
    let t = content_ops::create_text(store, text).unwrap();
    content_ops::append_child(store, &ParentRef::Node(div.clone()), &t).unwrap();
    (page, div)
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

/// User `name` inside group `group`; returns `(user_id, group_id)`
pub fn user_in_group(store: &mut Store, name: &str, group: &str) -> (String, String) {
    let user = principal_ops::create_principal(store, name, PrincipalKind::User).unwrap();
    let group = principal_ops::create_principal(store, group, PrincipalKind::Group).unwrap();
    principal_ops::add_member(store, &user, &group).unwrap();
    (user, group)
}
