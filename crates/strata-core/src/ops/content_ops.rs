//! Authoring operations on pages, markup nodes and shared components

use super::store::Store;
use crate::errors::{Result, StrataError};
use crate::model::{new_id, new_key, ContentNode, NodeKind, Page, ParentRef};

/// Root a node ultimately hangs from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentRoot {
    Page(String),
    Component(String),
    /// Detached node that is not a shared component root
    Detached(String),
}

/// Create a new page with a fresh id and reconciliation key
///
/// # Errors
/// * `InvalidName` - If the name is empty or contains a path separator
pub fn create_page(store: &mut Store, name: &str) -> Result<String> {
    validate_entity_name(name)?;
    let id = new_id();
    let mut page = Page::new(id.clone(), new_key(), name.to_string());
    page.position = store.pages.len() as i64;
    store.insert_page(page)?;
    Ok(id)
}

/// Rename a page
///
/// # Errors
/// * `InvalidName` - If the name is invalid
/// * `PageNotFound` - If the page does not exist
pub fn rename_page(store: &mut Store, page_id: &str, name: &str) -> Result<()> {
    validate_entity_name(name)?;
    let page = store.get_page_mut(page_id)?;
    page.name = name.to_string();
    page.touch();
    Ok(())
}

/// Create a detached node of any kind
///
/// When `key` is `None` a fresh reconciliation key is minted.
///
/// # Errors
/// * `InvalidName` - If an element tag is not a valid markup name
/// * `DuplicateKey` - If the supplied key is already bound
pub fn create_node(store: &mut Store, kind: NodeKind, key: Option<String>) -> Result<String> {
    if let NodeKind::Element { tag } = &kind {
        validate_tag(tag)?;
    }
    let id = new_id();
    let node = ContentNode::new(id.clone(), key.unwrap_or_else(new_key), kind);
    store.insert_node(node)?;
    Ok(id)
}

/// # Errors
/// * `InvalidName` - If the tag is not a valid markup name
pub fn create_element(store: &mut Store, tag: &str) -> Result<String> {
    create_node(
        store,
        NodeKind::Element {
            tag: tag.to_string(),
        },
        None,
    )
}

/// # Errors
/// Never fails for valid stores; the `Result` mirrors `create_node`.
pub fn create_text(store: &mut Store, text: &str) -> Result<String> {
    create_node(
        store,
        NodeKind::Text {
            text: text.to_string(),
        },
        None,
    )
}

/// # Errors
/// Never fails for valid stores; the `Result` mirrors `create_node`.
pub fn create_comment(store: &mut Store, text: &str) -> Result<String> {
    create_node(
        store,
        NodeKind::Comment {
            text: text.to_string(),
        },
        None,
    )
}

/// # Errors
/// Never fails for valid stores; the `Result` mirrors `create_node`.
pub fn create_template(store: &mut Store, content: &str) -> Result<String> {
    create_node(
        store,
        NodeKind::Template {
            content: content.to_string(),
        },
        None,
    )
}

/// Append `child_id` as the last child of `parent`
///
/// A child that is attached elsewhere is moved.
///
/// # Errors
/// * `CycleDetected` - If `parent` lies inside the subtree of `child_id`
/// * `InvalidOperation` - If the parent cannot own children or the child is a shared root
pub fn append_child(store: &mut Store, parent: &ParentRef, child_id: &str) -> Result<()> {
    insert_child(store, parent, usize::MAX, child_id)
}

/// Insert `child_id` at `index` among the children of `parent`
///
/// Indexes past the end append.
///
/// # Errors
/// Same as [`append_child`].
pub fn insert_child(
    store: &mut Store,
    parent: &ParentRef,
    index: usize,
    child_id: &str,
) -> Result<()> {
    let child = store.get_node(child_id)?;
    if child.shared {
        return Err(StrataError::InvalidOperation {
            reason: format!(
                "shared component {} cannot be attached; place it instead",
                child_id
            ),
        });
    }

    match parent {
        ParentRef::Page(page_id) => {
            store.get_page(page_id)?;
        }
        ParentRef::Node(node_id) => {
            let parent_node = store.get_node(node_id)?;
            if !parent_node.kind.accepts_children() {
                return Err(StrataError::InvalidOperation {
                    reason: format!(
                        "{} node {} cannot own children",
                        parent_node.kind.discriminator(),
                        node_id
                    ),
                });
            }
            if is_in_subtree(store, node_id, child_id)? {
                return Err(StrataError::CycleDetected {
                    node_id: child_id.to_string(),
                });
            }
        }
    }

    detach(store, child_id)?;

    let siblings = children_mut(store, parent)?;
    let at = index.min(siblings.len());
    siblings.insert(at, child_id.to_string());

    let child = store.get_node_mut(child_id)?;
    child.parent = Some(parent.clone());
    child.touch();
    Ok(())
}

/// Remove a node from its parent's child list, keeping the node in the store
///
/// # Errors
/// * `NodeNotFound` - If the node does not exist
pub fn detach(store: &mut Store, node_id: &str) -> Result<()> {
    let parent = store.get_node(node_id)?.parent.clone();
    if let Some(parent) = parent {
        if let Ok(siblings) = children_mut(store, &parent) {
            siblings.retain(|id| id != node_id);
        }
        store.get_node_mut(node_id)?.parent = None;
    }
    Ok(())
}

/// Delete a node and its whole subtree
///
/// Placements inside the subtree are removed; the components they point at
/// are not.
///
/// # Errors
/// * `NodeNotFound` - If the node does not exist
/// * `InvalidOperation` - If the node is a shared component root
pub fn remove_node(store: &mut Store, node_id: &str) -> Result<()> {
    if store.get_node(node_id)?.shared {
        return Err(StrataError::InvalidOperation {
            reason: format!(
                "{} is a shared component; use delete_shared_component",
                node_id
            ),
        });
    }
    detach(store, node_id)?;
    for id in subtree_ids(store, node_id)? {
        store.remove_node_entry(&id);
    }
    Ok(())
}

/// Delete a page with all of its nodes
///
/// # Errors
/// * `PageNotFound` - If the page does not exist
pub fn delete_page(store: &mut Store, page_id: &str) -> Result<()> {
    let children = store.get_page(page_id)?.children.clone();
    for child in children {
        for id in subtree_ids(store, &child)? {
            store.remove_node_entry(&id);
        }
    }
    store.remove_page_entry(page_id);
    Ok(())
}

/// Create an empty shared component rooted at an element
///
/// # Errors
/// * `InvalidName` - If the tag is not a valid markup name
pub fn create_shared_component(store: &mut Store, tag: &str, name: &str) -> Result<String> {
    let id = create_element(store, tag)?;
    store.get_node_mut(&id)?.name = Some(name.to_string());
    store.add_to_shadow(&id)?;
    Ok(id)
}

/// Move an attached subtree into the shadow container
///
/// The subtree's former position is taken by a placement pointing at it.
/// Returns `(component_id, placement_id)`.
///
/// # Errors
/// * `InvalidOperation` - If the node is detached or already shared
pub fn share_subtree(store: &mut Store, node_id: &str) -> Result<(String, String)> {
    let node = store.get_node(node_id)?;
    if node.shared {
        return Err(StrataError::InvalidOperation {
            reason: format!("{} is already a shared component", node_id),
        });
    }
    let parent = node.parent.clone().ok_or_else(|| StrataError::InvalidOperation {
        reason: format!("{} is detached and cannot be shared in place", node_id),
    })?;
    let position = children(store, &parent)?
        .iter()
        .position(|id| id == node_id)
        .unwrap_or(usize::MAX);

    detach(store, node_id)?;
    store.add_to_shadow(node_id)?;

    let placement = create_node(
        store,
        NodeKind::Placement {
            component: node_id.to_string(),
        },
        None,
    )?;
    insert_child(store, &parent, position, &placement)?;
    Ok((node_id.to_string(), placement))
}

/// Append a placement of `component_id` under `parent`
///
/// Placements inside other components are allowed, including ones that
/// close a cycle between components.
///
/// # Errors
/// * `ComponentNotFound` - If `component_id` is not a shadow root
pub fn place_component(store: &mut Store, parent: &ParentRef, component_id: &str) -> Result<String> {
    if !store.is_shared_component(component_id) {
        return Err(StrataError::ComponentNotFound {
            component_id: component_id.to_string(),
        });
    }
    let placement = create_node(
        store,
        NodeKind::Placement {
            component: component_id.to_string(),
        },
        None,
    )?;
    append_child(store, parent, &placement)?;
    Ok(placement)
}

/// Delete a shared component together with every placement pointing at it
///
/// # Errors
/// * `ComponentNotFound` - If `component_id` is not a shadow root
pub fn delete_shared_component(store: &mut Store, component_id: &str) -> Result<()> {
    if !store.is_shared_component(component_id) {
        return Err(StrataError::ComponentNotFound {
            component_id: component_id.to_string(),
        });
    }
    let placements: Vec<String> = store
        .nodes
        .values()
        .filter(|n| n.placement_target() == Some(component_id))
        .map(|n| n.id.clone())
        .collect();
    for placement in placements {
        if store.nodes.contains_key(&placement) {
            remove_node(store, &placement)?;
        }
    }

    store.remove_from_shadow(component_id);
    for id in subtree_ids(store, component_id)? {
        store.remove_node_entry(&id);
    }
    Ok(())
}

/// Placement node ids pointing at a component, sorted by id
pub fn placements_of(store: &Store, component_id: &str) -> Vec<String> {
    let mut ids: Vec<String> = store
        .nodes
        .values()
        .filter(|n| n.placement_target() == Some(component_id))
        .map(|n| n.id.clone())
        .collect();
    ids.sort();
    ids
}

/// Depth-first ids of a subtree, root first, without expanding placements
///
/// # Errors
/// * `NodeNotFound` - If the root does not exist
pub fn subtree_ids(store: &Store, root_id: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let mut stack = vec![root_id.to_string()];
    while let Some(id) = stack.pop() {
        let node = store.get_node(&id)?;
        stack.extend(node.children.iter().rev().cloned());
        out.push(id);
    }
    Ok(out)
}

/// Depth-first ids of every node on a page, without expanding placements
///
/// # Errors
/// * `PageNotFound` - If the page does not exist
pub fn page_nodes(store: &Store, page_id: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for child in &store.get_page(page_id)?.children {
        out.extend(subtree_ids(store, child)?);
    }
    Ok(out)
}

/// Walk parents up to the page or component the node belongs to
///
/// # Errors
/// * `NodeNotFound` - If the node or one of its ancestors is missing
pub fn containing_root(store: &Store, node_id: &str) -> Result<ContentRoot> {
    let mut current = node_id.to_string();
    loop {
        let node = store.get_node(&current)?;
        match &node.parent {
            Some(ParentRef::Page(page_id)) => return Ok(ContentRoot::Page(page_id.clone())),
            Some(ParentRef::Node(parent_id)) => current = parent_id.clone(),
            None if node.shared => return Ok(ContentRoot::Component(current)),
            None => return Ok(ContentRoot::Detached(current)),
        }
    }
}

/// Set or clear a plain markup attribute
///
/// # Errors
/// * `NodeNotFound` - If the node does not exist
/// * `InvalidName` - If the attribute name is empty or contains whitespace
pub fn set_attribute(
    store: &mut Store,
    node_id: &str,
    name: &str,
    value: Option<&str>,
) -> Result<()> {
    if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == '"' || c == '=') {
        return Err(StrataError::InvalidName {
            reason: format!("invalid attribute name '{}'", name),
        });
    }
    let node = store.get_node_mut(node_id)?;
    match value {
        Some(v) => {
            node.attributes.insert(name.to_string(), v.to_string());
        }
        None => {
            node.attributes.remove(name);
        }
    }
    node.touch();
    Ok(())
}

/// # Errors
/// * `NodeNotFound` - If the node does not exist
pub fn set_node_name(store: &mut Store, node_id: &str, name: Option<&str>) -> Result<()> {
    let node = store.get_node_mut(node_id)?;
    node.name = name.map(str::to_string);
    node.touch();
    Ok(())
}

/// Child ids of a page or node
///
/// # Errors
/// * `PageNotFound` / `NodeNotFound` - If the parent does not exist
pub fn children<'a>(store: &'a Store, parent: &ParentRef) -> Result<&'a [String]> {
    match parent {
        ParentRef::Page(id) => Ok(&store.get_page(id)?.children),
        ParentRef::Node(id) => Ok(&store.get_node(id)?.children),
    }
}

fn children_mut<'a>(store: &'a mut Store, parent: &ParentRef) -> Result<&'a mut Vec<String>> {
    match parent {
        ParentRef::Page(id) => Ok(&mut store.get_page_mut(id)?.children),
        ParentRef::Node(id) => Ok(&mut store.get_node_mut(id)?.children),
    }
}

fn is_in_subtree(store: &Store, candidate: &str, root: &str) -> Result<bool> {
    let mut current = Some(candidate.to_string());
    while let Some(id) = current {
        if id == root {
            return Ok(true);
        }
        current = match &store.get_node(&id)?.parent {
            Some(ParentRef::Node(parent)) => Some(parent.clone()),
            _ => None,
        };
    }
    Ok(false)
}

/// Names of pages, folders and files: non-empty, no path separators
pub(crate) fn validate_entity_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(StrataError::InvalidName {
            reason: "Name cannot be empty or whitespace-only".to_string(),
        });
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(StrataError::InvalidName {
            reason: format!("'{}' is not a valid name", name),
        });
    }
    Ok(())
}

fn validate_tag(tag: &str) -> Result<()> {
    let valid = tag
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic())
        .unwrap_or(false)
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ':' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StrataError::InvalidName {
            reason: format!("'{}' is not a valid tag", tag),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with_div(store: &mut Store) -> (String, String) {
        let page = create_page(store, "index").unwrap();
        let div = create_element(store, "div").unwrap();
        append_child(store, &ParentRef::Page(page.clone()), &div).unwrap();
        (page, div)
    }

    #[test]
    fn test_append_preserves_order() {
        let mut store = Store::new();
        let (_, div) = page_with_div(&mut store);
        let parent = ParentRef::Node(div.clone());
        let a = create_text(&mut store, "a").unwrap();
        let b = create_text(&mut store, "b").unwrap();
        let c = create_text(&mut store, "c").unwrap();
        append_child(&mut store, &parent, &a).unwrap();
        append_child(&mut store, &parent, &c).unwrap();
        insert_child(&mut store, &parent, 1, &b).unwrap();

        assert_eq!(store.get_node(&div).unwrap().children, vec![a, b, c]);
    }

    #[test]
    fn test_append_rejects_cycle() {
        let mut store = Store::new();
        let (_, div) = page_with_div(&mut store);
        let inner = create_element(&mut store, "span").unwrap();
        append_child(&mut store, &ParentRef::Node(div.clone()), &inner).unwrap();

        let result = append_child(&mut store, &ParentRef::Node(inner), &div);
        assert!(matches!(result, Err(StrataError::CycleDetected { .. })));
    }

    #[test]
    fn test_text_cannot_own_children() {
        let mut store = Store::new();
        let text = create_text(&mut store, "t").unwrap();
        let other = create_text(&mut store, "u").unwrap();
        let result = append_child(&mut store, &ParentRef::Node(text), &other);
        assert!(matches!(result, Err(StrataError::InvalidOperation { .. })));
    }

    #[test]
    fn test_move_detaches_from_old_parent() {
        let mut store = Store::new();
        let (page, div) = page_with_div(&mut store);
        let span = create_element(&mut store, "span").unwrap();
        append_child(&mut store, &ParentRef::Node(div.clone()), &span).unwrap();
        append_child(&mut store, &ParentRef::Page(page.clone()), &span).unwrap();

        assert!(store.get_node(&div).unwrap().children.is_empty());
        assert_eq!(store.get_page(&page).unwrap().children, vec![div, span]);
    }

    #[test]
    fn test_share_subtree_leaves_placement_in_place() {
        let mut store = Store::new();
        let (page, div) = page_with_div(&mut store);
        let footer = create_element(&mut store, "footer").unwrap();
        append_child(&mut store, &ParentRef::Page(page.clone()), &footer).unwrap();

        let (component, placement) = share_subtree(&mut store, &div).unwrap();

        assert!(store.is_shared_component(&component));
        assert_eq!(
            store.get_page(&page).unwrap().children,
            vec![placement.clone(), footer]
        );
        assert_eq!(
            store.get_node(&placement).unwrap().placement_target(),
            Some(component.as_str())
        );
        assert_eq!(
            containing_root(&store, &component).unwrap(),
            ContentRoot::Component(component.clone())
        );
    }

    #[test]
    fn test_delete_component_removes_placements() {
        let mut store = Store::new();
        let page = create_page(&mut store, "index").unwrap();
        let comp = create_shared_component(&mut store, "nav", "menu").unwrap();
        let p1 = place_component(&mut store, &ParentRef::Page(page.clone()), &comp).unwrap();

        delete_shared_component(&mut store, &comp).unwrap();

        assert!(store.get_node(&p1).is_err());
        assert!(store.get_page(&page).unwrap().children.is_empty());
        assert!(store.shadow_components().is_empty());
    }

    #[test]
    fn test_delete_page_removes_nodes() {
        let mut store = Store::new();
        let (page, div) = page_with_div(&mut store);
        let text = create_text(&mut store, "x").unwrap();
        append_child(&mut store, &ParentRef::Node(div), &text).unwrap();

        delete_page(&mut store, &page).unwrap();
        assert_eq!(store.node_count(), 0);
        assert!(store.get_page(&page).is_err());
    }

    #[test]
    fn test_invalid_tag_rejected() {
        let mut store = Store::new();
        assert!(create_element(&mut store, "").is_err());
        assert!(create_element(&mut store, "1div").is_err());
        assert!(create_element(&mut store, "a b").is_err());
        assert!(create_element(&mut store, "strata:template").is_ok());
    }
}
