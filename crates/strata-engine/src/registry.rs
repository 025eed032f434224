//! Shared component registry
//!
//! Export side: the dependency graph between shared components (an edge
//! for every placement inside a component's subtree) and its cycles, which
//! are reported as structural notes rather than errors.
//!
//! Import side: components are populated in two passes. The first pass
//! matches or creates a root shell for every component; the second fills
//! each shell's attributes and children. Placements, including cyclic
//! ones, resolve against the shells, so every component exists before any
//! content refers to it.

use std::collections::{BTreeMap, BTreeSet};

use strata_core::errors::{ExError, ExErrorKind};
use strata_core::model::{EntityKind, EntityRef, ParentRef};
use strata_core::ops::content_ops;
use strata_core::Store;

use crate::errors::Result;
use crate::format::manifest::ComponentEntry;
use crate::format::markup::{MarkupKind, MarkupNode};
use crate::importer::{reconcile_children, ImportContext};
use crate::report::Issue;

/// Component key to the keys of the components its subtree places
pub fn component_graph(store: &Store) -> BTreeMap<String, BTreeSet<String>> {
    let mut graph = BTreeMap::new();
    for root in store.shadow_components() {
        let Ok(node) = store.get_node(root) else {
            continue;
        };
        let mut edges = BTreeSet::new();
        for id in content_ops::subtree_ids(store, root).unwrap_or_default() {
            let target = store
                .get_node(&id)
                .ok()
                .and_then(|n| n.placement_target())
                .and_then(|t| store.get_node(t).ok());
            if let Some(target) = target {
                edges.insert(target.key.clone());
            }
        }
        graph.insert(node.key.clone(), edges);
    }
    graph
}

/// Every elementary cycle reachable in the component graph, each given as
/// a closed label path (`a -> b -> a` is `["a", "b", "a"]`)
///
/// Labels are component names, falling back to keys. A cycle is reported
/// once, starting from its smallest key.
pub fn component_cycles(store: &Store) -> Vec<Vec<String>> {
    let graph = component_graph(store);
    let mut found: BTreeSet<Vec<String>> = BTreeSet::new();

    for start in graph.keys() {
        let mut path = vec![start.clone()];
        walk(&graph, start, &mut path, &mut found);
    }

    let label = |key: &String| -> String {
        store
            .find_by_key(key)
            .and_then(|r| store.get_node(&r.id).ok())
            .and_then(|n| n.name.clone())
            .unwrap_or_else(|| key.clone())
    };
    found
        .into_iter()
        .map(|cycle| cycle.iter().map(label).collect())
        .collect()
}

/// Depth-first search for paths returning to `path[0]`; only nodes greater
/// than the start are expanded so each cycle is found from one start only
fn walk(
    graph: &BTreeMap<String, BTreeSet<String>>,
    current: &str,
    path: &mut Vec<String>,
    found: &mut BTreeSet<Vec<String>>,
) {
    let Some(edges) = graph.get(current) else {
        return;
    };
    for next in edges {
        if *next == path[0] {
            let mut cycle = path.clone();
            cycle.push(next.clone());
            found.insert(cycle);
        } else if *next > path[0] && !path.contains(next) {
            path.push(next.clone());
            walk(graph, next, path, found);
            path.pop();
        }
    }
}

// ===== Import =====

/// Populate the shadow container from the export
///
/// `docs` pairs each manifest entry with its parsed root node. Entries that
/// fail to parse or match are reported and skipped; the rest are first
/// matched or created as shells, then filled.
pub(crate) fn import_components(
    store: &mut Store,
    ctx: &mut ImportContext,
    docs: &[(ComponentEntry, Result<MarkupNode>)],
) {
    let mut shells: Vec<(&ComponentEntry, &MarkupNode, String)> = Vec::new();

    for (entry, doc) in docs {
        let outcome = match doc {
            Ok(root) => ctx
                .atomically(store, |s, c| shell(s, c, entry, root))
                .map(|id| (root, id)),
            Err(err) => Err(err.clone()),
        };
        match outcome {
            Ok((root, id)) => shells.push((entry, root, id)),
            Err(err) => {
                protect_candidate(store, ctx, entry);
                ctx.report.issue(component_issue(&err, entry));
            }
        }
    }

    for (entry, root, id) in shells {
        let filled = ctx.atomically(store, |s, c| fill(s, c, &id, root));
        if let Err(err) = filled {
            ctx.report.issue(component_issue(&err, entry));
        }
    }
}

/// Shared root matching `entry` by key, or by name among components whose
/// key is not in the export
fn candidate(store: &Store, ctx: &ImportContext, entry: &ComponentEntry) -> Option<String> {
    match store.find_by_key(&entry.key) {
        Some(found) if found.kind == EntityKind::Node => Some(found.id.clone()),
        Some(_) => None,
        None => store
            .shadow_components()
            .iter()
            .filter(|id| !ctx.claimed.contains(*id))
            .filter_map(|id| store.get_node(id).ok())
            .find(|n| {
                n.name.is_some()
                    && n.name == entry.name
                    && !ctx.incoming_keys.contains(&n.key)
            })
            .map(|n| n.id.clone()),
    }
}

/// Keep a component that failed to import out of replace-mode deletion
fn protect_candidate(store: &Store, ctx: &mut ImportContext, entry: &ComponentEntry) {
    if let Some(id) = candidate(store, ctx, entry) {
        if store.is_shared_component(&id) {
            ctx.claimed.insert(id);
        }
    }
}

fn shell(
    store: &mut Store,
    ctx: &mut ImportContext,
    entry: &ComponentEntry,
    root: &MarkupNode,
) -> Result<String> {
    if root.directive.key != entry.key {
        return Err(ExError::new(ExErrorKind::StructuralMismatch)
            .with_key(entry.key.clone())
            .with_message(format!(
                "document root carries key {}, manifest says {}",
                root.directive.key, entry.key
            )));
    }
    if matches!(root.kind, MarkupKind::Placement { .. }) {
        return Err(ExError::new(ExErrorKind::StructuralMismatch)
            .with_key(entry.key.clone())
            .with_message("a component root cannot be a placement"));
    }
    let kind = crate::importer::node_kind(store, root)?;
    let id = match candidate(store, ctx, entry) {
        Some(id) if ctx.claimed.contains(&id) => {
            return Err(ExError::new(ExErrorKind::StructuralMismatch)
                .with_key(entry.key.clone())
                .with_message("component listed twice in the export"))
        }
        Some(id) if store.is_shared_component(&id) => {
            if store.get_node(&id)?.key != entry.key {
                store.rekey(&EntityRef::node(&id), &entry.key)?;
            }
            store.get_node_mut(&id)?.kind = kind;
            ctx.report.tally("component").updated += 1;
            id
        }
        Some(id) => {
            return Err(ExError::new(ExErrorKind::StructuralMismatch)
                .with_key(entry.key.clone())
                .with_entity_id(id)
                .with_message("key belongs to a placed node, not a shared component"))
        }
        None => {
            let id = content_ops::create_node(store, kind, Some(entry.key.clone()))?;
            store.add_to_shadow(&id)?;
            ctx.report.tally("component").created += 1;
            id
        }
    };
    ctx.claimed.insert(id.clone());
    Ok(id)
}

fn fill(store: &mut Store, ctx: &mut ImportContext, id: &str, root: &MarkupNode) -> Result<()> {
    if let Some(t) = &root.directive.custom_type {
        if store.type_by_name(t).is_none() {
            return Err(ExError::new(ExErrorKind::UnresolvedSchemaDependency)
                .with_key(root.directive.key.clone())
                .with_message(format!("component type {} is not defined", t)));
        }
    }
    let kind = store.get_node(id)?.kind.clone();
    crate::importer::apply_fields(store, ctx, id, root, kind)?;
    if let MarkupKind::Element { children, .. } = &root.kind {
        reconcile_children(store, ctx, &ParentRef::Node(id.to_string()), children)?;
    }
    Ok(())
}

fn component_issue(err: &ExError, entry: &ComponentEntry) -> Issue {
    let mut issue = Issue::from_error("component", err).with_key(entry.key.clone());
    if let Some(name) = &entry.name {
        issue = issue.with_name(name.clone());
    }
    issue
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_component_cycle_found_once() {
        let mut store = Store::new();
        let a = content_ops::create_shared_component(&mut store, "div", "A").unwrap();
        let b = content_ops::create_shared_component(&mut store, "div", "B").unwrap();
        content_ops::place_component(&mut store, &ParentRef::Node(a.clone()), &b).unwrap();
        content_ops::place_component(&mut store, &ParentRef::Node(b.clone()), &a).unwrap();

        let cycles = component_cycles(&store);

        assert_eq!(cycles.len(), 1);
        let cycle = &cycles[0];
        assert_eq!(cycle.len(), 3);
        assert_eq!(cycle.first(), cycle.last());
        assert!(cycle.contains(&"A".to_string()) && cycle.contains(&"B".to_string()));
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let mut store = Store::new();
        let a = content_ops::create_shared_component(&mut store, "div", "A").unwrap();
        let b = content_ops::create_shared_component(&mut store, "div", "B").unwrap();
        content_ops::place_component(&mut store, &ParentRef::Node(a.clone()), &b).unwrap();

        let graph = component_graph(&store);
        let a_key = store.get_node(&a).unwrap().key.clone();
        let b_key = store.get_node(&b).unwrap().key.clone();

        assert_eq!(graph[&a_key], BTreeSet::from([b_key]));
        assert!(component_cycles(&store).is_empty());
    }

    #[test]
    fn test_self_placement_is_a_cycle() {
        let mut store = Store::new();
        let a = content_ops::create_shared_component(&mut store, "div", "A").unwrap();
        content_ops::place_component(&mut store, &ParentRef::Node(a.clone()), &a).unwrap();

        assert_eq!(component_cycles(&store), vec![vec!["A".to_string(), "A".to_string()]]);
    }
}
