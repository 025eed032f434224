//! Per-placement instance expansion
//!
//! A page that places the same shared component twice gets two independent
//! instances, each with its own path and evaluation counter. The component
//! is stored once; only the expansion is duplicated.

use crate::errors::Result;
use crate::ops::Store;

/// One placement of a shared component inside an expanded page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub component_id: String,
    pub placement_id: String,
    /// Placement ids from the page down to this instance, joined by `/`
    pub path: String,
    /// Instance this one is nested in
    pub parent: Option<usize>,
    pub counter: u64,
}

/// A node occurrence in the expanded tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedNode {
    pub node_id: String,
    pub depth: usize,
    /// Index into `Expansion::instances` of the enclosing instance
    pub instance: Option<usize>,
    /// Placement that was not expanded because its component is already on the path
    pub cycle: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Depth-first node occurrences
    pub nodes: Vec<ExpandedNode>,
    pub instances: Vec<Instance>,
}

impl Expansion {
    /// Advance and return the evaluation counter of one instance
    pub fn next_count(&mut self, instance: usize) -> Option<u64> {
        let slot = self.instances.get_mut(instance)?;
        slot.counter += 1;
        Some(slot.counter)
    }

    /// Instances of a given component in expansion order
    pub fn instances_of(&self, component_id: &str) -> Vec<&Instance> {
        self.instances
            .iter()
            .filter(|i| i.component_id == component_id)
            .collect()
    }
}

/// Expand a page, duplicating each placed component per placement
///
/// # Errors
///
/// Returns lookup errors for dangling node references.
pub fn expand_page(store: &Store, page_id: &str) -> Result<Expansion> {
    let page = store.get_page(page_id)?;
    let mut expansion = Expansion::default();
    let mut on_path: Vec<String> = Vec::new();
    for child in &page.children {
        expand_node(store, child, 0, None, "", &mut on_path, &mut expansion)?;
    }
    Ok(expansion)
}

fn expand_node(
    store: &Store,
    node_id: &str,
    depth: usize,
    instance: Option<usize>,
    path: &str,
    on_path: &mut Vec<String>,
    expansion: &mut Expansion,
) -> Result<()> {
    let node = store.get_node(node_id)?;
    let Some(component) = node.placement_target() else {
        expansion.nodes.push(ExpandedNode {
            node_id: node_id.to_string(),
            depth,
            instance,
            cycle: false,
        });
        for child in &node.children {
            expand_node(store, child, depth + 1, instance, path, on_path, expansion)?;
        }
        return Ok(());
    };

    let cycle = on_path.iter().any(|c| c == component);
    expansion.nodes.push(ExpandedNode {
        node_id: node_id.to_string(),
        depth,
        instance,
        cycle,
    });
    if cycle {
        return Ok(());
    }

    let instance_path = if path.is_empty() {
        node_id.to_string()
    } else {
        format!("{}/{}", path, node_id)
    };
    expansion.instances.push(Instance {
        component_id: component.to_string(),
        placement_id: node_id.to_string(),
        path: instance_path.clone(),
        parent: instance,
        counter: 0,
    });
    let index = expansion.instances.len() - 1;

    on_path.push(component.to_string());
    let result = expand_node(
        store,
        component,
        depth + 1,
        Some(index),
        &instance_path,
        on_path,
        expansion,
    );
    on_path.pop();
    result
}
