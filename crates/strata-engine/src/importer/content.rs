//! Markup trees into content nodes
//!
//! Children of a matched parent are reconciled in order: each incoming node
//! is matched by key (or by tag and name among the parent's old children),
//! moved into its position and overwritten. Old children nothing claimed
//! are detached and deleted at the end of the import.

use strata_core::errors::{ExError, ExErrorKind, StrataError};
use strata_core::model::{DataBinding, EntityKind, EntityRef, NodeKind, ParentRef};
use strata_core::ops::content_ops;
use strata_core::Store;

use super::ImportContext;
use crate::errors::Result;
use crate::format::markup::{MarkupKind, MarkupNode};
use crate::reconcile::{reconcile, Match};
use crate::report::Issue;

enum Resolved {
    /// Write the incoming state into this node
    Apply {
        id: String,
        created: bool,
        kind: NodeKind,
    },
    /// Keep the matched node exactly as it is
    Keep(String),
    Skip,
}

/// Discriminator an incoming node will have once stored
fn discriminator(m: &MarkupNode) -> &str {
    match &m.kind {
        MarkupKind::Element { tag, .. } => tag.as_str(),
        MarkupKind::Text(_) => "#text",
        MarkupKind::Comment(_) => "#comment",
        MarkupKind::Template => "#template",
        MarkupKind::Placement { .. } => "#placement",
    }
}

/// Node kind for an incoming node, resolving placement references
///
/// # Errors
/// Returns `StructuralMismatch` for a placement whose key does not name a
/// shared component in the target.
pub(crate) fn node_kind(store: &Store, m: &MarkupNode) -> Result<NodeKind> {
    Ok(match &m.kind {
        MarkupKind::Element { tag, .. } => NodeKind::Element { tag: tag.clone() },
        MarkupKind::Text(text) => NodeKind::Text { text: text.clone() },
        MarkupKind::Comment(text) => NodeKind::Comment { text: text.clone() },
        MarkupKind::Template => NodeKind::Template {
            content: m.directive.content.clone().unwrap_or_default(),
        },
        MarkupKind::Placement { src } => match store.find_by_key(src) {
            Some(found)
                if found.kind == EntityKind::Node && store.is_shared_component(&found.id) =>
            {
                NodeKind::Placement {
                    component: found.id.clone(),
                }
            }
            _ => {
                return Err(ExError::new(ExErrorKind::StructuralMismatch)
                    .with_key(m.directive.key.clone())
                    .with_message(format!("placement refers to unknown component {}", src)))
            }
        },
    })
}

/// Overwrite a node's kind and deployment attributes with the incoming ones
///
/// Children a non-element kind can no longer own are detached as orphans.
pub(crate) fn apply_fields(
    store: &mut Store,
    ctx: &mut ImportContext,
    id: &str,
    m: &MarkupNode,
    kind: NodeKind,
) -> Result<()> {
    let d = &m.directive;
    let node = store.get_node_mut(id)?;
    node.kind = kind;
    node.name = d.name.clone();
    node.custom_type = d.custom_type.clone();
    node.attributes = match &m.kind {
        MarkupKind::Element { attributes, .. } => attributes.clone(),
        _ => Default::default(),
    };
    node.show_condition = d.show.clone();
    node.hide_condition = d.hide.clone();
    node.show_for_locales = d.show_locales.clone();
    node.hide_for_locales = d.hide_locales.clone();
    node.render_mode = d.render_mode.clone();
    node.binding = d.binding.as_ref().map(|b| DataBinding {
        data_key: b.data_key.clone(),
        query: b.query.clone(),
    });
    node.touch();
    let stale: Vec<String> = if node.kind.accepts_children() {
        Vec::new()
    } else {
        node.children.clone()
    };

    for child in stale {
        content_ops::detach(store, &child)?;
        ctx.orphans.push(child);
    }
    ctx.defer_acl(EntityRef::node(id), &d.key, &d.acl);
    Ok(())
}

/// Make the children of `parent` mirror `incoming`
///
/// Per-node problems are reported and the node skipped; the error returned
/// is one the enclosing entity cannot recover from.
pub(crate) fn reconcile_children(
    store: &mut Store,
    ctx: &mut ImportContext,
    parent: &ParentRef,
    incoming: &[MarkupNode],
) -> Result<()> {
    let old_children: Vec<String> = content_ops::children(store, parent)?.to_vec();
    let mut position = 0;

    for m in incoming {
        let (id, kind) = match resolve(store, ctx, &old_children, m) {
            Ok(Resolved::Skip) => continue,
            Ok(Resolved::Keep(id)) => {
                if place(store, ctx, parent, position, &id, m)? {
                    position += 1;
                }
                continue;
            }
            Ok(Resolved::Apply { id, created, kind }) => {
                if !place(store, ctx, parent, position, &id, m)? {
                    continue;
                }
                let tally = ctx.report.tally("node");
                if created {
                    tally.created += 1;
                } else {
                    tally.updated += 1;
                }
                (id, kind)
            }
            Err(err) => {
                ctx.report.issue(node_issue(&err, m));
                continue;
            }
        };
        position += 1;

        apply_fields(store, ctx, &id, m, kind)?;
        if let MarkupKind::Element { children, .. } = &m.kind {
            reconcile_children(store, ctx, &ParentRef::Node(id), children)?;
        }
    }

    let leftover: Vec<String> = content_ops::children(store, parent)?
        .iter()
        .skip(position)
        .cloned()
        .collect();
    for id in leftover {
        content_ops::detach(store, &id)?;
        ctx.orphans.push(id);
    }
    Ok(())
}

/// Attach `id` at `position`; `false` when the move was refused and reported
fn place(
    store: &mut Store,
    ctx: &mut ImportContext,
    parent: &ParentRef,
    position: usize,
    id: &str,
    m: &MarkupNode,
) -> Result<bool> {
    match content_ops::insert_child(store, parent, position, id) {
        Ok(()) => Ok(true),
        Err(StrataError::CycleDetected { .. }) => {
            ctx.claimed.remove(id);
            ctx.report.issue(node_issue(
                &ExError::new(ExErrorKind::StructuralMismatch)
                    .with_message("node would become its own ancestor"),
                m,
            ));
            Ok(false)
        }
        Err(err) => Err(err.into()),
    }
}

fn resolve(
    store: &mut Store,
    ctx: &mut ImportContext,
    old_children: &[String],
    m: &MarkupNode,
) -> Result<Resolved> {
    let key = m.directive.key.as_str();
    if key.is_empty() {
        return Err(ExError::new(ExErrorKind::StructuralMismatch)
            .with_message("node carries no reconciliation key"));
    }

    let wanted = discriminator(m);
    let name = m.directive.name.as_deref();
    let matched = reconcile(store, EntityKind::Node, key, |s| {
        old_children
            .iter()
            .filter(|id| !ctx.claimed.contains(*id))
            .filter_map(|id| s.get_node(id).ok())
            .find(|n| {
                n.kind.discriminator() == wanted
                    && n.name.as_deref() == name
                    && !ctx.incoming_keys.contains(&n.key)
            })
            .map(|n| n.id.clone())
    })?;

    let existing = match matched {
        Match::Matched { id, .. } => {
            if ctx.claimed.contains(&id) {
                return Err(ExError::new(ExErrorKind::StructuralMismatch)
                    .with_key(key)
                    .with_message("reconciliation key appears twice in the export"));
            }
            if store.is_shared_component(&id) {
                return Err(ExError::new(ExErrorKind::StructuralMismatch)
                    .with_key(key)
                    .with_message("key belongs to a shared component, not a placed node"));
            }
            Some(id)
        }
        Match::NotFound => None,
    };

    if let Some(t) = &m.directive.custom_type {
        if store.type_by_name(t).is_none() {
            ctx.report.issue(node_issue(
                &ExError::new(ExErrorKind::UnresolvedSchemaDependency)
                    .with_message(format!("node type {} is not defined", t)),
                m,
            ));
            return Ok(match existing {
                Some(id) => {
                    ctx.claimed.insert(id.clone());
                    Resolved::Keep(id)
                }
                None => Resolved::Skip,
            });
        }
    }

    // Validates the placement target before anything is created.
    let kind = node_kind(store, m)?;
    let (id, created) = match existing {
        Some(id) => (id, false),
        None => (
            content_ops::create_node(store, kind.clone(), Some(key.to_string()))?,
            true,
        ),
    };
    ctx.claimed.insert(id.clone());
    Ok(Resolved::Apply { id, created, kind })
}

fn node_issue(err: &ExError, m: &MarkupNode) -> Issue {
    let mut issue = Issue::from_error("node", err).with_key(m.directive.key.clone());
    if let Some(name) = &m.directive.name {
        issue = issue.with_name(name.clone());
    }
    issue
}
