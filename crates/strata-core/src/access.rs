//! Effective permission evaluation
//!
//! A principal's permissions on an entity are the union of: full rights when
//! it (or a group it belongs to) owns the entity, grants on the entity, and
//! schema-level grants on the entity's type and every ancestor of that type.

use crate::errors::Result;
use crate::model::{EntityKind, EntityRef, Grant, Permissions, Subject};
use crate::ops::principal_ops::group_closure;
use crate::ops::Store;
use crate::schema::flatten;

/// Schema type name every entity of a built-in kind belongs to
pub fn builtin_type_name(kind: EntityKind) -> Option<&'static str> {
    match kind {
        EntityKind::Page => Some("Page"),
        EntityKind::File => Some("File"),
        EntityKind::Folder => Some("Folder"),
        EntityKind::Node => Some("DOMNode"),
        _ => None,
    }
}

fn custom_type_of(store: &Store, entity: &EntityRef) -> Option<String> {
    match entity.kind {
        EntityKind::Node => store.get_node(&entity.id).ok()?.custom_type.clone(),
        EntityKind::Page => store.get_page(&entity.id).ok()?.custom_type.clone(),
        EntityKind::Folder => store.get_folder(&entity.id).ok()?.custom_type.clone(),
        EntityKind::File => store.get_file(&entity.id).ok()?.custom_type.clone(),
        EntityKind::Record => Some(store.get_record(&entity.id).ok()?.type_name.clone()),
        _ => None,
    }
}

/// Schema grants that apply to an entity through its type hierarchy
pub fn schema_grants(store: &Store, entity: &EntityRef) -> Vec<Grant> {
    let mut type_names: Vec<String> = Vec::new();
    if let Some(builtin) = builtin_type_name(entity.kind) {
        type_names.push(builtin.to_string());
    }
    if let Some(custom) = custom_type_of(store, entity) {
        match flatten(store, &custom) {
            Ok(eff) => type_names.extend(eff.lineage),
            Err(_) => type_names.push(custom),
        }
    }

    let mut grants = Vec::new();
    for name in type_names {
        if let Some(t) = store.type_by_name(&name) {
            grants.extend(t.grants.iter().cloned());
        }
    }
    grants
}

/// Union of every permission `principal_id` holds on `entity`
///
/// # Errors
/// Returns lookup errors for missing or unsecurable entities.
pub fn effective_permissions(
    store: &Store,
    principal_id: &str,
    entity: &EntityRef,
) -> Result<Permissions> {
    let acl = store.access(entity)?;
    let closure = group_closure(store, principal_id);
    let holds = |subject: &Subject| match subject {
        Subject::Resolved { principal_id } => closure.contains(principal_id),
        Subject::Unresolved { .. } => false,
    };

    if acl.owner.as_ref().map(holds).unwrap_or(false) {
        return Ok(Permissions::FULL);
    }

    let mut perms = Permissions::NONE;
    for grant in acl.grants.iter().chain(schema_grants(store, entity).iter()) {
        if holds(&grant.subject) {
            perms = perms.union(grant.permissions);
        }
    }
    Ok(perms)
}

/// Whether the principal holds every permission in `required`
///
/// # Errors
/// Same as [`effective_permissions`].
pub fn can(
    store: &Store,
    principal_id: &str,
    entity: &EntityRef,
    required: Permissions,
) -> Result<bool> {
    Ok(effective_permissions(store, principal_id, entity)?.contains(required))
}

/// Read visibility for an anonymous (`None`) or authenticated principal
///
/// # Errors
/// Same as [`effective_permissions`].
pub fn is_visible_to(store: &Store, principal_id: Option<&str>, entity: &EntityRef) -> Result<bool> {
    let acl = store.access(entity)?;
    if acl.visibility.public {
        return Ok(true);
    }
    match principal_id {
        None => Ok(false),
        Some(_) if acl.visibility.authenticated => Ok(true),
        Some(id) => can(store, id, entity, Permissions::READ),
    }
}
