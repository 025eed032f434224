//! Principals, memberships and entity-level security
//!
//! Principals are identified across environments by name. Owners and grants
//! naming a principal that does not exist yet are stored as unresolved
//! markers and bound as soon as the principal is created.

use std::collections::{BTreeSet, HashSet};

use super::store::Store;
use crate::errors::{Result, StrataError};
use crate::model::{
    new_id, new_key, EntityRef, Grant, Permissions, Principal, PrincipalKind, Subject, Visibility,
};

/// Create a principal and bind every pending marker bearing its name
///
/// Returns the new principal id.
///
/// # Errors
/// * `InvalidName` - If the name is empty
/// * `DuplicateName` - If a principal with that name exists
pub fn create_principal(store: &mut Store, name: &str, kind: PrincipalKind) -> Result<String> {
    if name.trim().is_empty() {
        return Err(StrataError::InvalidName {
            reason: "Principal name cannot be empty".to_string(),
        });
    }
    if store.principal_by_name(name).is_some() {
        return Err(StrataError::DuplicateName {
            name: name.to_string(),
            scope: "principals".to_string(),
        });
    }
    let id = new_id();
    store.insert_principal(Principal::new(id.clone(), new_key(), name.to_string(), kind))?;

    let bound = bind_pending(store, name, &id);
    tracing::debug!(principal = name, bound, "bound pending principal markers");
    Ok(id)
}

fn bind_pending(store: &mut Store, name: &str, principal_id: &str) -> usize {
    let mut bound = 0;
    for entity in store.securables() {
        if let Ok(acl) = store.access_mut(&entity) {
            bound += acl.bind_pending(name, principal_id);
        }
    }
    let target = Subject::unresolved(name);
    for t in store.types.values_mut() {
        for grant in t.grants.iter_mut().filter(|g| g.subject == target) {
            grant.subject = Subject::resolved(principal_id);
            bound += 1;
        }
    }
    bound
}

/// Add `member_id` to group `group_id`
///
/// # Errors
/// * `InvalidOperation` - If `group_id` is not a group
/// * `CycleDetected` - If the group is (transitively) a member of `member_id`
pub fn add_member(store: &mut Store, member_id: &str, group_id: &str) -> Result<()> {
    let group = store.get_principal(group_id)?;
    if !group.is_group() {
        return Err(StrataError::InvalidOperation {
            reason: format!("{} is not a group", group.name),
        });
    }
    store.get_principal(member_id)?;
    if member_id == group_id || group_closure(store, group_id).contains(member_id) {
        return Err(StrataError::CycleDetected {
            node_id: member_id.to_string(),
        });
    }
    let member = store.get_principal_mut(member_id)?;
    if !member.member_of.iter().any(|g| g == group_id) {
        member.member_of.push(group_id.to_string());
    }
    Ok(())
}

/// # Errors
/// * `PrincipalNotFound` - If the member does not exist
pub fn remove_member(store: &mut Store, member_id: &str, group_id: &str) -> Result<()> {
    store
        .get_principal_mut(member_id)?
        .member_of
        .retain(|g| g != group_id);
    Ok(())
}

/// The principal itself plus every group it belongs to, transitively
pub fn group_closure(store: &Store, principal_id: &str) -> HashSet<String> {
    let mut seen = HashSet::new();
    let mut stack = vec![principal_id.to_string()];
    while let Some(id) = stack.pop() {
        if !seen.insert(id.clone()) {
            continue;
        }
        if let Ok(p) = store.get_principal(&id) {
            stack.extend(p.member_of.iter().cloned());
        }
    }
    seen
}

/// Subject for a principal name: resolved when it exists, a marker otherwise
pub fn subject_for_name(store: &Store, name: &str) -> Subject {
    match store.principal_by_name(name) {
        Some(p) => Subject::resolved(&p.id),
        None => Subject::unresolved(name),
    }
}

/// Display name of a subject
///
/// Resolved subjects whose principal has vanished render as `None`.
pub fn subject_name<'a>(store: &'a Store, subject: &'a Subject) -> Option<&'a str> {
    match subject {
        Subject::Resolved { principal_id } => store
            .get_principal(principal_id)
            .ok()
            .map(|p| p.name.as_str()),
        Subject::Unresolved { name } => Some(name),
    }
}

/// Unresolved marker names still pending in the store, sorted
pub fn pending_names(store: &Store) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for entity in store.securables() {
        if let Ok(acl) = store.access(&entity) {
            let subjects = acl
                .owner
                .iter()
                .chain(acl.grants.iter().map(|g| &g.subject));
            for subject in subjects {
                if let Subject::Unresolved { name } = subject {
                    names.insert(name.clone());
                }
            }
        }
    }
    for t in store.types.values() {
        for g in &t.grants {
            if let Subject::Unresolved { name } = &g.subject {
                names.insert(name.clone());
            }
        }
    }
    names
}

/// Grant permissions on an entity, merging with an existing grant
///
/// # Errors
/// * `InvalidOperation` - If the entity carries no access control
pub fn grant(
    store: &mut Store,
    entity: &EntityRef,
    subject: Subject,
    permissions: Permissions,
) -> Result<()> {
    store.access_mut(entity)?.add_grant(subject, permissions);
    Ok(())
}

/// # Errors
/// * `InvalidOperation` - If the entity carries no access control
pub fn revoke(store: &mut Store, entity: &EntityRef, subject: &Subject) -> Result<()> {
    store.access_mut(entity)?.revoke(subject);
    Ok(())
}

/// # Errors
/// * `InvalidOperation` - If the entity carries no access control
pub fn set_owner(store: &mut Store, entity: &EntityRef, owner: Option<Subject>) -> Result<()> {
    store.access_mut(entity)?.owner = owner;
    Ok(())
}

/// # Errors
/// * `InvalidOperation` - If the entity carries no access control
pub fn set_visibility(store: &mut Store, entity: &EntityRef, visibility: Visibility) -> Result<()> {
    store.access_mut(entity)?.visibility = visibility;
    Ok(())
}

/// Grant permissions on every instance of a schema type and its subtypes
///
/// # Errors
/// * `TypeNotFound` - If the type does not exist
pub fn grant_on_type(
    store: &mut Store,
    type_name: &str,
    subject: Subject,
    permissions: Permissions,
) -> Result<()> {
    let id = store.require_type(type_name)?.id.clone();
    let t = store.get_type_mut(&id)?;
    match t.grants.iter_mut().find(|g| g.subject == subject) {
        Some(existing) => existing.permissions = existing.permissions.union(permissions),
        None => t.grants.push(Grant::new(subject, permissions)),
    }
    Ok(())
}
