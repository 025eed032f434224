//! Schema type authoring
//!
//! Every change is validated by flattening the changed type and all of its
//! subtypes; a change that breaks any of them is rolled back.

use super::store::Store;
use crate::errors::{Result, StrataError};
use crate::model::{new_id, new_key, SchemaMethod, SchemaProperty, SchemaType, SchemaView};
use crate::schema::{flatten, subtypes_of};

/// Define a new type with its bases and declared properties
///
/// # Errors
/// * `InvalidName` - If the name is not an identifier
/// * `DuplicateName` - If a type with that name exists
/// * `UnknownBaseType`, `InheritanceCycle`, `ConflictingInheritance` - The
///   type is not created
pub fn define_type(
    store: &mut Store,
    name: &str,
    bases: &[&str],
    properties: Vec<SchemaProperty>,
) -> Result<String> {
    let mut t = SchemaType::new(new_id(), new_key(), name.to_string());
    t.bases = bases.iter().map(|b| b.to_string()).collect();
    t.properties = properties;
    insert_type_checked(store, t)
}

/// Insert a fully built type after validating its name and inheritance
///
/// # Errors
/// Same as [`define_type`].
pub fn insert_type_checked(store: &mut Store, t: SchemaType) -> Result<String> {
    validate_type_name(&t.name)?;
    if store.type_by_name(&t.name).is_some() {
        return Err(StrataError::DuplicateName {
            name: t.name.clone(),
            scope: "schema".to_string(),
        });
    }
    let id = t.id.clone();
    let name = t.name.clone();
    store.insert_type(t)?;
    if let Err(err) = flatten(store, &name) {
        store.remove_type_entry(&id);
        return Err(err);
    }
    Ok(id)
}

/// Apply `change` to a type, keeping it only if the type and its subtypes
/// still flatten
///
/// # Errors
/// * `TypeNotFound` - If the type does not exist
/// * any error returned by `change` or by flattening
pub fn modify_type<F>(store: &mut Store, type_name: &str, change: F) -> Result<()>
where
    F: FnOnce(&mut SchemaType) -> Result<()>,
{
    let id = store.require_type(type_name)?.id.clone();
    let dependents = subtypes_of(store, type_name);
    let snapshot = store.get_type(&id)?.clone();

    let outcome = change(store.get_type_mut(&id)?).and_then(|_| {
        let current = store.get_type(&id)?.name.clone();
        flatten(store, &current)?;
        for dependent in dependents.iter().filter(|d| *d != type_name) {
            flatten(store, dependent)?;
        }
        Ok(())
    });

    match outcome {
        Ok(()) => {
            store.get_type_mut(&id)?.updated_at = chrono::Utc::now();
            Ok(())
        }
        Err(err) => {
            *store.get_type_mut(&id)? = snapshot;
            Err(err)
        }
    }
}

/// Add or replace a declared property
///
/// # Errors
/// Same as [`modify_type`].
pub fn add_property(store: &mut Store, type_name: &str, property: SchemaProperty) -> Result<()> {
    modify_type(store, type_name, |t| {
        match t.properties.iter_mut().find(|p| p.name == property.name) {
            Some(existing) => *existing = property,
            None => t.properties.push(property),
        }
        Ok(())
    })
}

/// Add or replace a declared method
///
/// # Errors
/// Same as [`modify_type`].
pub fn add_method(store: &mut Store, type_name: &str, method: SchemaMethod) -> Result<()> {
    modify_type(store, type_name, |t| {
        match t.methods.iter_mut().find(|m| m.name == method.name) {
            Some(existing) => *existing = method,
            None => t.methods.push(method),
        }
        Ok(())
    })
}

/// Add or replace a declared view
///
/// # Errors
/// Same as [`modify_type`].
pub fn set_view(store: &mut Store, type_name: &str, view: SchemaView) -> Result<()> {
    modify_type(store, type_name, |t| {
        match t.views.iter_mut().find(|v| v.name == view.name) {
            Some(existing) => *existing = view,
            None => t.views.push(view),
        }
        Ok(())
    })
}

/// Set or clear the custom column order of a view
///
/// Declares the view on this type when only a base declares it.
///
/// # Errors
/// Same as [`modify_type`].
pub fn set_view_order(
    store: &mut Store,
    type_name: &str,
    view_name: &str,
    order: Option<Vec<String>>,
) -> Result<()> {
    modify_type(store, type_name, |t| {
        match t.views.iter_mut().find(|v| v.name == view_name) {
            Some(existing) => existing.order = order,
            None => {
                let mut view = SchemaView::new(view_name);
                view.order = order;
                t.views.push(view);
            }
        }
        Ok(())
    })
}

/// Delete a type that no other type inherits from
///
/// # Errors
/// * `TypeNotFound` - If the type does not exist
/// * `InvalidOperation` - If subtypes or records still depend on it
pub fn delete_type(store: &mut Store, type_name: &str) -> Result<()> {
    let id = store.require_type(type_name)?.id.clone();
    if let Some(sub) = store
        .list_types()
        .into_iter()
        .find(|t| t.bases.iter().any(|b| b == type_name))
    {
        return Err(StrataError::InvalidOperation {
            reason: format!("type {} is a base of {}", type_name, sub.name),
        });
    }
    if store.records.values().any(|r| r.type_name == type_name) {
        return Err(StrataError::InvalidOperation {
            reason: format!("records of type {} exist", type_name),
        });
    }
    store.remove_type_entry(&id);
    Ok(())
}

/// Rename a type and every reference to it
///
/// Bases of other types, records and the custom type of content, folders
/// and files follow the new name.
///
/// # Errors
/// * `TypeNotFound` - If the type does not exist
/// * `InvalidName` - If the new name is not an identifier
/// * `DuplicateName` - If another type already uses the new name
pub fn rename_type(store: &mut Store, type_name: &str, new_name: &str) -> Result<()> {
    let id = store.require_type(type_name)?.id.clone();
    if type_name == new_name {
        return Ok(());
    }
    validate_type_name(new_name)?;
    if store.type_by_name(new_name).is_some() {
        return Err(StrataError::DuplicateName {
            name: new_name.to_string(),
            scope: "schema".to_string(),
        });
    }

    let follow = |slot: &mut Option<String>| {
        if slot.as_deref() == Some(type_name) {
            *slot = Some(new_name.to_string());
        }
    };
    for t in store.types.values_mut() {
        for base in t.bases.iter_mut().filter(|b| *b == type_name) {
            *base = new_name.to_string();
        }
    }
    for r in store.records.values_mut().filter(|r| r.type_name == type_name) {
        r.type_name = new_name.to_string();
    }
    store.nodes.values_mut().for_each(|n| follow(&mut n.custom_type));
    store.pages.values_mut().for_each(|p| follow(&mut p.custom_type));
    store.folders.values_mut().for_each(|f| follow(&mut f.custom_type));
    store.files.values_mut().for_each(|f| follow(&mut f.custom_type));

    let t = store.get_type_mut(&id)?;
    t.name = new_name.to_string();
    t.updated_at = chrono::Utc::now();
    Ok(())
}

/// First of `stem`, `stem2`, `stem3`, ... that no type uses
pub fn free_type_name(store: &Store, stem: &str) -> String {
    let mut candidate = stem.to_string();
    let mut n = 2;
    while store.type_by_name(&candidate).is_some() {
        candidate = format!("{}{}", stem, n);
        n += 1;
    }
    candidate
}

fn validate_type_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .map(|c| c.is_ascii_alphabetic())
        .unwrap_or(false)
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StrataError::InvalidName {
            reason: format!("'{}' is not a valid type name", name),
        })
    }
}
