//! Schema phase
//!
//! Types are applied base-first inside one transaction. Any failure
//! (conflicting inheritance, unknown base, unparseable grant) aborts the
//! whole import with the store unchanged.
//!
//! A type that must take a name another local type holds gets it: a holder
//! that is itself in the export is parked under a temporary name until its
//! own document is applied, any other holder is renamed aside and reported.

use std::collections::{BTreeMap, BTreeSet};

use strata_core::errors::{ExError, ExErrorKind, StrataError};
use strata_core::model::{new_id, EntityKind, SchemaMethod, SchemaProperty, SchemaType, SchemaView};
use strata_core::ops::schema_ops;
use strata_core::Store;

use super::ImportContext;
use crate::errors::Result;
use crate::format::manifest::SchemaDoc;
use crate::reconcile::{reconcile, Match};
use crate::report::Issue;

pub(crate) fn import_schema(
    store: &mut Store,
    ctx: &mut ImportContext,
    docs: &[SchemaDoc],
) -> Result<()> {
    if docs.is_empty() {
        return Ok(());
    }
    let ordered = base_first(docs)?;
    let warnings = ctx.report.issues.len();
    let outcome = ctx.atomically(store, |s, c| {
        for doc in ordered {
            apply_type(s, c, doc).map_err(|e| e.with_key(doc.key.clone()))?;
        }
        Ok(())
    });
    if outcome.is_err() {
        // Displacements were rolled back with the rest of the phase.
        ctx.report.issues.truncate(warnings);
    }
    outcome
}

/// Documents ordered so every incoming base precedes its subtypes
///
/// # Errors
/// Returns `ConflictingInheritance` when the incoming bases form a cycle.
fn base_first(docs: &[SchemaDoc]) -> Result<Vec<&SchemaDoc>> {
    let by_name: BTreeMap<&str, &SchemaDoc> =
        docs.iter().map(|d| (d.name.as_str(), d)).collect();
    let mut done: BTreeSet<&str> = BTreeSet::new();
    let mut ordered = Vec::with_capacity(docs.len());

    while ordered.len() < by_name.len() {
        let ready: Vec<&str> = by_name
            .iter()
            .filter(|(name, _)| !done.contains(*name))
            .filter(|(_, doc)| {
                doc.bases
                    .iter()
                    .all(|b| done.contains(b.as_str()) || !by_name.contains_key(b.as_str()))
            })
            .map(|(name, _)| *name)
            .collect();
        if ready.is_empty() {
            let stuck = by_name
                .keys()
                .find(|n| !done.contains(*n))
                .copied()
                .unwrap_or_default();
            return Err(ExError::from(StrataError::InheritanceCycle {
                type_name: stuck.to_string(),
            })
            .with_op("import_schema"));
        }
        for name in ready {
            done.insert(name);
            if let Some(doc) = by_name.get(name) {
                ordered.push(*doc);
            }
        }
    }
    Ok(ordered)
}

fn apply_type(store: &mut Store, ctx: &mut ImportContext, doc: &SchemaDoc) -> Result<()> {
    let grants = ctx.resolver.grants_from_doc(store, &doc.grants)?;
    let incoming = &ctx.incoming_keys;
    let matched = reconcile(store, EntityKind::SchemaType, &doc.key, |s| {
        s.type_by_name(&doc.name)
            .filter(|t| !incoming.contains(&t.key))
            .map(|t| t.id.clone())
    })?;

    let properties: Vec<SchemaProperty> = doc
        .properties
        .iter()
        .map(|p| {
            let mut property = SchemaProperty::new(&p.name, &p.property_type);
            property.default_value = p.default.clone();
            property.format = p.format.clone();
            property.not_null = p.not_null;
            property.unique = p.unique;
            property
        })
        .collect();
    let methods: Vec<SchemaMethod> = doc
        .methods
        .iter()
        .map(|m| SchemaMethod {
            name: m.name.clone(),
            source: m.source.clone(),
            is_static: m.is_static,
        })
        .collect();
    let views: Vec<SchemaView> = doc
        .views
        .iter()
        .map(|v| {
            let mut view = SchemaView::new(&v.name);
            view.members = v.members.clone();
            view.order = v.order.clone();
            view
        })
        .collect();

    match matched {
        Match::Matched { id, .. } => {
            let current = store.get_type(&id)?.name.clone();
            if current != doc.name {
                clear_type_name(store, ctx, &doc.name, Some(&id))?;
                schema_ops::rename_type(store, &current, &doc.name)?;
            }
            schema_ops::modify_type(store, &doc.name, |t| {
                t.bases = doc.bases.clone();
                t.properties = properties;
                t.methods = methods;
                t.views = views;
                t.grants = grants;
                Ok(())
            })?;
            ctx.claimed.insert(id);
            ctx.report.tally("schema_type").updated += 1;
        }
        Match::NotFound => {
            clear_type_name(store, ctx, &doc.name, None)?;
            let mut t = SchemaType::new(new_id(), doc.key.clone(), doc.name.clone());
            t.bases = doc.bases.clone();
            t.properties = properties;
            t.methods = methods;
            t.views = views;
            t.grants = grants;
            let id = schema_ops::insert_type_checked(store, t)?;
            ctx.claimed.insert(id);
            ctx.report.tally("schema_type").created += 1;
        }
    }
    Ok(())
}

/// Make `name` free for the type `owner` (a new type when `None`)
fn clear_type_name(
    store: &mut Store,
    ctx: &mut ImportContext,
    name: &str,
    owner: Option<&str>,
) -> Result<()> {
    let Some(holder) = store
        .type_by_name(name)
        .filter(|t| Some(t.id.as_str()) != owner)
    else {
        return Ok(());
    };
    let holder_key = holder.key.clone();

    if ctx.incoming_keys.contains(&holder_key) {
        let parked = schema_ops::free_type_name(store, &format!("{}_renaming", name));
        schema_ops::rename_type(store, name, &parked)?;
        return Ok(());
    }

    let displaced = schema_ops::free_type_name(store, &format!("{}_local", name));
    schema_ops::rename_type(store, name, &displaced)?;
    ctx.report.warn(
        Issue::new(
            ExErrorKind::StructuralMismatch,
            "schema_type",
            format!(
                "local type {} is not in the export and was renamed to {}",
                name, displaced
            ),
        )
        .with_key(holder_key)
        .with_name(displaced),
    );
    Ok(())
}
