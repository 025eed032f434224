//! View ordering and record projection
//!
//! A view's columns default to `id`, `type`, `name`, then its members in
//! declaration order. A custom order puts the listed columns first and keeps
//! the rest in default order; it is inherited by subtypes unless overridden.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use super::inheritance::{flatten, EffectiveType};
use crate::errors::{Result, StrataError};
use crate::model::Record;
use crate::ops::Store;

/// View every type has even when it declares none
pub const DEFAULT_VIEW: &str = "public";

const BUILTIN_COLUMNS: [&str; 3] = ["id", "type", "name"];

/// Ordered column names of a view on an effective type
///
/// # Errors
/// * `ViewNotFound` - If the view is neither declared nor the default view
pub fn view_columns(effective: &EffectiveType, view_name: &str) -> Result<Vec<String>> {
    let declared = effective.view(view_name);
    if declared.is_none() && view_name != DEFAULT_VIEW {
        return Err(StrataError::ViewNotFound {
            type_name: effective.name.clone(),
            view: view_name.to_string(),
        });
    }

    let members: Vec<String> = match declared {
        Some(v) if !v.members.is_empty() => v.members.clone(),
        _ => effective.properties.iter().map(|p| p.name.clone()).collect(),
    };

    let mut default_order: Vec<String> = BUILTIN_COLUMNS.iter().map(|c| c.to_string()).collect();
    for m in members {
        if !default_order.contains(&m) {
            default_order.push(m);
        }
    }

    let Some(custom) = declared.and_then(|v| v.order.as_ref()) else {
        return Ok(default_order);
    };

    let mut columns: Vec<String> = Vec::with_capacity(default_order.len());
    for name in custom {
        if default_order.contains(name) && !columns.contains(name) {
            columns.push(name.clone());
        }
    }
    for name in default_order {
        if !columns.contains(&name) {
            columns.push(name);
        }
    }
    Ok(columns)
}

/// A record reduced to the columns of one view, in view order
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRecord {
    pub fields: Vec<(String, Value)>,
}

impl ProjectedRecord {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    pub fn columns(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }
}

impl Serialize for ProjectedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

fn project(record: &Record, effective: &EffectiveType, columns: &[String]) -> ProjectedRecord {
    let fields = columns
        .iter()
        .map(|column| {
            let value = match column.as_str() {
                "id" => Value::String(record.id.clone()),
                "type" => Value::String(record.type_name.clone()),
                "name" => record
                    .name
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
                other => record
                    .properties
                    .get(other)
                    .cloned()
                    .or_else(|| {
                        effective
                            .property(other)
                            .and_then(|p| p.default_value.clone())
                            .map(Value::String)
                    })
                    .unwrap_or(Value::Null),
            };
            (column.clone(), value)
        })
        .collect();
    ProjectedRecord { fields }
}

/// Project one record through a view of its own type
///
/// # Errors
/// * `RecordNotFound` - If the record does not exist
/// * schema errors from [`flatten`] and [`view_columns`]
pub fn project_record(store: &Store, record_id: &str, view_name: &str) -> Result<ProjectedRecord> {
    let record = store.get_record(record_id)?;
    let effective = flatten(store, &record.type_name)?;
    let columns = view_columns(&effective, view_name)?;
    Ok(project(record, &effective, &columns))
}

/// Records of a type and its subtypes, projected through the type's view, sorted by id
///
/// # Errors
/// Schema errors from [`flatten`] and [`view_columns`].
pub fn query_records(
    store: &Store,
    type_name: &str,
    view_name: &str,
) -> Result<Vec<ProjectedRecord>> {
    let effective = flatten(store, type_name)?;
    let columns = view_columns(&effective, view_name)?;

    let mut out = Vec::new();
    for record in store.list_records() {
        let matches = record.type_name == type_name
            || flatten(store, &record.type_name)
                .map(|eff| eff.is_a(type_name))
                .unwrap_or(false);
        if matches {
            out.push(project(record, &effective, &columns));
        }
    }
    Ok(out)
}

/// JSON object of a record with keys in view order
///
/// # Errors
/// Same as [`project_record`].
pub fn record_to_json(store: &Store, record_id: &str, view_name: &str) -> Result<String> {
    let projected = project_record(store, record_id, view_name)?;
    Ok(serde_json::to_string(&projected)?)
}

/// Plain-text rendering, one `column: value` line per column in view order
///
/// # Errors
/// Same as [`project_record`].
pub fn render_record(store: &Store, record_id: &str, view_name: &str) -> Result<String> {
    let projected = project_record(store, record_id, view_name)?;
    let lines: Vec<String> = projected
        .fields
        .iter()
        .map(|(name, value)| match value {
            Value::String(s) => format!("{}: {}", name, s),
            Value::Null => format!("{}:", name),
            other => format!("{}: {}", name, other),
        })
        .collect();
    Ok(lines.join("\n"))
}
