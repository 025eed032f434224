use serde_json::Value;

use super::store::Store;
use crate::errors::{Result, StrataError};
use crate::model::{new_id, new_key, Record};
use crate::schema::flatten;

/// Create a record of a custom type
///
/// # Errors
/// * `TypeNotFound` - If the type does not exist
/// * schema errors if the type does not flatten
pub fn create_record(store: &mut Store, type_name: &str, name: Option<&str>) -> Result<String> {
    flatten(store, type_name)?;
    let id = new_id();
    let mut record = Record::new(id.clone(), new_key(), type_name.to_string());
    record.name = name.map(str::to_string);
    store.insert_record(record)?;
    Ok(id)
}

/// Set a property value, checked against the effective type
///
/// # Errors
/// * `InvalidOperation` - If the type has no such property, or `null` is
///   written to a not-null property
pub fn set_property(store: &mut Store, record_id: &str, property: &str, value: Value) -> Result<()> {
    let type_name = store.get_record(record_id)?.type_name.clone();
    let effective = flatten(store, &type_name)?;
    let declared = effective
        .property(property)
        .ok_or_else(|| StrataError::InvalidOperation {
            reason: format!("type {} has no property '{}'", type_name, property),
        })?;
    if declared.not_null && value.is_null() {
        return Err(StrataError::InvalidOperation {
            reason: format!("property '{}' of {} cannot be null", property, type_name),
        });
    }
    let record = store.get_record_mut(record_id)?;
    record.properties.insert(property.to_string(), value);
    record.updated_at = chrono::Utc::now();
    Ok(())
}

/// # Errors
/// * `RecordNotFound` - If the record does not exist
pub fn delete_record(store: &mut Store, record_id: &str) -> Result<()> {
    let record = store
        .records
        .remove(record_id)
        .ok_or_else(|| StrataError::RecordNotFound {
            record_id: record_id.to_string(),
        })?;
    store.key_index.remove(&record.key);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SchemaProperty;
    use crate::ops::schema_ops::define_type;

    #[test]
    fn test_set_inherited_property() {
        let mut store = Store::new();
        let mut title = SchemaProperty::new("title", "String");
        title.not_null = true;
        define_type(&mut store, "Base", &[], vec![title]).unwrap();
        define_type(&mut store, "Article", &["Base"], vec![]).unwrap();
        let rec = create_record(&mut store, "Article", Some("a1")).unwrap();

        set_property(&mut store, &rec, "title", Value::from("Hello")).unwrap();
        assert!(set_property(&mut store, &rec, "title", Value::Null).is_err());
        assert!(set_property(&mut store, &rec, "missing", Value::from(1)).is_err());
        assert_eq!(
            store.get_record(&rec).unwrap().properties["title"],
            Value::from("Hello")
        );
    }

    #[test]
    fn test_record_of_unknown_type_refused() {
        let mut store = Store::new();
        assert!(create_record(&mut store, "Nope", None).is_err());
    }
}
