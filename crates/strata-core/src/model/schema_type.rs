use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::security::Grant;

/// Property declared on a schema type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaProperty {
    pub name: String,
    /// Type expression, e.g. `String`, `Integer`, `Article[]`
    pub property_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl SchemaProperty {
    pub fn new(name: impl Into<String>, property_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            property_type: property_type.into(),
            default_value: None,
            not_null: false,
            unique: false,
            format: None,
        }
    }
}

/// Method declared on a schema type; the source is opaque script text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMethod {
    pub name: String,
    pub source: String,
    #[serde(default)]
    pub is_static: bool,
}

/// Named projection of a type's properties
///
/// An empty `members` list selects every effective property. `order`, when
/// set, overrides the default `id, type, name, members...` ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaView {
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Vec<String>>,
}

impl SchemaView {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            order: None,
        }
    }
}

/// Custom type definition with multiple inheritance
///
/// Holds only the members declared on this type; the effective type is
/// computed by `schema::flatten`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaType {
    pub id: String,
    pub key: String,
    pub name: String,
    /// Base type names in declaration order
    pub bases: Vec<String>,
    pub properties: Vec<SchemaProperty>,
    pub methods: Vec<SchemaMethod>,
    pub views: Vec<SchemaView>,
    /// Grants applying to every instance of this type and its subtypes
    pub grants: Vec<Grant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SchemaType {
    pub fn new(id: String, key: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            key,
            name,
            bases: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            views: Vec::new(),
            grants: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn view(&self, name: &str) -> Option<&SchemaView> {
        self.views.iter().find(|v| v.name == name)
    }

    pub fn property(&self, name: &str) -> Option<&SchemaProperty> {
        self.properties.iter().find(|p| p.name == name)
    }
}
