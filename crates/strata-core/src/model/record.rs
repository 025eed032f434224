use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::security::AccessControl;

/// Data instance of a custom schema type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub key: String,
    pub type_name: String,
    pub name: Option<String>,
    pub properties: BTreeMap<String, serde_json::Value>,
    pub access: AccessControl,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn new(id: String, key: String, type_name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            key,
            type_name,
            name: None,
            properties: BTreeMap::new(),
            access: AccessControl::default(),
            created_at: now,
            updated_at: now,
        }
    }
}
