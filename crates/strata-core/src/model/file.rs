use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::security::AccessControl;

/// Folder in the file hierarchy
///
/// `include_in_export` is only consulted on root folders (no parent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub key: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub include_in_export: bool,
    pub custom_type: Option<String>,
    pub access: AccessControl,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    pub fn new(id: String, key: String, name: String, parent_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            key,
            name,
            parent_id,
            include_in_export: false,
            custom_type: None,
            access: AccessControl::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// File with its raw content
///
/// The content bytes travel outside the JSON payload (a BLOB column in the
/// database, a raw file in an export).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub id: String,
    pub key: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub include_in_export: bool,
    pub custom_type: Option<String>,
    pub content_type: Option<String>,
    #[serde(skip)]
    pub content: Vec<u8>,
    pub access: AccessControl,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl File {
    pub fn new(id: String, key: String, name: String, parent_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            key,
            name,
            parent_id,
            include_in_export: false,
            custom_type: None,
            content_type: None,
            content: Vec::new(),
            access: AccessControl::default(),
            created_at: now,
            updated_at: now,
        }
    }
}
