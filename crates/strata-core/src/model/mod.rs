//! Domain model of the deployable content graph
//!
//! Every exportable entity carries two identities: `id`, assigned by the
//! store that holds it and different in every environment, and `key`, the
//! reconciliation key minted once and carried through every export and
//! import of the same logical entity.

pub mod artifact;
pub mod file;
pub mod node;
pub mod page;
pub mod principal;
pub mod record;
pub mod schema_type;
pub mod security;

pub use artifact::{Localization, MailTemplate};
pub use file::{File, Folder};
pub use node::{ContentNode, DataBinding, NodeKind, ParentRef};
pub use page::{Page, PathParameter, PathTemplate};
pub use principal::{Principal, PrincipalKind};
pub use record::Record;
pub use schema_type::{SchemaMethod, SchemaProperty, SchemaType, SchemaView};
pub use security::{AccessControl, Grant, Permissions, Subject, Visibility};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mint a store-assigned primary key (UUID v7, time ordered)
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Mint a reconciliation key (UUID v4, carries no ordering information)
pub fn new_key() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Kind discriminator for entities addressable by reconciliation key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Node,
    Page,
    Folder,
    File,
    SchemaType,
    Record,
    MailTemplate,
    Localization,
    Principal,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Node => "node",
            EntityKind::Page => "page",
            EntityKind::Folder => "folder",
            EntityKind::File => "file",
            EntityKind::SchemaType => "schema_type",
            EntityKind::Record => "record",
            EntityKind::MailTemplate => "mail_template",
            EntityKind::Localization => "localization",
            EntityKind::Principal => "principal",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed reference to an entity by store id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn node(id: impl Into<String>) -> Self {
        Self::new(EntityKind::Node, id)
    }

    pub fn page(id: impl Into<String>) -> Self {
        Self::new(EntityKind::Page, id)
    }

    pub fn folder(id: impl Into<String>) -> Self {
        Self::new(EntityKind::Folder, id)
    }

    pub fn file(id: impl Into<String>) -> Self {
        Self::new(EntityKind::File, id)
    }

    pub fn schema_type(id: impl Into<String>) -> Self {
        Self::new(EntityKind::SchemaType, id)
    }

    pub fn record(id: impl Into<String>) -> Self {
        Self::new(EntityKind::Record, id)
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_and_keys_are_distinct_spaces() {
        let id = new_id();
        let key = new_key();
        assert_ne!(id, key);
        assert!(id.contains('-'));
        assert!(!key.contains('-'));
        assert_eq!(key.len(), 32);
    }

    #[test]
    fn test_entity_ref_display() {
        assert_eq!(EntityRef::page("p1").to_string(), "page:p1");
        assert_eq!(EntityRef::schema_type("t").to_string(), "schema_type:t");
    }
}
