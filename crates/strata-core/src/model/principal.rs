use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    User,
    Group,
}

/// A named user or group
///
/// Principals are identified across environments by name only. They belong
/// to the target environment and are never exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub key: String,
    pub name: String,
    pub kind: PrincipalKind,
    /// Ids of groups this principal is a direct member of
    pub member_of: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Principal {
    pub fn new(id: String, key: String, name: String, kind: PrincipalKind) -> Self {
        Self {
            id,
            key,
            name,
            kind,
            member_of: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_group(&self) -> bool {
        self.kind == PrincipalKind::Group
    }
}
