//! Visibility, ownership and grants
//!
//! Owners and grantees are `Subject`s: either bound to a principal in this
//! store (by store id) or an unresolved marker carrying only the principal
//! name. Markers are bound when a principal with that name is created.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, StrataError};

/// Permission bitmask
///
/// Serialized as a letter set in fixed order: `r` read, `w` write,
/// `d` delete, `a` access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permissions(u8);

impl Permissions {
    pub const NONE: Permissions = Permissions(0);
    pub const READ: Permissions = Permissions(1);
    pub const WRITE: Permissions = Permissions(2);
    pub const DELETE: Permissions = Permissions(4);
    pub const ACCESS_CONTROL: Permissions = Permissions(8);
    pub const FULL: Permissions = Permissions(15);

    const LETTERS: [(char, u8); 4] = [('r', 1), ('w', 2), ('d', 4), ('a', 8)];

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: Permissions) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: Permissions) -> Permissions {
        Permissions(self.0 | other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Parse a permission set
    ///
    /// Accepts the letter form (`"rw"`, `"rwda"`), comma separated words
    /// (`"read,write"`) and `"full"`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPermission` for anything else.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(Permissions::NONE);
        }
        if trimmed == "full" {
            return Ok(Permissions::FULL);
        }
        if trimmed
            .chars()
            .all(|c| Self::LETTERS.iter().any(|(l, _)| *l == c))
        {
            let bits = trimmed
                .chars()
                .filter_map(|c| Self::LETTERS.iter().find(|(l, _)| *l == c))
                .fold(0, |acc, (_, bit)| acc | bit);
            return Ok(Permissions(bits));
        }
        let mut bits = 0;
        for word in trimmed.split(',') {
            bits |= match word.trim() {
                "read" => 1,
                "write" => 2,
                "delete" => 4,
                "access_control" | "accessControl" => 8,
                _ => {
                    return Err(StrataError::InvalidPermission {
                        value: value.to_string(),
                    })
                }
            };
        }
        Ok(Permissions(bits))
    }
}

impl std::fmt::Display for Permissions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (letter, bit) in Self::LETTERS {
            if self.0 & bit != 0 {
                write!(f, "{}", letter)?;
            }
        }
        Ok(())
    }
}

impl TryFrom<String> for Permissions {
    type Error = StrataError;

    fn try_from(value: String) -> Result<Self> {
        Permissions::parse(&value)
    }
}

impl From<Permissions> for String {
    fn from(p: Permissions) -> Self {
        p.to_string()
    }
}

/// Owner or grantee of an entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Subject {
    /// Bound to a principal of this store
    Resolved { principal_id: String },
    /// Named principal that does not exist (yet) in this store
    Unresolved { name: String },
}

impl Subject {
    pub fn resolved(principal_id: impl Into<String>) -> Self {
        Subject::Resolved {
            principal_id: principal_id.into(),
        }
    }

    pub fn unresolved(name: impl Into<String>) -> Self {
        Subject::Unresolved { name: name.into() }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Subject::Resolved { .. })
    }
}

/// A permission set granted to a subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub subject: Subject,
    pub permissions: Permissions,
}

impl Grant {
    pub fn new(subject: Subject, permissions: Permissions) -> Self {
        Self {
            subject,
            permissions,
        }
    }
}

/// Visibility flags `(public, authenticated)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Visibility {
    pub public: bool,
    pub authenticated: bool,
}

impl Visibility {
    pub fn new(public: bool, authenticated: bool) -> Self {
        Self {
            public,
            authenticated,
        }
    }
}

/// Access-control block shared by every securable entity
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessControl {
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub owner: Option<Subject>,
    #[serde(default)]
    pub grants: Vec<Grant>,
}

impl AccessControl {
    /// Merge a grant into the list, or-ing permissions for an existing subject
    pub fn add_grant(&mut self, subject: Subject, permissions: Permissions) {
        match self.grants.iter_mut().find(|g| g.subject == subject) {
            Some(existing) => existing.permissions = existing.permissions.union(permissions),
            None => self.grants.push(Grant::new(subject, permissions)),
        }
    }

    /// Remove every grant held by a subject
    pub fn revoke(&mut self, subject: &Subject) {
        self.grants.retain(|g| &g.subject != subject);
    }

    /// Bind every unresolved marker named `name` to `principal_id`
    ///
    /// Returns the number of markers bound.
    pub fn bind_pending(&mut self, name: &str, principal_id: &str) -> usize {
        let mut bound = 0;
        let target = Subject::unresolved(name);
        if self.owner.as_ref() == Some(&target) {
            self.owner = Some(Subject::resolved(principal_id));
            bound += 1;
        }
        for grant in self.grants.iter_mut().filter(|g| g.subject == target) {
            grant.subject = Subject::resolved(principal_id);
            bound += 1;
        }
        bound
    }
}
