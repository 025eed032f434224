//! Principal resolution by logical name
//!
//! Owners and grantees travel by principal name. On import a name is bound
//! to the target's principal of that name, or left as an unresolved marker
//! that a later `create_principal` of the same name binds. Principals are
//! never created here.

use std::collections::{BTreeMap, BTreeSet};

use strata_core::errors::{ExError, ExErrorKind, StrataError};
use strata_core::model::{AccessControl, Grant, Permissions, Subject, Visibility};
use strata_core::ops::principal_ops::{subject_for_name, subject_name};
use strata_core::Store;

use crate::format::manifest::AclDoc;
use crate::report::{DeployReport, Issue};

/// Grants keyed by grantee name, permissions of equal names merged
pub fn grants_to_doc(store: &Store, grants: &[Grant]) -> BTreeMap<String, String> {
    let mut merged: BTreeMap<String, Permissions> = BTreeMap::new();
    for grant in grants {
        match subject_name(store, &grant.subject) {
            Some(name) => {
                let slot = merged.entry(name.to_string()).or_insert(Permissions::NONE);
                *slot = slot.union(grant.permissions);
            }
            None => tracing::warn!(?grant.subject, "grant to a missing principal not exported"),
        }
    }
    merged
        .into_iter()
        .map(|(name, perms)| (name, perms.to_string()))
        .collect()
}

/// Export form of an access-control block
pub fn acl_to_doc(store: &Store, acl: &AccessControl) -> AclDoc {
    AclDoc {
        public: acl.visibility.public,
        authenticated: acl.visibility.authenticated,
        owner: acl
            .owner
            .as_ref()
            .and_then(|o| subject_name(store, o))
            .map(str::to_string),
        grants: grants_to_doc(store, &acl.grants),
    }
}

/// Resolves names during one import and remembers the ones it could not
#[derive(Debug, Default)]
pub struct PrincipalResolver {
    unresolved: BTreeSet<String>,
}

impl PrincipalResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, store: &Store, name: &str) -> Subject {
        let subject = subject_for_name(store, name);
        if !subject.is_resolved() {
            self.unresolved.insert(name.to_string());
        }
        subject
    }

    /// Grants from their export form
    ///
    /// # Errors
    /// Returns `InvalidInput` for unparseable permission letters.
    pub fn grants_from_doc(
        &mut self,
        store: &Store,
        grants: &BTreeMap<String, String>,
    ) -> Result<Vec<Grant>, ExError> {
        grants
            .iter()
            .map(|(name, letters)| {
                let permissions = Permissions::parse(letters).map_err(ExError::from)?;
                Ok(Grant::new(self.resolve(store, name), permissions))
            })
            .collect()
    }

    /// Access-control block from its export form
    ///
    /// # Errors
    /// Same as [`PrincipalResolver::grants_from_doc`].
    pub fn acl_from_doc(&mut self, store: &Store, doc: &AclDoc) -> Result<AccessControl, ExError> {
        Ok(AccessControl {
            visibility: Visibility::new(doc.public, doc.authenticated),
            owner: doc.owner.as_deref().map(|name| self.resolve(store, name)),
            grants: self.grants_from_doc(store, &doc.grants)?,
        })
    }

    pub fn unresolved(&self) -> &BTreeSet<String> {
        &self.unresolved
    }

    /// One `UnresolvedPrincipal` issue per name left unresolved
    pub fn report_unresolved(&self, report: &mut DeployReport) {
        for name in &self.unresolved {
            report.warn(
                Issue::new(
                    ExErrorKind::UnresolvedPrincipal,
                    "principal",
                    ExError::from(StrataError::PrincipalNotFound {
                        principal: name.clone(),
                    })
                    .message(),
                )
                .with_name(name.clone()),
            );
        }
    }
}
