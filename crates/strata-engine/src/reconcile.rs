//! Identity reconciliation
//!
//! An incoming entity is matched to a target entity by reconciliation key.
//! When no entity carries the key, a caller-supplied structural fallback
//! (same path and name) may pick a candidate, which then adopts the
//! incoming key so later runs match it directly.

use strata_core::errors::{ExError, ExErrorKind};
use strata_core::model::{EntityKind, EntityRef};
use strata_core::Store;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match {
    /// Existing entity; `adopted` when found by the structural fallback
    Matched { id: String, adopted: bool },
    NotFound,
}

/// Match an incoming `(kind, key)` against the target store
///
/// `fallback` is consulted only when no entity carries `key`; it returns
/// the id of a structural candidate of `kind`.
///
/// # Errors
/// Returns `StructuralMismatch` when the key is bound to an entity of a
/// different kind.
pub fn reconcile<F>(store: &mut Store, kind: EntityKind, key: &str, fallback: F) -> Result<Match, ExError>
where
    F: FnOnce(&Store) -> Option<String>,
{
    match store.find_by_key(key) {
        Some(existing) if existing.kind == kind => Ok(Match::Matched {
            id: existing.id.clone(),
            adopted: false,
        }),
        Some(existing) => Err(ExError::new(ExErrorKind::StructuralMismatch)
            .with_op("reconcile")
            .with_key(key)
            .with_entity_id(existing.id.clone())
            .with_message(format!(
                "key {} identifies a {} in the target, not a {}",
                key, existing.kind, kind
            ))),
        None => match fallback(store) {
            Some(id) => {
                store
                    .rekey(&EntityRef::new(kind, id.clone()), key)
                    .map_err(ExError::from)?;
                tracing::debug!(%kind, key, id = %id, "adopted reconciliation key");
                Ok(Match::Matched { id, adopted: true })
            }
            None => Ok(Match::NotFound),
        },
    }
}
