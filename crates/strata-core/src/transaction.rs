//! All-or-nothing writes against the in-memory store
//!
//! `transact` runs a closure on a working copy of the store and installs the
//! copy only when the closure succeeds. On error the caller's store is left
//! exactly as it was.
//!
//! ```
//! use strata_core::{transaction::transact, ops::content_ops, Store, StrataError};
//!
//! let mut store = Store::new();
//! let result: Result<(), StrataError> = transact(&mut store, |s| {
//!     content_ops::create_page(s, "index")?;
//!     content_ops::create_page(s, "")?; // invalid name
//!     Ok(())
//! });
//! assert!(result.is_err());
//! assert!(store.list_pages().is_empty());
//! ```

use crate::ops::Store;

/// Run `f` atomically against `store`
///
/// # Errors
///
/// Returns whatever `f` returns; the store is unchanged in that case.
pub fn transact<T, E, F>(store: &mut Store, f: F) -> std::result::Result<T, E>
where
    F: FnOnce(&mut Store) -> std::result::Result<T, E>,
{
    let mut working = store.clone();
    let value = f(&mut working)?;
    *store = working;
    Ok(value)
}
