//! Canonical fingerprints of deployable state
//!
//! The canonical string of an entity depends only on its logical content:
//! store ids, reconciliation keys and timestamps never appear in it. Two
//! stores holding the same content in different environments produce the
//! same string, which makes it the oracle for round-trip equivalence.

pub mod canonical;
pub mod digest;

pub use canonical::{canonical_string, site_fingerprint};
pub use digest::{canonical_digest, hash_bytes, hash_string, site_digest};
