//! Strata Core - in-memory content graph and its invariants
//!
//! This crate holds everything a deployment needs to reason about content
//! without touching disk:
//! - the domain model (pages, markup nodes, shared components, files,
//!   principals, schema types, records, auxiliary artifacts)
//! - the `Store` with its reconciliation-key index and shadow container
//! - authoring operations and all-or-nothing transactions
//! - schema flattening with multiple inheritance and view ordering
//! - effective permission evaluation
//! - the canonical hasher used to verify round trips

pub mod access;
pub mod errors;
pub mod expand;
pub mod hash;
pub mod logging_facility;
pub mod model;
pub mod ops;
pub mod schema;
pub mod transaction;

pub use errors::{ExError, ExErrorKind, Result, StrataError};
pub use hash::{canonical_digest, canonical_string, site_digest, site_fingerprint};
pub use model::{EntityKind, EntityRef};
pub use ops::Store;
pub use transaction::transact;
