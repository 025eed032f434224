//! Repository layer for persisting the content store to SQLite
//!
//! Bridges the in-memory `Store` to the entity tables

pub mod hydration;
pub mod sqlite_repo;

pub use hydration::load_store;
pub use sqlite_repo::SqliteRepo;
