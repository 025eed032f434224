//! Strata Store - SQLite persistence for the content store
//!
//! Provides:
//! - SQLite schema with a checksummed migrations framework
//! - Whole-store save and hydration inside one transaction
//! - Deploy-run provenance events

pub mod db;
pub mod errors;
pub mod migrations;
pub mod provenance;
pub mod repo;

pub use errors::Result;
