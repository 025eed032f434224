//! Core types shared across Strata crates
//!
//! - **Correlation types**: `RunId` identifies one deployment run
//! - **Schema constants**: canonical structured-logging field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::RunId;
