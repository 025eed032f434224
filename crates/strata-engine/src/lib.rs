//! Strata Engine - deployment orchestration
//!
//! Exports a content store into the on-disk deployment format and imports
//! that format back into any store, reconciling entities by their stable
//! reconciliation keys rather than by store ids.

pub mod command;
pub mod config;
pub mod errors;
pub mod exporter;
pub mod format;
pub mod importer;
pub mod principals;
pub mod reconcile;
pub mod registry;
pub mod report;

pub use command::{run_deploy, run_deploy_persistent, DeployCommand};
pub use config::DeployConfig;
pub use report::{DeployOutcome, DeployReport, Issue};
