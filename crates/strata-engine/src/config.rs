//! Deployment configuration
//!
//! Read from `.strata/deploy.yaml` when present. Every field is optional;
//! command line flags override what the file says.

use std::path::Path;

use serde::Deserialize;
use strata_core::logging_facility::Profile;

use crate::errors::{io_error, serde_error, Result};

/// Default configuration location relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = ".strata/deploy.yaml";

/// Which optional artifact groups an export writes
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportSelection {
    pub schema: bool,
    pub files: bool,
    pub mail_templates: bool,
    pub localizations: bool,
}

impl Default for ExportSelection {
    fn default() -> Self {
        Self {
            schema: true,
            files: true,
            mail_templates: true,
            localizations: true,
        }
    }
}

/// Deployment settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeployConfig {
    /// Delete top-level entities absent from the imported export
    pub replace: bool,
    /// Size of the worker pool for page rendering and parsing; `None` uses
    /// one thread per core
    pub workers: Option<usize>,
    pub export: ExportSelection,
    pub logging: Profile,
}

impl DeployConfig {
    /// Parse configuration from YAML text
    ///
    /// # Errors
    /// Returns a serialization error for malformed YAML or unknown fields.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| serde_error("load_config", Path::new("<yaml>"), e))
    }

    /// Load configuration from a file
    ///
    /// # Errors
    /// Returns an IO error if the file cannot be read, or a serialization
    /// error if it does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| io_error("load_config", path, e))?;
        serde_yaml::from_str(&text).map_err(|e| serde_error("load_config", path, e))
    }

    /// Load configuration, falling back to defaults when the file is missing
    ///
    /// # Errors
    /// Same as [`DeployConfig::load`] for a file that exists.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Build the worker pool for parallel page work
    ///
    /// # Errors
    /// Returns an internal error if the pool cannot be created.
    pub fn thread_pool(&self) -> Result<rayon::ThreadPool> {
        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|i| format!("strata-deploy-{}", i));
        if let Some(n) = self.workers.filter(|n| *n > 0) {
            builder = builder.num_threads(n);
        }
        builder.build().map_err(|e| {
            strata_core::errors::ExError::new(strata_core::errors::ExErrorKind::Internal)
                .with_op("thread_pool")
                .with_message(e.to_string())
        })
    }
}
