//! Error helpers for the deployment engine
//!
//! Everything crossing the engine boundary is an `ExError`.

use std::path::Path;

use strata_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// The export directory cannot be used as a deployment source or target
pub fn invalid_export(path: &Path, reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::InvalidExport)
        .with_path(path.display().to_string())
        .with_message(reason)
}

/// Create an IO error carrying the path it happened on
pub fn io_error(op: &str, path: &Path, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(op.to_string())
        .with_path(path.display().to_string())
        .with_message(err.to_string())
}

/// Create a serialization error for a document on disk
pub fn serde_error(op: &str, path: &Path, err: impl std::fmt::Display) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op(op.to_string())
        .with_path(path.display().to_string())
        .with_message(err.to_string())
}

/// Malformed markup document
pub fn markup_error(line: usize, reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op("parse_markup")
        .with_message(format!("line {}: {}", line, reason.into()))
}
