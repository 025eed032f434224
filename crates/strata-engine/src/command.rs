//! Deployment commands
//!
//! `run_deploy` works on an in-memory store; `run_deploy_persistent` wraps
//! it with loading and saving the SQLite store and records provenance
//! events for the run.

use std::path::PathBuf;

use rusqlite::Connection;
use serde_json::json;
use strata_core::Store;
use strata_store::provenance::{emit_event, DeployEventKind};
use strata_store::repo::{load_store, SqliteRepo};

use crate::config::DeployConfig;
use crate::errors::Result;
use crate::report::{DeployOutcome, DeployReport};
use crate::{exporter, importer};

/// A deployment request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployCommand {
    /// Write the deployable state into a directory
    Export { dir: PathBuf },
    /// Reconcile the store with a directory written by `Export`
    Import { dir: PathBuf, replace: bool },
}

/// Run a deployment command against an in-memory store
///
/// Replace mode is on when either the command or the configuration asks
/// for it.
pub fn run_deploy(cmd: &DeployCommand, store: &mut Store, config: &DeployConfig) -> DeployReport {
    match cmd {
        DeployCommand::Export { dir } => exporter::export(store, dir, config),
        DeployCommand::Import { dir, replace } => {
            importer::import(store, dir, *replace || config.replace, config)
        }
    }
}

/// Run a deployment command against the persistent store
///
/// The store is loaded whole, the command runs in memory and an import's
/// result is saved in one SQLite transaction. A failed import saves
/// nothing.
///
/// # Errors
/// Returns persistence errors from loading or saving the store or from
/// recording provenance events. Deployment problems are in the report.
pub fn run_deploy_persistent(
    cmd: &DeployCommand,
    conn: &mut Connection,
    config: &DeployConfig,
) -> Result<DeployReport> {
    let mut store = load_store(conn)?;
    let report = run_deploy(cmd, &mut store, config);
    let run_id = report.run_id.as_str();

    let (started, finished) = match (cmd, report.outcome()) {
        (DeployCommand::Export { .. }, _) => {
            (DeployEventKind::ExportStarted, DeployEventKind::ExportCompleted)
        }
        (DeployCommand::Import { .. }, DeployOutcome::Failure) => {
            (DeployEventKind::ImportStarted, DeployEventKind::ImportFailed)
        }
        (DeployCommand::Import { .. }, _) => {
            SqliteRepo::save_store(conn, &store)?;
            (DeployEventKind::ImportStarted, DeployEventKind::ImportCompleted)
        }
    };

    let dir = match cmd {
        DeployCommand::Export { dir } | DeployCommand::Import { dir, .. } => dir,
    };
    emit_event(
        conn,
        started,
        run_id,
        Some(json!({ "dir": dir.display().to_string() })),
    )?;
    emit_event(
        conn,
        finished,
        run_id,
        Some(json!({
            "outcome": report.outcome(),
            "tallies": report.tallies,
            "issues": report.issues.len(),
            "notes": report.notes.len(),
            "fatal": report.fatal.as_ref().map(|f| f.code.clone()),
        })),
    )?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::ops::content_ops;

    #[test]
    fn test_config_replace_turns_on_replace_mode() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = Store::new();
        content_ops::create_page(&mut source, "kept").unwrap();
        let config = DeployConfig::default();
        run_deploy(
            &DeployCommand::Export {
                dir: dir.path().to_path_buf(),
            },
            &mut source,
            &config,
        );

        let mut target = Store::new();
        content_ops::create_page(&mut target, "stale").unwrap();
        let replace_config = DeployConfig {
            replace: true,
            ..DeployConfig::default()
        };
        let report = run_deploy(
            &DeployCommand::Import {
                dir: dir.path().to_path_buf(),
                replace: false,
            },
            &mut target,
            &replace_config,
        );

        assert_eq!(report.outcome(), DeployOutcome::Success);
        let names: Vec<&str> = target.list_pages().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["kept"]);
    }
}
