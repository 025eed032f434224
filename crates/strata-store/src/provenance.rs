//! Provenance event tracking for deployment runs
//!
//! Records events in the deploy_events table

use rusqlite::Connection;

use crate::errors::{from_rusqlite, Result};

/// Deploy event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployEventKind {
    ExportStarted,
    ExportCompleted,
    ImportStarted,
    ImportCompleted,
    /// Import aborted by a fatal error
    ImportFailed,
}

impl DeployEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployEventKind::ExportStarted => "export_started",
            DeployEventKind::ExportCompleted => "export_completed",
            DeployEventKind::ImportStarted => "import_started",
            DeployEventKind::ImportCompleted => "import_completed",
            DeployEventKind::ImportFailed => "import_failed",
        }
    }
}

/// A stored deploy event
#[derive(Debug, Clone)]
pub struct DeployEvent {
    pub run_id: String,
    pub kind: String,
    pub timestamp: i64,
    pub metadata: serde_json::Value,
}

fn metadata_string(metadata: Option<serde_json::Value>) -> String {
    metadata
        .and_then(|m| serde_json::to_string(&m).ok())
        .unwrap_or_else(|| "{}".to_string())
}

/// Emit a deploy event
pub fn emit_event(
    conn: &Connection,
    kind: DeployEventKind,
    run_id: &str,
    metadata: Option<serde_json::Value>,
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    conn.execute(
        "INSERT INTO deploy_events (run_id, kind, timestamp, metadata) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![run_id, kind.as_str(), now, metadata_string(metadata)],
    )
    .map_err(from_rusqlite)?;

    Ok(())
}

/// List events of one run in emission order
pub fn list_events(conn: &Connection, run_id: &str) -> Result<Vec<DeployEvent>> {
    let mut stmt = conn
        .prepare(
            "SELECT run_id, kind, timestamp, metadata FROM deploy_events WHERE run_id = ?1 ORDER BY id",
        )
        .map_err(from_rusqlite)?;

    let events = stmt
        .query_map([run_id], |row| {
            let metadata: String = row.get(3)?;
            Ok(DeployEvent {
                run_id: row.get(0)?,
                kind: row.get(1)?,
                timestamp: row.get(2)?,
                metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
            })
        })
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::apply_migrations;

    #[test]
    fn test_events_listed_per_run_in_order() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();

        emit_event(&conn, DeployEventKind::ImportStarted, "run-1", None).unwrap();
        emit_event(&conn, DeployEventKind::ExportStarted, "run-2", None).unwrap();
        emit_event(
            &conn,
            DeployEventKind::ImportCompleted,
            "run-1",
            Some(serde_json::json!({"skipped": 0})),
        )
        .unwrap();

        let events = list_events(&conn, "run-1").unwrap();
        let kinds: Vec<&str> = events.iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, vec!["import_started", "import_completed"]);
        assert_eq!(events[1].metadata["skipped"], 0);
        assert_eq!(events[0].metadata, serde_json::json!({}));
    }
}
