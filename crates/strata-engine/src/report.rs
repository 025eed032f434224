//! Structured deployment report
//!
//! Every warning, skipped entity and structural note of a run ends up here.
//! Issues make a run a partial success; notes do not.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strata_core::errors::{ExError, ExErrorKind};
use strata_core_types::RunId;

/// Direction of a deployment run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployMode {
    Export,
    Import,
}

/// Overall result of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployOutcome {
    Success,
    /// Completed with skipped entities
    Partial,
    Failure,
}

impl DeployOutcome {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            DeployOutcome::Success => 0,
            DeployOutcome::Partial => 2,
            DeployOutcome::Failure => 1,
        }
    }
}

/// One reported problem or note about an entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub kind: ExErrorKind,
    pub code: String,
    pub entity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub message: String,
}

impl Issue {
    pub fn new(kind: ExErrorKind, entity: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.code().to_string(),
            entity: entity.to_string(),
            key: None,
            name: None,
            message: message.into(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Reclassify, keeping the message
    pub fn with_kind(mut self, kind: ExErrorKind) -> Self {
        self.kind = kind;
        self.code = kind.code().to_string();
        self
    }

    /// Issue describing an `ExError` raised while handling an entity
    pub fn from_error(entity: &str, err: &ExError) -> Self {
        let mut issue = Self::new(err.kind(), entity, err.message());
        issue.key = err.key().map(str::to_string);
        issue
    }
}

/// Per entity-kind counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub exported: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub skipped: usize,
}

/// Report of a single deployment run
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub run_id: RunId,
    pub mode: DeployMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub tallies: BTreeMap<String, Tally>,
    pub issues: Vec<Issue>,
    pub notes: Vec<Issue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal: Option<Issue>,
}

impl DeployReport {
    pub fn new(mode: DeployMode) -> Self {
        Self {
            run_id: RunId::new(),
            mode,
            started_at: Utc::now(),
            finished_at: None,
            tallies: BTreeMap::new(),
            issues: Vec::new(),
            notes: Vec::new(),
            fatal: None,
        }
    }

    pub fn tally(&mut self, entity: &str) -> &mut Tally {
        self.tallies.entry(entity.to_string()).or_default()
    }

    /// Record a skipped entity
    pub fn issue(&mut self, issue: Issue) {
        tracing::warn!(
            code = %issue.code,
            entity = %issue.entity,
            key = issue.key.as_deref().unwrap_or(""),
            "{}",
            issue.message
        );
        self.tally(&issue.entity).skipped += 1;
        self.issues.push(issue);
    }

    /// Record a warning that did not cause a skip
    pub fn warn(&mut self, issue: Issue) {
        tracing::warn!(code = %issue.code, entity = %issue.entity, "{}", issue.message);
        self.issues.push(issue);
    }

    pub fn note(&mut self, issue: Issue) {
        self.notes.push(issue);
    }

    /// Record the error that aborted the run
    pub fn fail(&mut self, entity: &str, err: &ExError) {
        self.fatal = Some(Issue::from_error(entity, err));
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn outcome(&self) -> DeployOutcome {
        if self.fatal.is_some() {
            DeployOutcome::Failure
        } else if self.issues.is_empty() {
            DeployOutcome::Success
        } else {
            DeployOutcome::Partial
        }
    }

    /// Issues of one kind, in the order they were reported
    pub fn issues_of(&self, kind: ExErrorKind) -> Vec<&Issue> {
        self.issues.iter().filter(|i| i.kind == kind).collect()
    }

    /// Human readable summary for terminal output
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let mode = match self.mode {
            DeployMode::Export => "export",
            DeployMode::Import => "import",
        };
        let outcome = match self.outcome() {
            DeployOutcome::Success => "success",
            DeployOutcome::Partial => "partial success",
            DeployOutcome::Failure => "failed",
        };
        let _ = writeln!(out, "{} {} ({})", mode, outcome, self.run_id);
        for (entity, t) in &self.tallies {
            let _ = writeln!(
                out,
                "  {:<14} exported {:>4}  created {:>4}  updated {:>4}  deleted {:>4}  skipped {:>4}",
                entity, t.exported, t.created, t.updated, t.deleted, t.skipped
            );
        }
        if let Some(fatal) = &self.fatal {
            let _ = writeln!(out, "fatal: [{}] {}", fatal.code, fatal.message);
        }
        for issue in &self.issues {
            let _ = writeln!(out, "issue: [{}] {} {}", issue.code, issue.entity, issue.message);
        }
        for note in &self.notes {
            let _ = writeln!(out, "note: [{}] {}", note.code, note.message);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_follows_issues_not_notes() {
        let mut report = DeployReport::new(DeployMode::Import);
        report.note(Issue::new(ExErrorKind::CyclicShutdownGuard, "component", "A -> B -> A"));
        assert_eq!(report.outcome(), DeployOutcome::Success);

        report.issue(Issue::new(ExErrorKind::StructuralMismatch, "node", "dangling placement"));
        assert_eq!(report.outcome(), DeployOutcome::Partial);
        assert_eq!(report.tallies["node"].skipped, 1);

        report.fail("directory", &ExError::new(ExErrorKind::InvalidExport));
        assert_eq!(report.outcome(), DeployOutcome::Failure);
        assert_eq!(report.outcome().exit_code(), 1);
    }

    #[test]
    fn test_report_serializes_codes() {
        let mut report = DeployReport::new(DeployMode::Export);
        report.issue(
            Issue::new(ExErrorKind::UnreadableEntity, "page", "bad tag").with_name("index"),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], "export");
        assert_eq!(json["issues"][0]["code"], "ERR_UNREADABLE_ENTITY");
        assert_eq!(json["issues"][0]["name"], "index");
        assert!(json.get("fatal").is_none());
    }
}
