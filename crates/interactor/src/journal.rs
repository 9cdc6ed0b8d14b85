//! Execution journal recorded during a run.

use chrono::{DateTime, Utc};
use common::RunId;
use serde::{Deserialize, Serialize};

use crate::state::UnitStatus;

/// Position of a unit in the run's unit tree.
///
/// The top-level unit is `0`; the third child of a pipeline at `0.1` is
/// `0.1.2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitPath(Vec<usize>);

impl UnitPath {
    /// Path of the top-level unit.
    pub fn root() -> Self {
        Self(vec![0])
    }

    /// Path of the child at `index`.
    pub fn child(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(index);
        Self(segments)
    }

    /// Nesting depth; the root has depth 0.
    pub fn depth(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    pub fn segments(&self) -> &[usize] {
        &self.0
    }
}

impl std::fmt::Display for UnitPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for segment in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
            first = false;
        }
        Ok(())
    }
}

/// What happened to a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EntryKind {
    /// The unit was instantiated and started executing.
    Started,

    /// The unit finished successfully.
    Completed,

    /// The unit failed.
    Failed { error: String },

    /// The unit's compensation succeeded.
    Compensated,

    /// The unit's compensation failed.
    CompensationFailed { error: String },
}

impl EntryKind {
    /// Returns the unit status this entry moves the unit into.
    pub fn status(&self) -> UnitStatus {
        match self {
            EntryKind::Started => UnitStatus::Running,
            EntryKind::Completed => UnitStatus::Completed,
            EntryKind::Failed { .. } => UnitStatus::Failed,
            EntryKind::Compensated => UnitStatus::Compensated,
            EntryKind::CompensationFailed { .. } => UnitStatus::CompensationFailed,
        }
    }
}

/// A single journal record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Where the unit sits in the unit tree.
    pub path: UnitPath,
    /// The unit's name.
    pub unit: String,
    /// What happened.
    pub kind: EntryKind,
    /// When it happened.
    pub at: DateTime<Utc>,
}

/// Final status of one unit, as derived from the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOutcome {
    pub path: UnitPath,
    pub unit: String,
    pub status: UnitStatus,
}

/// Append-only log of unit lifecycle transitions in one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journal {
    run_id: RunId,
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            entries: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, path: &UnitPath, unit: &str, kind: EntryKind) {
        self.entries.push(JournalEntry {
            path: path.clone(),
            unit: unit.to_string(),
            kind,
            at: Utc::now(),
        });
    }

    /// Returns the run this journal belongs to.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the final status of every unit, in the order units started.
    pub fn outcomes(&self) -> Vec<UnitOutcome> {
        let mut outcomes: Vec<UnitOutcome> = Vec::new();
        for entry in &self.entries {
            let status = entry.kind.status();
            match outcomes.iter_mut().find(|o| o.path == entry.path) {
                Some(outcome) => outcome.status = status,
                None => outcomes.push(UnitOutcome {
                    path: entry.path.clone(),
                    unit: entry.unit.clone(),
                    status,
                }),
            }
        }
        outcomes
    }

    /// Returns the final status of the unit at `path`.
    pub fn status(&self, path: &UnitPath) -> Option<UnitStatus> {
        self.entries
            .iter()
            .rev()
            .find(|entry| &entry.path == path)
            .map(|entry| entry.kind.status())
    }

    /// Renders one line per unit, indented by depth.
    pub fn summary(&self) -> String {
        self.outcomes()
            .iter()
            .map(|outcome| {
                format!(
                    "{}{} {}",
                    "  ".repeat(outcome.path.depth()),
                    outcome.status.glyph(),
                    outcome.unit
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
