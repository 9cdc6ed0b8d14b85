//! Unit lifecycle state machine.

use serde::{Deserialize, Serialize};

/// The state of one unit instance within a run.
///
/// State transitions:
/// ```text
/// Running ──┬──► Completed ──┬──► Compensated
///           │                └──► CompensationFailed
///           └──► Failed ─────┬──► Compensated         (leaves only)
///                            └──► CompensationFailed  (leaves only)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UnitStatus {
    /// The unit's `perform` or pipeline is executing.
    #[default]
    Running,

    /// The unit finished successfully.
    Completed,

    /// The unit's `perform`, `compose`, or a child failed.
    Failed,

    /// The unit's `compensate` ran successfully (terminal state).
    Compensated,

    /// The unit's `compensate` failed (terminal state).
    CompensationFailed,
}

impl UnitStatus {
    /// Returns the single-character glyph used in journal summaries.
    pub fn glyph(&self) -> &'static str {
        match self {
            UnitStatus::Running => "…",
            UnitStatus::Completed => "✓",
            UnitStatus::Failed => "✗",
            UnitStatus::Compensated => "↩",
            UnitStatus::CompensationFailed => "⚠",
        }
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Running => "Running",
            UnitStatus::Completed => "Completed",
            UnitStatus::Failed => "Failed",
            UnitStatus::Compensated => "Compensated",
            UnitStatus::CompensationFailed => "CompensationFailed",
        }
    }
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
