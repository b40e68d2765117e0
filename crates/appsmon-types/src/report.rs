//! Pass results

use crate::PassId;
use serde::{Deserialize, Serialize};

/// What a remediation pass fixed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// Distinct apps with at least one successful repair
    pub fixed_apps: usize,

    /// Successful per-instance repairs
    pub fixed_conflicts: usize,
}

/// How a pass ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PassOutcome {
    /// Too few instances to compare; nothing was collected
    Skipped { instances: usize },

    /// Collection and remediation ran
    Reconciled {
        instances: usize,
        apps: usize,
        candidates: usize,
        result: ReconciliationResult,
    },
}

/// Summary of one completed pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassReport {
    pub pass_id: PassId,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    pub outcome: PassOutcome,
}

impl PassReport {
    pub fn result(&self) -> ReconciliationResult {
        match &self.outcome {
            PassOutcome::Skipped { .. } => ReconciliationResult::default(),
            PassOutcome::Reconciled { result, .. } => *result,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, PassOutcome::Skipped { .. })
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
