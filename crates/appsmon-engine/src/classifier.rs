//! Drift classification.
//!
//! An app is synchronized for a pass only when no two consecutive
//! observations disagreed and it was observed on every instance.

use std::fmt;

use appsmon_types::ClusterAppRecord;

/// Classification of one app for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriftVerdict {
    /// Same status everywhere, present everywhere.
    Synchronized,
    /// Instances disagree on the status.
    Dirty,
    /// Statuses agree but the app is missing from some instances.
    Incomplete,
}

impl DriftVerdict {
    /// Whether the reconciler should look at this app.
    pub fn is_candidate(&self) -> bool {
        !matches!(self, Self::Synchronized)
    }
}

impl fmt::Display for DriftVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synchronized => write!(f, "synchronized"),
            Self::Dirty => write!(f, "dirty"),
            Self::Incomplete => write!(f, "incomplete"),
        }
    }
}

/// Classify a record against the number of instances scanned in its pass.
pub fn classify(record: &ClusterAppRecord, total_instances: usize) -> DriftVerdict {
    if record.is_dirty {
        DriftVerdict::Dirty
    } else if record.observation_count() != total_instances {
        DriftVerdict::Incomplete
    } else {
        DriftVerdict::Synchronized
    }
}

/// Records the reconciler has to act on.
pub fn candidates(
    records: &[ClusterAppRecord],
    total_instances: usize,
) -> impl Iterator<Item = &ClusterAppRecord> {
    records
        .iter()
        .filter(move |record| classify(record, total_instances).is_candidate())
}

/// Verdict counts for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriftSummary {
    pub total_apps: usize,
    pub synchronized: usize,
    pub dirty: usize,
    pub incomplete: usize,
}

impl DriftSummary {
    pub fn from_records(records: &[ClusterAppRecord], total_instances: usize) -> Self {
        let mut summary = Self {
            total_apps: records.len(),
            ..Default::default()
        };

        for record in records {
            match classify(record, total_instances) {
                DriftVerdict::Synchronized => summary.synchronized += 1,
                DriftVerdict::Dirty => summary.dirty += 1,
                DriftVerdict::Incomplete => summary.incomplete += 1,
            }
        }

        summary
    }

    pub fn candidates(&self) -> usize {
        self.dirty + self.incomplete
    }
}
