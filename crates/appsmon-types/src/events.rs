//! Event types for monitor observability
//!
//! The scheduler publishes one envelope per pass lifecycle step so that the
//! launcher, or a test, can follow the loop without parsing logs.

use crate::{AppId, InstanceId, PassId, ReconciliationResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all monitor events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorEventEnvelope {
    /// Unique event ID
    pub id: Uuid,

    /// Event timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Pass the event belongs to
    pub pass_id: PassId,

    /// The actual event
    pub event: MonitorEvent,
}

impl MonitorEventEnvelope {
    pub fn new(pass_id: PassId, event: MonitorEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            pass_id,
            event,
        }
    }
}

/// Monitor events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorEvent {
    /// Pass started
    PassStarted,

    /// Pass ended early because too few instances were discovered
    PassSkipped { instances: usize },

    /// Repair issued to one instance for one app
    RepairAttempted {
        app_id: AppId,
        instance_id: InstanceId,
        success: bool,
    },

    /// Pass completed
    PassCompleted {
        instances: usize,
        result: ReconciliationResult,
    },

    /// Pass aborted by a discovery or collection failure
    PassFailed { reason: String },
}
