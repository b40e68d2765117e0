//! # Apps Monitor Engine - Drift detection and reconciliation
//!
//! This crate holds the reconciliation loop that keeps app statuses
//! consistent across the instances of a chat server cluster.
//!
//! ## Overview
//!
//! Each pass runs four steps:
//!
//! 1. **Discover** the cluster's instances through an [`InstanceDirectory`]
//! 2. **Collect** every instance's installed apps concurrently ([`AppStatusCollector`])
//! 3. **Classify** each app as synchronized, dirty or incomplete ([`classify`])
//! 4. **Reconcile** candidates by enabling the app where it is not enabled ([`Reconciler`])
//!
//! The [`Scheduler`] runs passes on a fixed interval, one at a time, and
//! publishes [`MonitorEvent`](appsmon_types::MonitorEvent)s to subscribers.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use appsmon_engine::{MonitorConfig, Scheduler};
//! use appsmon_engine::testing::{FakeInstanceClient, RecordingAlertSink, StaticDirectory};
//!
//! # async fn example() {
//! let scheduler = Scheduler::new(
//!     MonitorConfig::default(),
//!     Arc::new(StaticDirectory::with_instances(3)),
//!     Arc::new(FakeInstanceClient::new()),
//!     Arc::new(RecordingAlertSink::new()),
//! );
//!
//! let report = scheduler.run_pass().await;
//! println!("{:?}", report.map(|r| r.result()));
//! # }
//! ```
//!
//! ## Collaborators
//!
//! Network access lives behind three traits so the engine never talks to a
//! transport directly:
//!
//! - [`InstanceDirectory`]: cluster membership
//! - [`InstanceClient`]: per-instance app queries and status commands
//! - [`AlertSink`]: operator notifications

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod classifier;
pub mod collaborators;
pub mod collector;
pub mod config;
pub mod error;
pub mod reconciler;
pub mod scheduler;
pub mod testing;

// Re-export main types
pub use classifier::{candidates, classify, DriftSummary, DriftVerdict};
pub use collaborators::{AlertSink, InstanceClient, InstanceDirectory, NoopAlertSink, StatusChange};
pub use collector::AppStatusCollector;
pub use config::{MonitorConfig, DEFAULT_INTERVAL_MS, MIN_INSTANCES, MIN_INTERVAL_MS};
pub use error::{MonitorError, MonitorResult, TransportError, TransportResult};
pub use reconciler::{alert_message, Reconciler, RemediationReport, RepairAttempt};
pub use scheduler::{Scheduler, SchedulerState};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeInstanceClient, RecordingAlertSink, StaticDirectory};
    use appsmon_types::InstalledApp;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_engine_integration() {
        let client = Arc::new(
            FakeInstanceClient::new()
                .with_apps("instance-0", vec![InstalledApp::new("x", "X", "enabled")])
                .with_apps("instance-1", vec![InstalledApp::new("x", "X", "disabled")]),
        );
        let alerts = Arc::new(RecordingAlertSink::new());

        let scheduler = Scheduler::new(
            MonitorConfig::default(),
            Arc::new(StaticDirectory::with_instances(2)),
            client.clone(),
            alerts.clone(),
        );

        let report = scheduler.run_pass().await.unwrap();
        assert_eq!(report.result().fixed_conflicts, 1);
        assert_eq!(client.status_calls().len(), 1);
        assert_eq!(alerts.messages().len(), 1);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }
}
