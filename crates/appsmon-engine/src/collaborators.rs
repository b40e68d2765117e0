//! Collaborator traits.
//!
//! The engine reaches the cluster only through these traits. The daemon
//! provides HTTP and kubectl implementations; [`crate::testing`] provides
//! in-memory ones.

use appsmon_types::{AppId, AppStatus, Instance, InstalledApp, InstanceMap};
use async_trait::async_trait;
use tracing::warn;

use crate::error::TransportResult;

/// Answer to a status change request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub success: bool,
    pub error: Option<String>,
}

impl StatusChange {
    pub fn applied() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn refused(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Source of the current cluster membership.
#[async_trait]
pub trait InstanceDirectory: Send + Sync {
    /// List every instance currently in the cluster.
    async fn list_instances(&self) -> TransportResult<InstanceMap>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// Per-instance app API.
#[async_trait]
pub trait InstanceClient: Send + Sync {
    /// Apps installed on the instance, with their status there.
    async fn installed_apps(&self, instance: &Instance) -> TransportResult<Vec<InstalledApp>>;

    /// Change an app's status on one instance. Idempotent.
    async fn set_app_status(
        &self,
        instance: &Instance,
        app_id: &AppId,
        status: &AppStatus,
    ) -> TransportResult<StatusChange>;
}

/// Operator notification channel.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send_alert(&self, message: &str) -> TransportResult<()>;
}

/// Alert sink used when no alert destination is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAlertSink;

#[async_trait]
impl AlertSink for NoopAlertSink {
    async fn send_alert(&self, message: &str) -> TransportResult<()> {
        warn!(message, "No alert destination configured, skipping alert");
        Ok(())
    }
}
