//! Error types for appsmon-engine.
//!
//! [`TransportError`] is what a collaborator reports. [`MonitorError`] says
//! which pass step it broke and therefore whether the pass survives it.

use appsmon_types::{AppId, InstanceId};
use thiserror::Error;

/// Failures reported by the directory, instance client and alert sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection could not be established or was interrupted.
    #[error("could not reach {target}: {reason}")]
    Connect { target: String, reason: String },

    /// Credentials were rejected (HTTP 401).
    #[error("invalid authentication")]
    Unauthorized,

    /// Credentials lack permission (HTTP 403).
    #[error("unauthorized access")]
    Forbidden,

    /// Response was not JSON.
    #[error("invalid content type \"{0}\"")]
    UnexpectedContentType(String),

    /// Non-success status with a body that could not be interpreted.
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),

    /// The remote API answered with `success: false`.
    #[error("remote error: {0}")]
    Remote(String),

    /// A local helper command failed to run or exited non-zero.
    #[error("command failed: {0}")]
    Command(String),
}

/// Result type for collaborator calls.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors raised while running a reconciliation pass.
///
/// `Discovery` and `Collection` abort the pass. `Remediation` and `Alert` are
/// logged where they happen and never leave the reconciler.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Listing instances failed.
    #[error("instance discovery failed: {0}")]
    Discovery(#[source] TransportError),

    /// One instance's app list could not be fetched.
    #[error("collecting apps from instance {instance_id} failed: {source}")]
    Collection {
        instance_id: InstanceId,
        #[source]
        source: TransportError,
    },

    /// An enable command failed or was refused.
    #[error("repair of app {app_id} on instance {instance_id} failed: {reason}")]
    Remediation {
        instance_id: InstanceId,
        app_id: AppId,
        reason: String,
    },

    /// An operator alert could not be delivered.
    #[error("alert delivery failed: {0}")]
    Alert(#[source] TransportError),
}

impl MonitorError {
    /// Whether this error ends the pass it occurred in.
    pub fn is_pass_fatal(&self) -> bool {
        matches!(self, Self::Discovery(_) | Self::Collection { .. })
    }
}

/// Result type for engine operations.
pub type MonitorResult<T> = Result<T, MonitorError>;
