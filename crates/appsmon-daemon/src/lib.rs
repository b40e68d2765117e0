//! Apps Monitor daemon library
//!
//! This module provides the pieces the `appsmond` binary is assembled from:
//! - Configuration loading and validation
//! - Chat server REST client (discovery, app queries, alerts)
//! - kubectl-based discovery
//! - Daemon lifecycle management

pub mod client;
pub mod config;
pub mod error;
pub mod kubernetes;
pub mod runtime;

pub use crate::client::{ChatServerClient, RoomAlertSink};
pub use crate::config::{ConfigSource, Credentials, DaemonConfig, DiscoveryConfig, RawConfig};
pub use crate::error::{DaemonError, DaemonResult};
pub use crate::kubernetes::KubectlDirectory;
pub use crate::runtime::Daemon;
