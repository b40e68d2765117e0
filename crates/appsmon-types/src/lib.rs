//! Apps Monitor Types - Core types for cluster app status reconciliation
//!
//! Apps Monitor watches a multi-instance chat server cluster and keeps the
//! status of installed apps consistent across every instance. These types are
//! shared by the reconciliation engine and the daemon that hosts it.
//!
//! ## Key Concepts
//!
//! - **Instance**: One running node of the cluster, addressable over the network
//! - **InstalledApp**: One app as reported by one instance
//! - **ClusterAppRecord**: One app's observed status across every instance in a pass
//! - **ReconciliationResult**: What a single remediation pass managed to fix
//! - **Events**: Pass lifecycle stream for observers
//!
//! Every value here is pass-scoped. Nothing is persisted between passes.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod app;
pub mod events;
pub mod ids;
pub mod instance;
pub mod report;

// Re-export main types
pub use app::{AppStatus, ClusterAppRecord, InstalledApp, Observation};
pub use events::{MonitorEvent, MonitorEventEnvelope};
pub use ids::{AppId, InstanceId, PassId};
pub use instance::{Instance, InstanceMap};
pub use report::{PassOutcome, PassReport, ReconciliationResult};
