//! Cluster instance as produced by discovery

use crate::InstanceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A running cluster instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Instance identifier
    pub id: InstanceId,

    /// Network address (host or IP)
    pub address: String,

    /// Port the instance serves its REST API on
    pub port: u16,
}

impl Instance {
    pub fn new(id: impl Into<InstanceId>, address: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            port,
        }
    }
}

/// Discovered instances keyed by ID
pub type InstanceMap = BTreeMap<InstanceId, Instance>;
