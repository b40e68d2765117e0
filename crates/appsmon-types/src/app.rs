//! App status types
//!
//! An [`InstalledApp`] is what one instance reports about one app. The
//! collector folds those reports into one [`ClusterAppRecord`] per app.

use crate::{AppId, InstanceId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an app on one instance.
///
/// Status strings are owned by the chat server's app engine and are kept
/// opaque. Only [`AppStatus::ENABLED`] and [`AppStatus::MANUALLY_ENABLED`]
/// carry meaning here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppStatus(String);

impl AppStatus {
    pub const ENABLED: &'static str = "enabled";
    pub const MANUALLY_ENABLED: &'static str = "manually_enabled";
    pub const DISABLED: &'static str = "disabled";

    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    /// Status the reconciler asks an instance to switch to.
    pub fn manually_enabled() -> Self {
        Self::new(Self::MANUALLY_ENABLED)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the app is running on the instance.
    pub fn is_healthy(&self) -> bool {
        self.0 == Self::ENABLED || self.0 == Self::MANUALLY_ENABLED
    }
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AppStatus {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// An app as reported by a single instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledApp {
    pub id: AppId,
    pub name: String,
    pub status: AppStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl InstalledApp {
    pub fn new(id: impl Into<AppId>, name: impl Into<String>, status: impl Into<AppStatus>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: status.into(),
            version: None,
        }
    }
}

/// One instance's status for one app, captured during a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub instance_id: InstanceId,
    pub status: AppStatus,
}

/// One app's status across the cluster for a single pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAppRecord {
    pub app_id: AppId,
    pub app_name: String,

    /// Set once two consecutive observations disagree. Never cleared.
    pub is_dirty: bool,

    /// Observations in merge order
    pub observations: Vec<Observation>,
}

impl ClusterAppRecord {
    pub fn new(app_id: AppId, app_name: impl Into<String>) -> Self {
        Self {
            app_id,
            app_name: app_name.into(),
            is_dirty: false,
            observations: Vec::new(),
        }
    }

    /// Append an observation and compare it against the one before it.
    ///
    /// Only adjacent pairs are compared, so `enabled, disabled` is dirty
    /// while the same statuses merged in another order may not be.
    pub fn observe(&mut self, instance_id: InstanceId, status: AppStatus) {
        if let Some(previous) = self.observations.last() {
            if previous.status != status {
                self.is_dirty = true;
            }
        }

        self.observations.push(Observation {
            instance_id,
            status,
        });
    }

    /// Number of instances this app was observed on.
    pub fn observation_count(&self) -> usize {
        self.observations.len()
    }

    /// Observations whose status is neither enabled nor manually enabled.
    pub fn unhealthy_observations(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter().filter(|o| !o.status.is_healthy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record_from(statuses: &[&str]) -> ClusterAppRecord {
        let mut record = ClusterAppRecord::new(AppId::new("app"), "App");
        for (i, status) in statuses.iter().enumerate() {
            record.observe(InstanceId::new(format!("i{}", i)), AppStatus::new(*status));
        }
        record
    }

    #[test]
    fn test_healthy_statuses() {
        assert!(AppStatus::new("enabled").is_healthy());
        assert!(AppStatus::manually_enabled().is_healthy());
        assert!(!AppStatus::new(AppStatus::DISABLED).is_healthy());
        assert!(!AppStatus::new("invalid_settings_disabled").is_healthy());
        assert!(!AppStatus::new("ENABLED").is_healthy());
    }

    #[test]
    fn test_installed_app_decodes_server_payload() {
        let app: InstalledApp = serde_json::from_str(
            r#"{"id":"a1","name":"Poll","status":"manually_enabled","version":"1.2.0"}"#,
        )
        .unwrap();
        assert_eq!(app.id.as_str(), "a1");
        assert!(app.status.is_healthy());
        assert_eq!(app.version.as_deref(), Some("1.2.0"));

        let app: InstalledApp =
            serde_json::from_str(r#"{"id":"a2","name":"Jira","status":"disabled"}"#).unwrap();
        assert!(app.version.is_none());
    }

    #[test]
    fn test_adjacent_disagreement_marks_dirty() {
        assert!(!record_from(&["enabled", "enabled", "enabled"]).is_dirty);
        assert!(record_from(&["enabled", "disabled", "enabled"]).is_dirty);
        assert!(record_from(&["enabled", "manually_enabled"]).is_dirty);
    }

    #[test]
    fn test_dirty_never_reverts() {
        let record = record_from(&["disabled", "enabled", "enabled", "enabled"]);
        assert!(record.is_dirty);
        assert_eq!(record.observation_count(), 4);
    }

    #[test]
    fn test_single_observation_is_clean() {
        let record = record_from(&["disabled"]);
        assert!(!record.is_dirty);
        assert_eq!(record.unhealthy_observations().count(), 1);
    }

    fn arb_status() -> impl Strategy<Value = &'static str> {
        prop_oneof![
            Just("enabled"),
            Just("manually_enabled"),
            Just("disabled"),
            Just("initialized"),
        ]
    }

    proptest! {
        /// Identical statuses never make a record dirty.
        #[test]
        fn uniform_statuses_stay_clean(status in arb_status(), n in 1usize..12) {
            let statuses = vec![status; n];
            prop_assert!(!record_from(&statuses).is_dirty);
        }

        /// A record is dirty exactly when some adjacent pair differs.
        #[test]
        fn dirty_matches_adjacent_pairs(statuses in prop::collection::vec(arb_status(), 1..12)) {
            let expected = statuses.windows(2).any(|w| w[0] != w[1]);
            prop_assert_eq!(record_from(&statuses).is_dirty, expected);
        }
    }
}
