//! Remediation of drifted apps.
//!
//! Candidates are repaired one instance at a time by switching the app to
//! `manually_enabled`. Every attempt is followed by a best-effort operator
//! alert. A failed repair or alert is logged and the pass moves on.

use std::collections::HashSet;
use std::sync::Arc;

use appsmon_types::{
    AppId, AppStatus, ClusterAppRecord, InstanceId, InstanceMap, Observation,
    ReconciliationResult,
};
use tracing::{debug, info, instrument, warn};

use crate::classifier::classify;
use crate::collaborators::{AlertSink, InstanceClient};
use crate::error::MonitorError;

/// One enable command issued during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairAttempt {
    pub app_id: AppId,
    pub instance_id: InstanceId,
    pub success: bool,
    pub error: Option<String>,
}

/// Everything a remediation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemediationReport {
    pub result: ReconciliationResult,
    pub attempts: Vec<RepairAttempt>,
}

/// Issues enable commands for drifted apps.
pub struct Reconciler {
    client: Arc<dyn InstanceClient>,
    alerts: Arc<dyn AlertSink>,
}

impl Reconciler {
    pub fn new(client: Arc<dyn InstanceClient>, alerts: Arc<dyn AlertSink>) -> Self {
        Self { client, alerts }
    }

    /// Repair every candidate record.
    ///
    /// Records that are synchronized across `instances` are skipped. Within
    /// a candidate, only observations with an unhealthy status are
    /// targeted, in merge order, so instances that never reported the app
    /// are left alone.
    #[instrument(skip_all, fields(records = records.len(), instances = instances.len()))]
    pub async fn reconcile(
        &self,
        records: &[ClusterAppRecord],
        instances: &InstanceMap,
    ) -> RemediationReport {
        let mut report = RemediationReport::default();
        let mut fixed_apps: HashSet<&AppId> = HashSet::new();

        for record in records {
            let verdict = classify(record, instances.len());
            if !verdict.is_candidate() {
                continue;
            }

            info!(
                app_id = %record.app_id,
                app_name = %record.app_name,
                verdict = %verdict,
                observations = record.observation_count(),
                "App drift detected"
            );

            for observation in record.unhealthy_observations() {
                let Some(attempt) = self.repair(record, observation, instances).await else {
                    continue;
                };

                if attempt.success {
                    fixed_apps.insert(&record.app_id);
                    report.result.fixed_conflicts += 1;
                }

                report.attempts.push(attempt);
            }
        }

        report.result.fixed_apps = fixed_apps.len();
        report
    }

    async fn repair(
        &self,
        record: &ClusterAppRecord,
        observation: &Observation,
        instances: &InstanceMap,
    ) -> Option<RepairAttempt> {
        let Some(instance) = instances.get(&observation.instance_id) else {
            warn!(
                app_id = %record.app_id,
                instance_id = %observation.instance_id,
                "Observed instance is no longer known, skipping repair"
            );
            return None;
        };

        debug!(
            app_id = %record.app_id,
            instance_id = %instance.id,
            status = %observation.status,
            "Enabling app"
        );

        let outcome = match self
            .client
            .set_app_status(instance, &record.app_id, &AppStatus::manually_enabled())
            .await
        {
            Ok(change) if change.success => Ok(()),
            Ok(change) => Err(change.error.unwrap_or_else(|| "status change refused".into())),
            Err(e) => Err(e.to_string()),
        };

        self.alert(record, observation, outcome.as_ref().err()).await;

        let error = match outcome {
            Ok(()) => {
                info!(app_id = %record.app_id, instance_id = %instance.id, "App enabled");
                None
            }
            Err(reason) => {
                let err = MonitorError::Remediation {
                    instance_id: instance.id.clone(),
                    app_id: record.app_id.clone(),
                    reason: reason.clone(),
                };
                warn!(error = %err, "App repair failed");
                Some(reason)
            }
        };

        Some(RepairAttempt {
            app_id: record.app_id.clone(),
            instance_id: instance.id.clone(),
            success: error.is_none(),
            error,
        })
    }

    async fn alert(
        &self,
        record: &ClusterAppRecord,
        observation: &Observation,
        failure: Option<&String>,
    ) {
        let message = alert_message(record, observation, failure.map(String::as_str));

        if let Err(e) = self.alerts.send_alert(&message).await {
            let err = MonitorError::Alert(e);
            warn!(app_id = %record.app_id, error = %err, "Could not send drift alert");
        }
    }
}

/// Operator-facing text for one repair attempt.
pub fn alert_message(
    record: &ClusterAppRecord,
    observation: &Observation,
    failure: Option<&str>,
) -> String {
    let outcome = match failure {
        None => "it has been enabled again".to_string(),
        Some(reason) => format!("enabling it failed: {}", reason),
    };

    format!(
        "App *{}* (`{}`) was `{}` on instance `{}` while the cluster disagreed; {}.",
        record.app_name, record.app_id, observation.status, observation.instance_id, outcome
    )
}
