//! Reconciliation loop and scheduler

use std::sync::Arc;

use appsmon_types::{MonitorEvent, MonitorEventEnvelope, PassId, PassOutcome, PassReport};
use chrono::Utc;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{error, info, info_span, Instrument};

use crate::classifier::DriftSummary;
use crate::collaborators::{AlertSink, InstanceClient, InstanceDirectory};
use crate::collector::AppStatusCollector;
use crate::config::{MonitorConfig, MIN_INSTANCES};
use crate::error::{MonitorError, MonitorResult};
use crate::reconciler::Reconciler;

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    RunningPass,
}

/// Runs discovery, collection and remediation on a fixed interval.
pub struct Scheduler {
    config: MonitorConfig,
    directory: Arc<dyn InstanceDirectory>,
    collector: AppStatusCollector,
    reconciler: Reconciler,
    state: watch::Sender<SchedulerState>,
    pass_lock: Mutex<()>,
    event_tx: broadcast::Sender<MonitorEventEnvelope>,
}

impl Scheduler {
    /// Create a new scheduler
    pub fn new(
        config: MonitorConfig,
        directory: Arc<dyn InstanceDirectory>,
        client: Arc<dyn InstanceClient>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        let (event_tx, _) = broadcast::channel(1024);

        Self {
            collector: AppStatusCollector::new(client.clone(), config.app_filter.clone()),
            reconciler: Reconciler::new(client, alerts),
            config,
            directory,
            state,
            pass_lock: Mutex::new(()),
            event_tx,
        }
    }

    /// Subscribe to pass events.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEventEnvelope> {
        self.event_tx.subscribe()
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Run passes until `shutdown` turns true.
    ///
    /// A pass that has started always runs to completion; shutdown is only
    /// observed between passes and while waiting for the next one. A failed
    /// pass is logged and the full interval still elapses before the next.
    /// Dropping the shutdown sender also stops the loop.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_ms = self.config.interval_ms(),
            directory = self.directory.name(),
            "Scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            // Failures are logged by run_pass.
            let _ = self.run_pass().await;

            if !self.wait_for_next_pass(&mut shutdown).await {
                break;
            }
        }

        info!("Scheduler stopped");
    }

    async fn wait_for_next_pass(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        if *shutdown.borrow() {
            return false;
        }

        let sleep = tokio::time::sleep(self.config.interval);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return false;
                    }
                }
            }
        }
    }

    /// Run a single pass now.
    ///
    /// Waits for a pass already in progress to finish first, so passes
    /// never overlap.
    pub async fn run_pass(&self) -> MonitorResult<PassReport> {
        let _guard = self.pass_lock.lock().await;

        let pass_id = PassId::generate();
        let started_at = Utc::now();

        self.state.send_replace(SchedulerState::RunningPass);
        self.emit(pass_id, MonitorEvent::PassStarted);

        let span = info_span!("pass", pass_id = %pass_id);
        let outcome = self.execute_pass(pass_id).instrument(span).await;

        self.state.send_replace(SchedulerState::Idle);

        match outcome {
            Ok(outcome) => {
                let report = PassReport {
                    pass_id,
                    started_at,
                    finished_at: Utc::now(),
                    outcome,
                };

                match &report.outcome {
                    PassOutcome::Skipped { instances } => {
                        self.emit(pass_id, MonitorEvent::PassSkipped { instances: *instances });
                    }
                    PassOutcome::Reconciled {
                        instances, result, ..
                    } => {
                        info!(
                            pass_id = %pass_id,
                            fixed_apps = result.fixed_apps,
                            fixed_conflicts = result.fixed_conflicts,
                            duration_ms = report.duration_ms(),
                            "Pass completed"
                        );
                        self.emit(
                            pass_id,
                            MonitorEvent::PassCompleted {
                                instances: *instances,
                                result: *result,
                            },
                        );
                    }
                }

                Ok(report)
            }
            Err(e) => {
                error!(pass_id = %pass_id, error = %e, "Pass failed");
                self.emit(
                    pass_id,
                    MonitorEvent::PassFailed {
                        reason: e.to_string(),
                    },
                );
                Err(e)
            }
        }
    }

    async fn execute_pass(&self, pass_id: PassId) -> MonitorResult<PassOutcome> {
        let instances = self
            .directory
            .list_instances()
            .await
            .map_err(MonitorError::Discovery)?;

        if instances.len() < MIN_INSTANCES {
            info!(
                instances = instances.len(),
                "Not enough instances to compare, skipping pass"
            );
            return Ok(PassOutcome::Skipped {
                instances: instances.len(),
            });
        }

        info!(instances = instances.len(), "Starting reconciliation pass");

        let records = self.collector.collect(&instances).await?;

        let summary = DriftSummary::from_records(&records, instances.len());
        info!(
            apps = summary.total_apps,
            synchronized = summary.synchronized,
            dirty = summary.dirty,
            incomplete = summary.incomplete,
            "Classified cluster apps"
        );

        let report = self.reconciler.reconcile(&records, &instances).await;

        for attempt in &report.attempts {
            self.emit(
                pass_id,
                MonitorEvent::RepairAttempted {
                    app_id: attempt.app_id.clone(),
                    instance_id: attempt.instance_id.clone(),
                    success: attempt.success,
                },
            );
        }

        Ok(PassOutcome::Reconciled {
            instances: instances.len(),
            apps: summary.total_apps,
            candidates: summary.candidates(),
            result: report.result,
        })
    }

    fn emit(&self, pass_id: PassId, event: MonitorEvent) {
        let _ = self
            .event_tx
            .send(MonitorEventEnvelope::new(pass_id, event));
    }
}
