//! Daemon lifecycle management

use std::future::Future;
use std::sync::Arc;

use appsmon_engine::{AlertSink, InstanceClient, InstanceDirectory, NoopAlertSink, Scheduler};
use appsmon_types::PassReport;
use tokio::sync::watch;
use tracing::{error, info};

use crate::client::{ChatServerClient, RoomAlertSink};
use crate::config::{DaemonConfig, DiscoveryConfig};
use crate::error::DaemonResult;
use crate::kubernetes::KubectlDirectory;

/// Apps Monitor daemon
pub struct Daemon {
    scheduler: Scheduler,
}

impl Daemon {
    /// Wire the collaborators selected by `config` into a scheduler.
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let client = Arc::new(ChatServerClient::new(
            &config.server_url,
            config.credentials.clone(),
        )?);

        let directory: Arc<dyn InstanceDirectory> = match &config.discovery {
            DiscoveryConfig::ClusterApi => client.clone(),
            DiscoveryConfig::Kubernetes { pod_prefix } => {
                Arc::new(KubectlDirectory::new(pod_prefix.clone()))
            }
        };

        let alerts: Arc<dyn AlertSink> = match &config.alert_room {
            Some(room) => Arc::new(RoomAlertSink::new(client.clone(), room.clone())),
            None => Arc::new(NoopAlertSink),
        };

        info!(
            server_url = %config.server_url,
            discovery = config.discovery.name(),
            interval_ms = config.monitor.interval_ms(),
            alerts = config.alert_room.is_some(),
            "Daemon configured"
        );

        Ok(Self::with_collaborators(config, directory, client, alerts))
    }

    /// Build a daemon around explicit collaborators.
    pub fn with_collaborators(
        config: DaemonConfig,
        directory: Arc<dyn InstanceDirectory>,
        client: Arc<dyn InstanceClient>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            scheduler: Scheduler::new(config.monitor, directory, client, alerts),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Run until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> DaemonResult<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `shutdown` resolves, then let the pass in progress finish.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> DaemonResult<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let run = self.scheduler.run(shutdown_rx);
        tokio::pin!(run);

        tokio::select! {
            _ = &mut run => return Ok(()),
            _ = shutdown => info!("Apps monitor shutting down"),
        }

        let _ = shutdown_tx.send(true);
        run.await;

        Ok(())
    }

    /// Run a single pass.
    pub async fn run_once(&self) -> DaemonResult<PassReport> {
        Ok(self.scheduler.run_pass().await?)
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigSource, Credentials};
    use appsmon_engine::testing::{FakeInstanceClient, RecordingAlertSink, StaticDirectory};
    use appsmon_engine::MonitorConfig;
    use appsmon_types::{InstalledApp, MonitorEvent};
    use std::time::Duration;

    fn config() -> DaemonConfig {
        DaemonConfig {
            monitor: MonitorConfig::default(),
            server_url: "http://localhost:3000".into(),
            credentials: Credentials {
                user_id: "monitor".into(),
                token: "secret".into(),
            },
            alert_room: None,
            discovery: DiscoveryConfig::ClusterApi,
            source: ConfigSource::Environment,
        }
    }

    fn drifted_daemon() -> (Daemon, Arc<FakeInstanceClient>, Arc<StaticDirectory>) {
        let directory = Arc::new(StaticDirectory::with_instances(2));
        let client = Arc::new(
            FakeInstanceClient::new()
                .with_apps("instance-0", vec![InstalledApp::new("x", "X", "enabled")])
                .with_apps("instance-1", vec![InstalledApp::new("x", "X", "disabled")]),
        );
        let daemon = Daemon::with_collaborators(
            config(),
            directory.clone(),
            client.clone(),
            Arc::new(RecordingAlertSink::new()),
        );
        (daemon, client, directory)
    }

    #[test]
    fn test_new_builds_from_config() {
        let mut config = config();
        config.alert_room = Some("ops".into());
        config.discovery = DiscoveryConfig::Kubernetes {
            pod_prefix: "rocketchat-".into(),
        };

        assert!(Daemon::new(config).is_ok());
    }

    #[tokio::test]
    async fn test_run_once() {
        let (daemon, client, _) = drifted_daemon();

        let report = daemon.run_once().await.unwrap();

        assert_eq!(report.result().fixed_conflicts, 1);
        assert_eq!(client.status_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_shutdown() {
        let (daemon, _, directory) = drifted_daemon();
        let mut events = daemon.scheduler().subscribe();

        let shutdown = async move {
            loop {
                if let Ok(envelope) = events.recv().await {
                    if matches!(envelope.event, MonitorEvent::PassCompleted { .. }) {
                        break;
                    }
                }
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        };

        daemon.run_until(shutdown).await.unwrap();

        assert_eq!(directory.calls(), 1);
    }
}
