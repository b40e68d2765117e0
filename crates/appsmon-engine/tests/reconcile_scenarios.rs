//! End-to-end pass behaviour against in-memory collaborators.

use std::sync::Arc;

use appsmon_engine::testing::{FakeInstanceClient, RecordingAlertSink, StaticDirectory};
use appsmon_engine::{MonitorConfig, MonitorError, Scheduler, TransportError};
use appsmon_types::{AppStatus, InstalledApp, InstanceId, PassOutcome, ReconciliationResult};
use proptest::prelude::*;

struct Harness {
    directory: Arc<StaticDirectory>,
    client: Arc<FakeInstanceClient>,
    alerts: Arc<RecordingAlertSink>,
    scheduler: Scheduler,
}

fn harness(instances: usize, client: FakeInstanceClient) -> Harness {
    let directory = Arc::new(StaticDirectory::with_instances(instances));
    let client = Arc::new(client);
    let alerts = Arc::new(RecordingAlertSink::new());

    let scheduler = Scheduler::new(
        MonitorConfig::default(),
        directory.clone(),
        client.clone(),
        alerts.clone(),
    );

    Harness {
        directory,
        client,
        alerts,
        scheduler,
    }
}

/// Client where `instance-i` reports app `X` with `statuses[i]`.
fn app_x(statuses: &[&str]) -> FakeInstanceClient {
    statuses
        .iter()
        .enumerate()
        .fold(FakeInstanceClient::new(), |client, (i, status)| {
            client.with_apps(
                &format!("instance-{}", i),
                vec![InstalledApp::new("X", "App X", *status)],
            )
        })
}

// ============================================================================
// Acceptance scenarios
// ============================================================================

#[tokio::test]
async fn consistent_cluster_needs_no_repair() {
    let h = harness(3, app_x(&["enabled", "enabled", "enabled"]));

    let report = h.scheduler.run_pass().await.unwrap();

    assert_eq!(report.result(), ReconciliationResult::default());
    assert!(h.client.status_calls().is_empty());
    assert!(h.alerts.messages().is_empty());
}

#[tokio::test]
async fn single_disabled_instance_is_enabled() {
    let h = harness(3, app_x(&["enabled", "disabled", "enabled"]));

    let report = h.scheduler.run_pass().await.unwrap();

    let calls = h.client.status_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, InstanceId::new("instance-1"));
    assert_eq!(calls[0].2, AppStatus::manually_enabled());
    assert_eq!(
        report.result(),
        ReconciliationResult {
            fixed_apps: 1,
            fixed_conflicts: 1
        }
    );
    assert_eq!(h.alerts.messages().len(), 1);
}

#[tokio::test]
async fn app_missing_from_an_instance_is_not_installed_there() {
    let client = FakeInstanceClient::new()
        .with_apps("instance-0", vec![InstalledApp::new("Y", "App Y", "disabled")])
        .with_apps("instance-1", vec![]);
    let h = harness(2, client);

    let report = h.scheduler.run_pass().await.unwrap();

    let calls = h.client.status_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, InstanceId::new("instance-0"));
    match report.outcome {
        PassOutcome::Reconciled { candidates, .. } => assert_eq!(candidates, 1),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn app_missing_but_enabled_elsewhere_is_left_alone() {
    let client = FakeInstanceClient::new()
        .with_apps("instance-0", vec![InstalledApp::new("Y", "App Y", "enabled")])
        .with_apps("instance-1", vec![]);
    let h = harness(2, client);

    let report = h.scheduler.run_pass().await.unwrap();

    assert!(h.client.status_calls().is_empty());
    assert_eq!(report.result(), ReconciliationResult::default());
}

#[tokio::test]
async fn single_instance_cluster_skips_collection() {
    let h = harness(1, app_x(&["disabled"]));

    let report = h.scheduler.run_pass().await.unwrap();

    assert!(report.is_skipped());
    assert_eq!(h.directory.calls(), 1);
    assert_eq!(h.client.list_calls(), 0);
    assert!(h.client.status_calls().is_empty());
}

#[tokio::test]
async fn empty_cluster_skips_collection() {
    let h = harness(0, FakeInstanceClient::new());

    let report = h.scheduler.run_pass().await.unwrap();

    assert_eq!(report.outcome, PassOutcome::Skipped { instances: 0 });
    assert_eq!(h.client.list_calls(), 0);
}

#[test]
fn too_short_interval_is_rejected() {
    let mut config = MonitorConfig::default();

    assert!(!config.apply_interval_ms(1000));
    assert_eq!(config.interval_ms(), 300_000);

    assert!(config.apply_interval_ms(45_000));
    assert!(!config.apply_interval_ms(1000));
    assert_eq!(config.interval_ms(), 45_000);
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn collection_failure_issues_no_commands() {
    let client = app_x(&["enabled", "disabled", "enabled"])
        .with_list_failure("instance-2", TransportError::Forbidden);
    let h = harness(3, client);

    let err = h.scheduler.run_pass().await.unwrap_err();

    assert!(matches!(err, MonitorError::Collection { .. }));
    assert!(h.client.status_calls().is_empty());
    assert!(h.alerts.messages().is_empty());
}

#[tokio::test]
async fn membership_change_is_picked_up_next_pass() {
    let h = harness(1, app_x(&["enabled", "disabled"]));
    assert!(h.scheduler.run_pass().await.unwrap().is_skipped());

    h.directory.set_instances(
        (0..2).map(|i| appsmon_types::Instance::new(format!("instance-{}", i), "10.0.0.9", 3000)),
    );
    let report = h.scheduler.run_pass().await.unwrap();

    assert_eq!(report.result().fixed_conflicts, 1);
}

// ============================================================================
// Properties
// ============================================================================

fn status() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("enabled"), Just("manually_enabled"), Just("disabled")]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Counters never disagree with each other or with the commands sent.
    #[test]
    fn counters_are_consistent(statuses in prop::collection::vec(status(), 2..6)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let h = harness(statuses.len(), app_x(&statuses));
        let report = rt.block_on(h.scheduler.run_pass()).unwrap();
        let result = report.result();

        prop_assert!(result.fixed_apps <= result.fixed_conflicts);
        prop_assert!(result.fixed_apps <= 1);
        prop_assert_eq!(result.fixed_conflicts, h.client.status_calls().len());

        let all_same = statuses.windows(2).all(|w| w[0] == w[1]);
        if all_same {
            prop_assert_eq!(result.fixed_conflicts, 0);
        } else {
            let unhealthy = statuses.iter().filter(|s| **s == "disabled").count();
            prop_assert_eq!(result.fixed_conflicts, unhealthy);
        }
    }
}
