//! In-memory collaborators for tests and local experiments.
//!
//! Each fake records the calls it receives so tests can assert on exactly
//! which commands a pass issued.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use appsmon_types::{AppId, AppStatus, Instance, InstalledApp, InstanceId, InstanceMap};
use async_trait::async_trait;

use crate::collaborators::{AlertSink, InstanceClient, InstanceDirectory, StatusChange};
use crate::error::{TransportError, TransportResult};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Directory returning a fixed membership, or a fixed failure.
pub struct StaticDirectory {
    response: Mutex<TransportResult<InstanceMap>>,
    calls: AtomicUsize,
}

impl StaticDirectory {
    pub fn new(instances: impl IntoIterator<Item = Instance>) -> Self {
        let map = instances
            .into_iter()
            .map(|instance| (instance.id.clone(), instance))
            .collect();

        Self {
            response: Mutex::new(Ok(map)),
            calls: AtomicUsize::new(0),
        }
    }

    /// Directory with `n` instances named `instance-0`, `instance-1`, …
    pub fn with_instances(n: usize) -> Self {
        Self::new((0..n).map(|i| {
            Instance::new(format!("instance-{}", i), format!("10.0.0.{}", i + 1), 3000)
        }))
    }

    pub fn failing(error: TransportError) -> Self {
        Self {
            response: Mutex::new(Err(error)),
            calls: AtomicUsize::new(0),
        }
    }

    /// Replace the membership returned from now on.
    pub fn set_instances(&self, instances: impl IntoIterator<Item = Instance>) {
        let map = instances
            .into_iter()
            .map(|instance| (instance.id.clone(), instance))
            .collect();
        *lock(&self.response) = Ok(map);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InstanceDirectory for StaticDirectory {
    async fn list_instances(&self) -> TransportResult<InstanceMap> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.response).clone()
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[derive(Default)]
struct FakeInstance {
    apps: Vec<InstalledApp>,
    delay: Duration,
    list_failure: Option<TransportError>,
    status_reply: Option<TransportResult<StatusChange>>,
}

/// Instance client serving canned app lists.
///
/// Unknown instances fail with [`TransportError::Connect`]. Status changes
/// succeed unless a refusal or failure was configured for the instance.
#[derive(Default)]
pub struct FakeInstanceClient {
    instances: HashMap<InstanceId, FakeInstance>,
    list_calls: AtomicUsize,
    status_calls: Mutex<Vec<(InstanceId, AppId, AppStatus)>>,
}

impl FakeInstanceClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, instance_id: &str) -> &mut FakeInstance {
        self.instances
            .entry(InstanceId::new(instance_id))
            .or_default()
    }

    pub fn with_apps(mut self, instance_id: &str, apps: Vec<InstalledApp>) -> Self {
        self.entry(instance_id).apps = apps;
        self
    }

    /// Delay the app list response, to control completion order.
    pub fn with_delay(mut self, instance_id: &str, delay: Duration) -> Self {
        self.entry(instance_id).delay = delay;
        self
    }

    pub fn with_list_failure(mut self, instance_id: &str, error: TransportError) -> Self {
        self.entry(instance_id).list_failure = Some(error);
        self
    }

    /// Answer status changes on this instance with `success: false`.
    pub fn with_status_refusal(mut self, instance_id: &str, error: &str) -> Self {
        self.entry(instance_id).status_reply = Some(Ok(StatusChange::refused(error)));
        self
    }

    pub fn with_status_failure(mut self, instance_id: &str, error: TransportError) -> Self {
        self.entry(instance_id).status_reply = Some(Err(error));
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Status changes received, in order.
    pub fn status_calls(&self) -> Vec<(InstanceId, AppId, AppStatus)> {
        lock(&self.status_calls).clone()
    }
}

#[async_trait]
impl InstanceClient for FakeInstanceClient {
    async fn installed_apps(&self, instance: &Instance) -> TransportResult<Vec<InstalledApp>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let fake = self
            .instances
            .get(&instance.id)
            .ok_or_else(|| TransportError::Connect {
                target: instance.address.clone(),
                reason: "unknown instance".into(),
            })?;

        if !fake.delay.is_zero() {
            tokio::time::sleep(fake.delay).await;
        }

        match &fake.list_failure {
            Some(error) => Err(error.clone()),
            None => Ok(fake.apps.clone()),
        }
    }

    async fn set_app_status(
        &self,
        instance: &Instance,
        app_id: &AppId,
        status: &AppStatus,
    ) -> TransportResult<StatusChange> {
        lock(&self.status_calls).push((
            instance.id.clone(),
            app_id.clone(),
            status.clone(),
        ));

        self.instances
            .get(&instance.id)
            .and_then(|fake| fake.status_reply.clone())
            .unwrap_or_else(|| Ok(StatusChange::applied()))
    }
}

/// Alert sink that keeps every message it was asked to send.
#[derive(Default)]
pub struct RecordingAlertSink {
    messages: Mutex<Vec<String>>,
    failure: Option<TransportError>,
}

impl RecordingAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that records messages and then reports `error` for each.
    pub fn failing(error: TransportError) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            failure: Some(error),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        lock(&self.messages).clone()
    }
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn send_alert(&self, message: &str) -> TransportResult<()> {
        lock(&self.messages).push(message.to_string());

        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}
