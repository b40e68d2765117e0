//! App status collection.
//!
//! Every instance is asked for its installed apps at once. Responses are
//! merged into per-app records by the collecting task alone, in the order
//! they complete, so the fetch futures never share mutable state.

use std::collections::HashMap;
use std::sync::Arc;

use appsmon_types::{AppId, ClusterAppRecord, Instance, InstalledApp, InstanceMap};
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, instrument};

use crate::collaborators::InstanceClient;
use crate::error::{MonitorError, MonitorResult};

/// Builds one [`ClusterAppRecord`] per app from a concurrent scan.
pub struct AppStatusCollector {
    client: Arc<dyn InstanceClient>,
    app_filter: Option<AppId>,
}

impl AppStatusCollector {
    pub fn new(client: Arc<dyn InstanceClient>, app_filter: Option<AppId>) -> Self {
        Self { client, app_filter }
    }

    /// Fetch every instance's apps and fold them into records.
    ///
    /// The first failing instance fails the whole collection; fetches still
    /// in flight are dropped and nothing collected so far is returned.
    /// Records come back in the order their app was first seen.
    #[instrument(skip(self, instances), fields(instances = instances.len()))]
    pub async fn collect(&self, instances: &InstanceMap) -> MonitorResult<Vec<ClusterAppRecord>> {
        let client = &self.client;

        let mut fetches: FuturesUnordered<_> = instances
            .values()
            .map(|instance| async move { (instance, client.installed_apps(instance).await) })
            .collect();

        let mut merged = MergedApps::default();

        while let Some((instance, result)) = fetches.next().await {
            let apps = result.map_err(|source| MonitorError::Collection {
                instance_id: instance.id.clone(),
                source,
            })?;

            debug!(
                instance_id = %instance.id,
                apps = apps.len(),
                "Collected installed apps"
            );

            merged.merge(instance, apps, self.app_filter.as_ref());
        }

        Ok(merged.into_records())
    }
}

/// Records plus an index by app ID, keeping first-seen order.
#[derive(Default)]
struct MergedApps {
    records: Vec<ClusterAppRecord>,
    index: HashMap<AppId, usize>,
}

impl MergedApps {
    fn merge(&mut self, instance: &Instance, apps: Vec<InstalledApp>, filter: Option<&AppId>) {
        for app in apps {
            if filter.is_some_and(|watched| *watched != app.id) {
                continue;
            }

            let slot = match self.index.get(&app.id) {
                Some(slot) => *slot,
                None => {
                    self.records
                        .push(ClusterAppRecord::new(app.id.clone(), app.name.clone()));
                    self.index.insert(app.id.clone(), self.records.len() - 1);
                    self.records.len() - 1
                }
            };

            self.records[slot].observe(instance.id.clone(), app.status);
        }
    }

    fn into_records(self) -> Vec<ClusterAppRecord> {
        self.records
    }
}
