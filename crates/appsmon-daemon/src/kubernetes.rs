//! Instance discovery through kubectl

use appsmon_engine::{InstanceDirectory, TransportError, TransportResult};
use appsmon_types::{Instance, InstanceMap};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

const KUBECTL_ARGS: [&str; 5] = ["get", "pods", "-A", "-o", "json"];

/// Lists chat server pods across all namespaces.
pub struct KubectlDirectory {
    program: String,
    pod_prefix: String,
}

impl KubectlDirectory {
    pub fn new(pod_prefix: impl Into<String>) -> Self {
        Self {
            program: "kubectl".to_string(),
            pod_prefix: pod_prefix.into(),
        }
    }

    /// Use a different kubectl binary.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl InstanceDirectory for KubectlDirectory {
    async fn list_instances(&self) -> TransportResult<InstanceMap> {
        let output = Command::new(&self.program)
            .args(KUBECTL_ARGS)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TransportError::Command(format!("could not run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(TransportError::Command(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let instances = pods_to_instances(&output.stdout, &self.pod_prefix)?;
        debug!(instances = instances.len(), "Discovered pods");
        Ok(instances)
    }

    fn name(&self) -> &str {
        "kubernetes"
    }
}

#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Debug, Deserialize)]
struct Pod {
    metadata: Option<PodMetadata>,
    spec: Option<PodSpec>,
    status: Option<PodStatus>,
}

#[derive(Debug, Deserialize)]
struct PodMetadata {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PodSpec {
    #[serde(default)]
    containers: Vec<Container>,
}

#[derive(Debug, Deserialize)]
struct Container {
    #[serde(default)]
    ports: Vec<ContainerPort>,
}

#[derive(Debug, Deserialize)]
struct ContainerPort {
    #[serde(rename = "containerPort")]
    container_port: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct PodStatus {
    #[serde(rename = "podIP")]
    pod_ip: Option<String>,
}

impl Pod {
    /// Name, IP and first container port, when all are present.
    fn endpoint(self) -> Option<(String, String, u16)> {
        let name = self.metadata?.name?;
        let address = self.status?.pod_ip.filter(|ip| !ip.is_empty())?;
        let port = self
            .spec?
            .containers
            .first()?
            .ports
            .first()?
            .container_port?;

        Some((name, address, port))
    }
}

/// Turn `kubectl get pods -o json` output into instances.
///
/// Only pods named with `pod_prefix` that have an IP and a first container
/// port are kept. Pod names become instance IDs.
pub fn pods_to_instances(raw: &[u8], pod_prefix: &str) -> TransportResult<InstanceMap> {
    let pods: PodList = serde_json::from_slice(raw)
        .map_err(|e| TransportError::Decode(format!("could not parse kubectl output: {}", e)))?;

    Ok(pods
        .items
        .into_iter()
        .filter_map(Pod::endpoint)
        .filter(|(name, _, _)| name.starts_with(pod_prefix))
        .map(|(name, address, port)| {
            let instance = Instance::new(name, address, port);
            (instance.id.clone(), instance)
        })
        .collect())
}
