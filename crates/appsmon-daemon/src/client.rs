//! HTTP client for the chat server REST API

use std::sync::Arc;
use std::time::Duration;

use appsmon_engine::{
    AlertSink, InstanceClient, InstanceDirectory, StatusChange, TransportError, TransportResult,
};
use appsmon_types::{AppId, AppStatus, Instance, InstalledApp, InstanceMap};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, RequestBuilder, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Credentials;
use crate::error::DaemonResult;

/// Authenticated client for one chat server cluster.
///
/// Cluster-level calls go to the configured server URL. App calls go
/// straight to each instance's own address and port.
pub struct ChatServerClient {
    client: Client,
    server_url: String,
    credentials: Credentials,
}

#[derive(Debug, Deserialize)]
struct InstancesResponse {
    success: Option<bool>,
    error: Option<String>,
    instances: Option<Vec<ClusterInstance>>,
}

#[derive(Debug, Deserialize)]
struct ClusterInstance {
    address: String,
    #[serde(rename = "instanceRecord")]
    record: InstanceRecord,
}

#[derive(Debug, Deserialize)]
struct InstanceRecord {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "extraInformation", default)]
    extra: Option<ExtraInformation>,
}

#[derive(Debug, Deserialize)]
struct ExtraInformation {
    port: Option<PortValue>,
}

/// Ports are reported as strings, occasionally as numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u64),
    Text(String),
}

impl PortValue {
    fn as_port(&self) -> Option<u16> {
        match self {
            Self::Number(n) => u16::try_from(*n).ok(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AppsResponse {
    success: Option<bool>,
    error: Option<String>,
    apps: Option<Vec<InstalledApp>>,
}

#[derive(Debug, Deserialize)]
struct SuccessResponse {
    success: bool,
    error: Option<String>,
}

#[derive(Serialize)]
struct StatusRequest<'a> {
    status: &'a AppStatus,
}

/// Whether a non-2xx response body is decoded or reported as [`TransportError::Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorBody {
    Reject,
    Decode,
}

#[derive(Serialize)]
struct PostMessageRequest<'a> {
    #[serde(rename = "roomId")]
    room_id: &'a str,
    text: &'a str,
}

impl ChatServerClient {
    /// Create a new client
    pub fn new(server_url: &str, credentials: Credentials) -> DaemonResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Post a message to a room.
    pub async fn post_message(&self, room_id: &str, text: &str) -> TransportResult<()> {
        let url = format!("{}/api/v1/chat.postMessage", self.server_url);
        let response: SuccessResponse = self
            .post(&url, &PostMessageRequest { room_id, text }, ErrorBody::Reject)
            .await?;

        if response.success {
            Ok(())
        } else {
            Err(TransportError::Remote(
                response
                    .error
                    .unwrap_or_else(|| "message was not posted".into()),
            ))
        }
    }

    /// `http://address:port/` followed by `segments`, each percent-encoded.
    fn instance_url(instance: &Instance, segments: &[&str]) -> TransportResult<Url> {
        let base = format!("http://{}:{}/", instance.address, instance.port);
        let invalid = |reason: String| TransportError::Connect {
            target: base.clone(),
            reason,
        };

        let mut url = Url::parse(&base).map_err(|e| invalid(format!("invalid address: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| invalid("invalid address: not a base URL".into()))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    fn authenticated(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("X-User-Id", &self.credentials.user_id)
            .header("X-Auth-Token", &self.credentials.token)
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> TransportResult<T> {
        let request = self.authenticated(self.client.get(url));
        self.send(url, request, ErrorBody::Reject).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
        error_body: ErrorBody,
    ) -> TransportResult<T> {
        let request = self.authenticated(self.client.post(url).json(body));
        self.send(url, request, error_body).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        url: &str,
        request: RequestBuilder,
        error_body: ErrorBody,
    ) -> TransportResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| self.connect_error(url, e))?;

        self.handle_response(url, response, error_body).await
    }

    /// Normalize a response.
    ///
    /// 401 and 403 map to auth errors, then the body must be JSON. Other
    /// non-2xx responses are [`TransportError::Status`] unless `error_body`
    /// asks for the body to be decoded anyway.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        url: &str,
        response: reqwest::Response,
        error_body: ErrorBody,
    ) -> TransportResult<T> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(TransportError::Unauthorized);
        }
        if status == StatusCode::FORBIDDEN {
            return Err(TransportError::Forbidden);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !is_json(&content_type) {
            return Err(TransportError::UnexpectedContentType(content_type));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.connect_error(url, e))?;

        if !status.is_success() && error_body == ErrorBody::Reject {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(e) if status.is_success() => Err(TransportError::Decode(e.to_string())),
            Err(_) => Err(TransportError::Status {
                status: status.as_u16(),
                body,
            }),
        }
    }

    fn connect_error(&self, url: &str, e: reqwest::Error) -> TransportError {
        if url.starts_with(&self.server_url) {
            warn!(
                server_url = %self.server_url,
                error = %e,
                "Could not reach the chat server, check your configuration"
            );
        }

        TransportError::Connect {
            target: url.to_string(),
            reason: e.to_string(),
        }
    }
}

fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|media_type| media_type.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

#[async_trait]
impl InstanceDirectory for ChatServerClient {
    async fn list_instances(&self) -> TransportResult<InstanceMap> {
        let url = format!("{}/api/v1/instances.get", self.server_url);
        let response: InstancesResponse = self.get(&url).await?;

        if response.success != Some(true) {
            if let Some(error) = response.error {
                return Err(TransportError::Remote(error));
            }
        }

        let entries = response
            .instances
            .ok_or_else(|| TransportError::Decode("response has no instances field".into()))?;

        let mut instances = InstanceMap::new();

        for entry in entries {
            let port = entry
                .record
                .extra
                .as_ref()
                .and_then(|extra| extra.port.as_ref())
                .and_then(PortValue::as_port);

            let Some(port) = port else {
                warn!(
                    instance_id = %entry.record.id,
                    "Instance reported no usable port, skipping"
                );
                continue;
            };

            let instance = Instance::new(entry.record.id, entry.address, port);
            instances.insert(instance.id.clone(), instance);
        }

        debug!(instances = instances.len(), "Discovered cluster instances");
        Ok(instances)
    }

    fn name(&self) -> &str {
        "cluster-api"
    }
}

#[async_trait]
impl InstanceClient for ChatServerClient {
    async fn installed_apps(&self, instance: &Instance) -> TransportResult<Vec<InstalledApp>> {
        let url = Self::instance_url(instance, &["api", "apps", "installed"])?;
        let response: AppsResponse = self.get(url.as_str()).await?;

        if response.success == Some(false) {
            return Err(TransportError::Remote(
                response
                    .error
                    .unwrap_or_else(|| "app list not available".into()),
            ));
        }

        response
            .apps
            .ok_or_else(|| TransportError::Decode("response has no apps field".into()))
    }

    async fn set_app_status(
        &self,
        instance: &Instance,
        app_id: &AppId,
        status: &AppStatus,
    ) -> TransportResult<StatusChange> {
        let url = Self::instance_url(instance, &["api", "apps", app_id.as_str(), "status"])?;
        let response: SuccessResponse = self
            .post(url.as_str(), &StatusRequest { status }, ErrorBody::Decode)
            .await?;

        Ok(StatusChange {
            success: response.success,
            error: response.error,
        })
    }
}

/// Sends drift alerts to one chat room.
pub struct RoomAlertSink {
    client: Arc<ChatServerClient>,
    room_id: String,
}

impl RoomAlertSink {
    pub fn new(client: Arc<ChatServerClient>, room_id: impl Into<String>) -> Self {
        Self {
            client,
            room_id: room_id.into(),
        }
    }
}

#[async_trait]
impl AlertSink for RoomAlertSink {
    async fn send_alert(&self, message: &str) -> TransportResult<()> {
        self.client.post_message(&self.room_id, message).await
    }
}
