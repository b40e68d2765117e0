//! Configuration for appsmon-daemon
//!
//! Settings come from exactly one source: the JSON config file when it
//! exists, otherwise the process environment. The raw values are then
//! validated into a [`DaemonConfig`].

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use appsmon_engine::MonitorConfig;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{DaemonError, DaemonResult};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "apps-monitor-config.json";

/// Server used when none is configured.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Pod name prefix of chat server pods.
pub const DEFAULT_POD_PREFIX: &str = "rocketchat-";

/// Settings as written in the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
    /// Milliseconds between passes; a number or a numeric string.
    pub interval: Option<serde_json::Value>,

    #[serde(rename = "userPAT")]
    pub user_pat: Option<String>,

    #[serde(rename = "userId")]
    pub user_id: Option<String>,

    #[serde(rename = "alertRoom")]
    pub alert_room: Option<String>,

    #[serde(rename = "appId")]
    pub app_id: Option<String>,

    #[serde(rename = "serverURL")]
    pub server_url: Option<String>,

    pub discovery: Option<String>,

    #[serde(rename = "podPrefix")]
    pub pod_prefix: Option<String>,
}

/// Settings as read from the environment. Keys arrive lowercased.
#[derive(Debug, Default, Deserialize)]
struct EnvSettings {
    interval_ms: Option<String>,
    user_pat: Option<String>,
    user_id: Option<String>,
    alert_room: Option<String>,
    app_id: Option<String>,
    server_url: Option<String>,
    discovery: Option<String>,
    pod_prefix: Option<String>,
}

impl From<EnvSettings> for RawConfig {
    fn from(env: EnvSettings) -> Self {
        Self {
            interval: non_empty(env.interval_ms).map(serde_json::Value::String),
            user_pat: env.user_pat,
            user_id: env.user_id,
            alert_room: env.alert_room,
            app_id: env.app_id,
            server_url: env.server_url,
            discovery: env.discovery,
            pod_prefix: env.pod_prefix,
        }
    }
}

impl RawConfig {
    /// Parse a JSON config file.
    pub fn from_file(path: &Path) -> DaemonResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Read `INTERVAL_MS`, `USER_PAT`, `USER_ID`, `ALERT_ROOM`, `APP_ID`,
    /// `SERVER_URL`, `DISCOVERY` and `POD_PREFIX`.
    pub fn from_environment() -> DaemonResult<Self> {
        Self::from_env_source(config::Environment::default())
    }

    fn from_env_source(env: config::Environment) -> DaemonResult<Self> {
        let settings: EnvSettings = config::Config::builder()
            .add_source(env)
            .build()?
            .try_deserialize()?;

        Ok(settings.into())
    }
}

/// Where the active settings were read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Environment,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file {}", path.display()),
            Self::Environment => write!(f, "environment"),
        }
    }
}

/// Instance discovery provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryConfig {
    /// Ask the chat server for its cluster members.
    ClusterApi,

    /// List pods with kubectl.
    Kubernetes { pod_prefix: String },
}

impl DiscoveryConfig {
    fn parse(name: Option<String>, pod_prefix: Option<String>) -> DaemonResult<Self> {
        match non_empty(name).as_deref() {
            None | Some("cluster-api") => Ok(Self::ClusterApi),
            Some("kubernetes") => Ok(Self::Kubernetes {
                pod_prefix: non_empty(pod_prefix)
                    .unwrap_or_else(|| DEFAULT_POD_PREFIX.to_string()),
            }),
            Some(other) => Err(DaemonError::Config(format!(
                "unknown discovery provider {:?}, expected \"cluster-api\" or \"kubernetes\"",
                other
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ClusterApi => "cluster-api",
            Self::Kubernetes { .. } => "kubernetes",
        }
    }
}

/// API credentials of the monitoring user.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: String,
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Main daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Engine settings
    pub monitor: MonitorConfig,

    /// Base URL of the chat server, without a trailing slash
    pub server_url: String,

    pub credentials: Credentials,

    /// Room receiving drift alerts; alerts are disabled without one
    pub alert_room: Option<String>,

    pub discovery: DiscoveryConfig,

    pub source: ConfigSource,
}

impl DaemonConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`] is
    /// used when present and the environment otherwise.
    pub fn load(path: Option<&Path>) -> DaemonResult<Self> {
        let (raw, source) = match path {
            Some(path) => (
                RawConfig::from_file(path).map_err(|e| {
                    DaemonError::Config(format!(
                        "could not read config file {}: {}",
                        path.display(),
                        e
                    ))
                })?,
                ConfigSource::File(path.to_path_buf()),
            ),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                match std::fs::metadata(path) {
                    Ok(_) => (
                        RawConfig::from_file(path)?,
                        ConfigSource::File(path.to_path_buf()),
                    ),
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        (RawConfig::from_environment()?, ConfigSource::Environment)
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        Self::from_raw(raw, source)
    }

    /// Validate raw settings.
    ///
    /// Missing credentials, a malformed server URL or an unknown discovery
    /// provider are errors. A bad interval, a missing alert room and an app
    /// filter only produce warnings.
    pub fn from_raw(raw: RawConfig, source: ConfigSource) -> DaemonResult<Self> {
        info!(source = %source, "Loading configuration");

        let mut monitor = MonitorConfig::default();

        if let Some(value) = raw.interval.as_ref() {
            match parse_interval_ms(value) {
                Some(interval_ms) => {
                    monitor.apply_interval_ms(interval_ms);
                }
                None => warn!(
                    value = %value,
                    kept_interval_ms = monitor.interval_ms(),
                    "Configured interval is not a number, ignoring"
                ),
            }
        }

        let token = non_empty(raw.user_pat).ok_or_else(|| {
            DaemonError::Config(format!("invalid personal access token from {}", source))
        })?;

        let user_id = non_empty(raw.user_id)
            .ok_or_else(|| DaemonError::Config(format!("invalid user id from {}", source)))?;

        let server_url = validate_server_url(
            non_empty(raw.server_url).unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
        )?;

        let alert_room = non_empty(raw.alert_room);
        if alert_room.is_none() {
            warn!("No alert room configured, drift alerts will not be sent");
        }

        if let Some(app_id) = non_empty(raw.app_id) {
            warn!(app_id = %app_id, "App id configured, watching restricted to this app");
            monitor = monitor.with_app_filter(app_id);
        }

        let discovery = DiscoveryConfig::parse(raw.discovery, raw.pod_prefix)?;

        Ok(Self {
            monitor,
            server_url,
            credentials: Credentials { user_id, token },
            alert_room,
            discovery,
            source,
        })
    }
}

/// Whole milliseconds from a number or a numeric string; fractions truncate.
fn parse_interval_ms(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(whole_ms)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.parse().ok().or_else(|| s.parse().ok().and_then(whole_ms))
        }
        _ => None,
    }
}

fn whole_ms(ms: f64) -> Option<u64> {
    (ms.is_finite() && ms >= 0.0).then(|| ms as u64)
}

fn validate_server_url(url: String) -> DaemonResult<String> {
    let parsed = reqwest::Url::parse(&url)
        .map_err(|e| DaemonError::Config(format!("invalid server URL {:?}: {}", url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DaemonError::Config(format!(
            "invalid server URL {:?}: expected an http or https URL",
            url
        )));
    }

    Ok(url.trim_end_matches('/').to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
