use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::trace;

/// Storage backend configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (demo mode, no persistence)
    Memory,

    /// SQLite database (default for most deployments)
    Sqlite {
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,

        /// Samples older than this are deleted by the retention task.
        /// Absent = keep everything.
        retention_days: Option<u32>,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
            retention_days: None,
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./fleet-metrics.db")
}

/// Cache TTLs per resource class, in seconds.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_server_ttl")]
    pub server_ttl_secs: u64,

    #[serde(default = "default_metrics_ttl")]
    pub metrics_ttl_secs: u64,

    #[serde(default = "default_server_metrics_ttl")]
    pub server_metrics_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            server_ttl_secs: default_server_ttl(),
            metrics_ttl_secs: default_metrics_ttl(),
            server_metrics_ttl_secs: default_server_metrics_ttl(),
        }
    }
}

impl CacheConfig {
    pub fn server_ttl(&self) -> Duration {
        Duration::from_secs(self.server_ttl_secs)
    }

    pub fn metrics_ttl(&self) -> Duration {
        Duration::from_secs(self.metrics_ttl_secs)
    }

    pub fn server_metrics_ttl(&self) -> Duration {
        Duration::from_secs(self.server_metrics_ttl_secs)
    }
}

fn default_server_ttl() -> u64 {
    300
}

fn default_metrics_ttl() -> u64 {
    60
}

fn default_server_metrics_ttl() -> u64 {
    120
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct AlertsConfig {
    pub email: Option<EmailConfig>,
    pub webhook: Option<Webhook>,

    /// Cooldown per (server, metric) pair before an identical breach is
    /// re-alerted. 0 disables suppression.
    #[serde(default = "default_suppression_secs")]
    pub suppression_secs: u64,
}

fn default_suppression_secs() -> u64 {
    900
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// Credentials; fall back to EMAIL_USER / EMAIL_PASSWORD env vars.
    pub username: Option<String>,
    pub password: Option<String>,

    pub from: Option<String>,
    pub to: Option<String>,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Webhook {
    pub url: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    pub auth_token: Option<String>,

    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            auth_token: None,
            enable_cors: true,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_enable_cors() -> bool {
    true
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub alerts: AlertsConfig,

    #[serde(default)]
    pub api: ApiSettings,

    /// How many recent samples to embed in a server detail response.
    #[serde(default = "default_tail_samples")]
    pub tail_samples: usize,
}

fn default_tail_samples() -> usize {
    10
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("invalid configuration file: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
