//! Row types stored by the metric record store
//!
//! Two tables, one relationship: a `ServerIdentity` owns many
//! `MetricSample`s, ordered by creation time. Samples are append-only; the
//! only way one disappears is an explicit delete or the cascade that runs
//! when its server identity is deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{NetworkStats, ServerInfo};

/// The stable record describing one monitored host.
///
/// `server_id` is unique and immutable once created. `updated_at` advances
/// on every upsert, including pure last-seen refreshes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerIdentity {
    pub server_id: String,
    pub hostname: String,
    pub ip_address: String,
    pub os_info: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One timestamped measurement snapshot from a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Store-assigned, strictly increasing across the store's lifetime.
    pub id: i64,
    pub server_id: String,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub network_stats: NetworkStats,
    pub created_at: DateTime<Utc>,
}

/// Mutable identity fields of a server, as supplied by a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewServer {
    pub server_id: String,
    pub hostname: String,
    pub ip_address: String,
    pub os_info: String,
}

impl From<&ServerInfo> for NewServer {
    fn from(info: &ServerInfo) -> Self {
        Self {
            server_id: info.server_id.clone(),
            hostname: info.hostname.clone(),
            ip_address: info.ip.clone(),
            os_info: info.os.clone(),
        }
    }
}

/// Values for a sample about to be appended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewSample {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub network_stats: NetworkStats,
}
