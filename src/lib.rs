pub mod alerts;
pub mod analytics;
pub mod api;
pub mod cache;
pub mod config;
pub mod detector;
pub mod ingest;
pub mod observability;
pub mod query;
pub mod store;

use serde::{Deserialize, Serialize};

/// One metrics submission as it arrives on the wire from an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSubmission {
    /// Agent-side timestamp, passed through verbatim into alert reports.
    pub timestamp: Option<String>,
    pub server_info: ServerInfo,
    pub metrics: MetricsBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub server_id: String,
    pub hostname: String,
    pub ip: String,
    pub os: String,
}

/// The metrics block of a submission.
///
/// All fields are optional so that anomaly detection stays total over its
/// input domain; the ingestion coordinator rejects structurally incomplete
/// submissions before anything is stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsBody {
    pub cpu: Option<f64>,
    pub memory: Option<f64>,
    pub disk: Option<f64>,
    pub network: Option<NetworkStats>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

impl MetricsSubmission {
    /// Check structural completeness of the payload.
    ///
    /// Values are deliberately not range-checked: agents are trusted
    /// producers and out-of-range percentages are stored as-is.
    pub fn validate(&self) -> Result<(), String> {
        let mut missing = Vec::new();

        if self.server_info.server_id.is_empty() {
            missing.push("server_info.server_id");
        }
        if self.metrics.cpu.is_none() {
            missing.push("metrics.cpu");
        }
        if self.metrics.memory.is_none() {
            missing.push("metrics.memory");
        }
        if self.metrics.disk.is_none() {
            missing.push("metrics.disk");
        }
        if self.metrics.network.is_none() {
            missing.push("metrics.network");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("missing required fields: {}", missing.join(", ")))
        }
    }
}
