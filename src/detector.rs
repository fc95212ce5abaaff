//! Threshold-based anomaly detection
//!
//! `detect` is a pure function from a metrics snapshot to the set of
//! threshold breaches. It is total over its input: missing fields are
//! skipped, never errors. The empty result is the common case and
//! allocates nothing.

use serde::Serialize;

use crate::MetricsBody;

/// CPU usage threshold (percent, exceed = strictly greater).
pub const CPU_THRESHOLD: f64 = 80.0;

/// Memory usage threshold (percent).
pub const MEMORY_THRESHOLD: f64 = 90.0;

/// Disk usage threshold (percent).
pub const DISK_THRESHOLD: f64 = 85.0;

/// Network bytes-sent threshold (1 MB).
pub const NET_BYTES_SENT_THRESHOLD: u64 = 1_000_000;

/// Network bytes-recv threshold (1 MB).
pub const NET_BYTES_RECV_THRESHOLD: u64 = 1_000_000;

/// The set of metrics whose values exceed their thresholds.
///
/// Serialization omits non-breaching fields entirely, so an empty set
/// serializes to `{}` and a nested network group without breaches is not
/// reported as an empty group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnomalySet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkAnomalies>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NetworkAnomalies {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_sent: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_recv: Option<u64>,
}

impl AnomalySet {
    pub fn is_empty(&self) -> bool {
        self.cpu.is_none() && self.memory.is_none() && self.disk.is_none() && self.network.is_none()
    }

    /// Breaching metrics as `(name, value)` pairs for report formatting and
    /// suppression bookkeeping. Nested network breaches use dotted names.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = Vec::new();

        if let Some(cpu) = self.cpu {
            entries.push(("cpu", format!("{cpu}")));
        }
        if let Some(memory) = self.memory {
            entries.push(("memory", format!("{memory}")));
        }
        if let Some(disk) = self.disk {
            entries.push(("disk", format!("{disk}")));
        }
        if let Some(network) = &self.network {
            if let Some(sent) = network.bytes_sent {
                entries.push(("network.bytes_sent", format!("{sent}")));
            }
            if let Some(recv) = network.bytes_recv {
                entries.push(("network.bytes_recv", format!("{recv}")));
            }
        }

        entries
    }

    /// Drop the named breaches, collapsing an emptied network group.
    pub fn without(&self, names: &[&str]) -> AnomalySet {
        let mut filtered = self.clone();

        if names.contains(&"cpu") {
            filtered.cpu = None;
        }
        if names.contains(&"memory") {
            filtered.memory = None;
        }
        if names.contains(&"disk") {
            filtered.disk = None;
        }
        if let Some(mut network) = filtered.network {
            if names.contains(&"network.bytes_sent") {
                network.bytes_sent = None;
            }
            if names.contains(&"network.bytes_recv") {
                network.bytes_recv = None;
            }
            filtered.network =
                (network.bytes_sent.is_some() || network.bytes_recv.is_some()).then_some(network);
        }

        filtered
    }
}

/// Evaluate a metrics snapshot against the fixed thresholds.
///
/// Each scalar metric is compared independently; network sub-fields are
/// evaluated against their own thresholds and the nested group is omitted
/// when neither breaches.
pub fn detect(metrics: &MetricsBody) -> AnomalySet {
    let mut anomalies = AnomalySet::default();

    anomalies.cpu = metrics.cpu.filter(|cpu| *cpu > CPU_THRESHOLD);
    anomalies.memory = metrics.memory.filter(|memory| *memory > MEMORY_THRESHOLD);
    anomalies.disk = metrics.disk.filter(|disk| *disk > DISK_THRESHOLD);

    if let Some(network) = &metrics.network {
        let bytes_sent = (network.bytes_sent > NET_BYTES_SENT_THRESHOLD).then_some(network.bytes_sent);
        let bytes_recv = (network.bytes_recv > NET_BYTES_RECV_THRESHOLD).then_some(network.bytes_recv);

        if bytes_sent.is_some() || bytes_recv.is_some() {
            anomalies.network = Some(NetworkAnomalies {
                bytes_sent,
                bytes_recv,
            });
        }
    }

    anomalies
}
