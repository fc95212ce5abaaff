//! Operational counters for the hub itself
//!
//! A dedicated prometheus registry exposed in text format at `/metrics`
//! for an external scraper. Updates are best-effort and never fail a
//! request.

use lazy_static::lazy_static;
use prometheus::{
    GaugeVec, HistogramVec, IntCounter, IntCounterVec, Registry, TextEncoder,
    register_gauge_vec_with_registry, register_histogram_vec_with_registry,
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
};

use crate::MetricsBody;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    /// Total successfully ingested submissions.
    pub static ref INGEST_TOTAL: IntCounter = register_int_counter_with_registry!(
        "ingest_total",
        "Total number of metric submissions ingested",
        REGISTRY
    )
    .unwrap();

    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec_with_registry!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"],
        REGISTRY
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec =
        register_histogram_vec_with_registry!(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
            &["method", "path"],
            vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0],
            REGISTRY
        )
        .unwrap();

    pub static ref CACHE_HITS_TOTAL: IntCounterVec = register_int_counter_vec_with_registry!(
        "cache_hits_total",
        "Total number of cache hits",
        &["cache_type"],
        REGISTRY
    )
    .unwrap();

    pub static ref CACHE_MISSES_TOTAL: IntCounterVec = register_int_counter_vec_with_registry!(
        "cache_misses_total",
        "Total number of cache misses",
        &["cache_type"],
        REGISTRY
    )
    .unwrap();

    /// Last reported value of each scalar metric, per server.
    pub static ref SYSTEM_METRICS_GAUGE: GaugeVec = register_gauge_vec_with_registry!(
        "system_metrics",
        "System metrics collected from servers",
        &["server_id", "metric"],
        REGISTRY
    )
    .unwrap();
}

/// Refresh the per-server gauges after an ingestion. Best-effort.
pub fn update_system_metrics(server_id: &str, metrics: &MetricsBody) {
    if let Some(cpu) = metrics.cpu {
        SYSTEM_METRICS_GAUGE
            .with_label_values(&[server_id, "cpu"])
            .set(cpu);
    }
    if let Some(memory) = metrics.memory {
        SYSTEM_METRICS_GAUGE
            .with_label_values(&[server_id, "memory"])
            .set(memory);
    }
    if let Some(disk) = metrics.disk {
        SYSTEM_METRICS_GAUGE
            .with_label_values(&[server_id, "disk"])
            .set(disk);
    }
    if let Some(network) = &metrics.network {
        SYSTEM_METRICS_GAUGE
            .with_label_values(&[server_id, "network_bytes_sent"])
            .set(network.bytes_sent as f64);
        SYSTEM_METRICS_GAUGE
            .with_label_values(&[server_id, "network_bytes_recv"])
            .set(network.bytes_recv as f64);
    }
}

/// Render the registry in the Prometheus text exposition format.
pub fn gather() -> String {
    TextEncoder::new()
        .encode_to_string(&REGISTRY.gather())
        .unwrap_or_default()
}
