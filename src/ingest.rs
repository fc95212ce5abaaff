//! Ingestion pipeline: validate, persist, detect, invalidate, notify.
//!
//! One submission flows through exactly this order:
//!
//! 1. validate the payload (reject before touching the store)
//! 2. persist server identity + sample in one transaction
//! 3. run threshold detection on the stored values
//! 4. invalidate the cache keys the new sample makes stale
//! 5. hand any breaches to the alert actor (non-blocking)
//!
//! Detection and alerting never fail a submission; the client gets 201
//! once the transaction commits.

use std::fmt::Display;
use std::sync::Arc;

use tracing::{debug, instrument, trace};

use crate::alerts::{actor::AlertHandle, AlertEvent};
use crate::cache::ResponseCache;
use crate::detector;
use crate::observability;
use crate::store::{MetricSample, MetricStore, NewSample, NewServer, StoreError};
use crate::MetricsSubmission;

#[derive(Debug)]
pub enum IngestError {
    /// Payload failed structural validation; names the offending field.
    Validation(String),
    Store(StoreError),
}

impl Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::Validation(msg) => write!(f, "invalid submission: {msg}"),
            IngestError::Store(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<StoreError> for IngestError {
    fn from(e: StoreError) -> Self {
        IngestError::Store(e)
    }
}

pub struct IngestionCoordinator {
    store: Arc<dyn MetricStore>,
    cache: Arc<ResponseCache>,
    alerts: AlertHandle,
}

impl IngestionCoordinator {
    pub fn new(
        store: Arc<dyn MetricStore>,
        cache: Arc<ResponseCache>,
        alerts: AlertHandle,
    ) -> Self {
        Self {
            store,
            cache,
            alerts,
        }
    }

    /// Process one agent submission end to end. Returns the stored
    /// sample on success.
    #[instrument(skip(self, submission), fields(server_id = %submission.server_info.server_id))]
    pub async fn ingest(&self, submission: MetricsSubmission) -> Result<MetricSample, IngestError> {
        submission.validate().map_err(IngestError::Validation)?;

        let server = NewServer::from(&submission.server_info);
        let sample = NewSample {
            cpu_usage: submission.metrics.cpu.unwrap_or(0.0),
            memory_usage: submission.metrics.memory.unwrap_or(0.0),
            disk_usage: submission.metrics.disk.unwrap_or(0.0),
            network_stats: submission.metrics.network.unwrap_or_default(),
        };

        let (identity, stored) = self.store.record_submission(&server, &sample).await?;

        observability::INGEST_TOTAL.inc();
        observability::update_system_metrics(&identity.server_id, &submission.metrics);

        // A committed sample makes all list views and this server's
        // cached detail stale.
        self.invalidate_after_ingest(&identity.server_id).await;

        let anomalies = detector::detect(&submission.metrics);
        if !anomalies.is_empty() {
            debug!(
                "anomalies detected on {}: {}",
                identity.server_id,
                anomalies
                    .entries()
                    .iter()
                    .map(|(name, value)| format!("{name}={value}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            );

            self.alerts.notify(AlertEvent {
                server: identity,
                anomalies,
                timestamp: submission
                    .timestamp
                    .unwrap_or_else(|| stored.created_at.to_rfc3339()),
            });
        } else {
            trace!("sample within all thresholds");
        }

        Ok(stored)
    }

    async fn invalidate_after_ingest(&self, server_id: &str) {
        self.cache.invalidate_prefix("metrics:list").await;
        self.cache
            .invalidate_prefix(&format!("metrics:server:{server_id}"))
            .await;
        self.cache
            .invalidate_prefix(&format!("servers:detail:{server_id}"))
            .await;
    }
}
