//! Store trait definition

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::StoreResult;
use super::schema::{MetricSample, NewSample, NewServer, ServerIdentity};

/// Health status of the store
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the store operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: std::collections::HashMap<String, String>,
}

/// Durable keyed storage of server identities and their metric samples.
///
/// All sample listings are **chronological ascending** (by id, which is
/// assigned in creation order); `tail_samples` returns the most recent N
/// while preserving that order for time-series consumers.
///
/// ## Consistency
///
/// `record_submission` is the transactional unit used by the ingestion
/// path: a reader must never observe a sample whose server identity does
/// not exist yet, nor a freshly created identity without its triggering
/// sample. `delete_server` removes the identity and every sample it owns
/// atomically; no partial cascade is visible to readers.
///
/// ## Thread safety
///
/// Implementations must be `Send + Sync`; sample id assignment must be
/// serialized so ids stay totally ordered per server under concurrent
/// writers.
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Insert the identity if `server_id` is unseen, otherwise update the
    /// mutable fields and refresh `updated_at`. Idempotent on identical
    /// input apart from the `updated_at` refresh.
    async fn upsert_server(&self, server: &NewServer) -> StoreResult<ServerIdentity>;

    /// Append one sample for an existing server.
    ///
    /// Fails with `NotFound` if `server_id` has no identity. The assigned
    /// id is strictly greater than every previously assigned id.
    async fn append_sample(&self, server_id: &str, sample: &NewSample)
    -> StoreResult<MetricSample>;

    /// Upsert the identity and append the sample in one transaction.
    async fn record_submission(
        &self,
        server: &NewServer,
        sample: &NewSample,
    ) -> StoreResult<(ServerIdentity, MetricSample)>;

    /// All known servers, oldest first.
    async fn list_servers(&self) -> StoreResult<Vec<ServerIdentity>>;

    async fn get_server(&self, server_id: &str) -> StoreResult<ServerIdentity>;

    /// Every stored sample across all servers, ascending id.
    async fn list_samples(&self) -> StoreResult<Vec<MetricSample>>;

    /// Samples for one server, ascending, optionally capped.
    ///
    /// Fails with `NotFound` for an unknown server (distinguishing "no
    /// samples yet" from "no such server").
    async fn samples_for_server(
        &self,
        server_id: &str,
        limit: Option<usize>,
    ) -> StoreResult<Vec<MetricSample>>;

    /// The last N samples for a server, still in ascending order.
    async fn tail_samples(&self, server_id: &str, n: usize) -> StoreResult<Vec<MetricSample>>;

    async fn get_sample(&self, id: i64) -> StoreResult<MetricSample>;

    /// Delete a server identity and, in the same transaction, every sample
    /// it owns.
    async fn delete_server(&self, server_id: &str) -> StoreResult<()>;

    async fn delete_sample(&self, id: i64) -> StoreResult<()>;

    /// Delete samples created before the cutoff. Returns the number
    /// removed. Used by the optional retention task.
    async fn cleanup_old_samples(&self, before: DateTime<Utc>) -> StoreResult<usize>;

    /// Lightweight operational check (ping the database, count nothing).
    async fn health_check(&self) -> StoreResult<HealthStatus>;

    /// Human-readable stats (row counts, on-disk size where applicable).
    async fn stats(&self) -> StoreResult<String>;

    /// Release resources and flush pending writes.
    async fn close(&self) -> StoreResult<()>;
}
