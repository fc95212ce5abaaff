//! Read side: cache-backed views over the store.
//!
//! Every read goes through the cache. A hit returns the cached JSON
//! document untouched; a miss reads from the store, serializes, caches
//! under the class TTL and returns. Errors (including `NotFound`) are
//! never cached, so a server created right after a missed lookup is
//! visible immediately.
//!
//! Key layout (shared with the invalidation sets in ingestion and the
//! API delete handlers):
//!
//! - `servers:list`
//! - `servers:detail:{server_id}`
//! - `metrics:list`
//! - `metrics:detail:{id}`
//! - `metrics:server:{server_id}` / `metrics:server:{server_id}:{limit}`

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::instrument;

use crate::analytics;
use crate::cache::ResponseCache;
use crate::config::CacheConfig;
use crate::store::{MetricStore, StoreResult};

pub struct QueryService {
    store: Arc<dyn MetricStore>,
    cache: Arc<ResponseCache>,
    ttls: CacheConfig,
    tail_len: usize,
}

impl QueryService {
    pub fn new(
        store: Arc<dyn MetricStore>,
        cache: Arc<ResponseCache>,
        ttls: CacheConfig,
        tail_len: usize,
    ) -> Self {
        Self {
            store,
            cache,
            ttls,
            tail_len,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_servers(&self) -> StoreResult<Value> {
        if let Some(cached) = self.cache.get("servers:list", "servers").await {
            return Ok(cached);
        }

        let servers = self.store.list_servers().await?;
        let body = json!(servers);

        self.cache
            .set_with_ttl("servers:list", body.clone(), self.ttls.server_ttl())
            .await;
        Ok(body)
    }

    /// Server detail: the identity plus its most recent samples embedded
    /// under a `metrics` key.
    #[instrument(skip(self))]
    pub async fn get_server(&self, server_id: &str) -> StoreResult<Value> {
        let key = format!("servers:detail:{server_id}");
        if let Some(cached) = self.cache.get(&key, "servers").await {
            return Ok(cached);
        }

        let server = self.store.get_server(server_id).await?;
        let tail = self.store.tail_samples(server_id, self.tail_len).await?;

        let mut body = json!(server);
        body["metrics"] = json!(tail);

        self.cache
            .set_with_ttl(&key, body.clone(), self.ttls.server_ttl())
            .await;
        Ok(body)
    }

    #[instrument(skip(self))]
    pub async fn list_samples(&self) -> StoreResult<Value> {
        if let Some(cached) = self.cache.get("metrics:list", "metrics").await {
            return Ok(cached);
        }

        let samples = self.store.list_samples().await?;
        let body = json!(samples);

        self.cache
            .set_with_ttl("metrics:list", body.clone(), self.ttls.metrics_ttl())
            .await;
        Ok(body)
    }

    #[instrument(skip(self))]
    pub async fn get_sample(&self, id: i64) -> StoreResult<Value> {
        let key = format!("metrics:detail:{id}");
        if let Some(cached) = self.cache.get(&key, "metrics").await {
            return Ok(cached);
        }

        let sample = self.store.get_sample(id).await?;
        let body = json!(sample);

        self.cache
            .set_with_ttl(&key, body.clone(), self.ttls.metrics_ttl())
            .await;
        Ok(body)
    }

    /// All samples for one server, optionally capped at `limit`. Capped
    /// and uncapped views are cached under distinct keys; both fall to
    /// the same `metrics:server:{id}` prefix on invalidation.
    #[instrument(skip(self))]
    pub async fn samples_for_server(
        &self,
        server_id: &str,
        limit: Option<usize>,
    ) -> StoreResult<Value> {
        let key = match limit {
            Some(n) => format!("metrics:server:{server_id}:{n}"),
            None => format!("metrics:server:{server_id}"),
        };
        if let Some(cached) = self.cache.get(&key, "server_metrics").await {
            return Ok(cached);
        }

        let samples = self.store.samples_for_server(server_id, limit).await?;
        let body = json!(samples);

        self.cache
            .set_with_ttl(&key, body.clone(), self.ttls.server_metrics_ttl())
            .await;
        Ok(body)
    }

    /// Least-squares extrapolation of the next cpu/memory/disk values
    /// from the server's recent history. `window` restricts the history
    /// to the last N samples. Never cached: it is cheap to compute and
    /// staleness here is worse than elsewhere.
    #[instrument(skip(self))]
    pub async fn forecast(&self, server_id: &str, window: Option<usize>) -> StoreResult<Value> {
        let samples = match window {
            Some(n) => {
                // tail_samples does not reject unknown servers on its own.
                self.store.get_server(server_id).await?;
                self.store.tail_samples(server_id, n).await?
            }
            None => self.store.samples_for_server(server_id, None).await?,
        };

        let cpu: Vec<f64> = samples.iter().map(|s| s.cpu_usage).collect();
        let memory: Vec<f64> = samples.iter().map(|s| s.memory_usage).collect();
        let disk: Vec<f64> = samples.iter().map(|s| s.disk_usage).collect();

        Ok(json!({
            "server_id": server_id,
            "samples": samples.len(),
            "predicted": {
                "cpu": analytics::predict_next(&cpu),
                "memory": analytics::predict_next(&memory),
                "disk": analytics::predict_next(&disk),
            }
        }))
    }
}
