//! In-memory store (no persistence)
//!
//! A capability-limited variant of [`MetricStore`] for demo deployments and
//! tests. It honors the same consistency contract as the SQLite store (the
//! whole map is guarded by one lock, so composed writes are atomic by
//! construction) but loses everything on restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::backend::{HealthStatus, MetricStore};
use super::error::{StoreError, StoreResult};
use super::schema::{MetricSample, NewSample, NewServer, ServerIdentity};

#[derive(Default)]
struct Tables {
    servers: HashMap<String, ServerIdentity>,
    samples: Vec<MetricSample>,
}

/// In-memory metric record store.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            next_id: AtomicI64::new(1),
        }
    }

    fn upsert_locked(tables: &mut Tables, server: &NewServer) -> ServerIdentity {
        let now = Utc::now();

        let identity = tables
            .servers
            .entry(server.server_id.clone())
            .and_modify(|existing| {
                existing.hostname = server.hostname.clone();
                existing.ip_address = server.ip_address.clone();
                existing.os_info = server.os_info.clone();
                existing.updated_at = now;
            })
            .or_insert_with(|| ServerIdentity {
                server_id: server.server_id.clone(),
                hostname: server.hostname.clone(),
                ip_address: server.ip_address.clone(),
                os_info: server.os_info.clone(),
                created_at: now,
                updated_at: now,
            });

        identity.clone()
    }

    fn insert_sample_locked(&self, tables: &mut Tables, server_id: &str, sample: &NewSample) -> MetricSample {
        let stored = MetricSample {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            server_id: server_id.to_string(),
            cpu_usage: sample.cpu_usage,
            memory_usage: sample.memory_usage,
            disk_usage: sample.disk_usage,
            network_stats: sample.network_stats,
            created_at: Utc::now(),
        };

        tables.samples.push(stored.clone());
        stored
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricStore for MemoryStore {
    async fn upsert_server(&self, server: &NewServer) -> StoreResult<ServerIdentity> {
        let mut tables = self.tables.write().await;
        Ok(Self::upsert_locked(&mut tables, server))
    }

    async fn append_sample(
        &self,
        server_id: &str,
        sample: &NewSample,
    ) -> StoreResult<MetricSample> {
        let mut tables = self.tables.write().await;

        if !tables.servers.contains_key(server_id) {
            return Err(StoreError::NotFound(format!(
                "server {} doesn't exist",
                server_id
            )));
        }

        Ok(self.insert_sample_locked(&mut tables, server_id, sample))
    }

    async fn record_submission(
        &self,
        server: &NewServer,
        sample: &NewSample,
    ) -> StoreResult<(ServerIdentity, MetricSample)> {
        // One write lock for the pair: no reader can observe the identity
        // without the sample or vice versa.
        let mut tables = self.tables.write().await;

        let identity = Self::upsert_locked(&mut tables, server);
        let stored = self.insert_sample_locked(&mut tables, &server.server_id, sample);

        debug!("recorded sample {} for {}", stored.id, stored.server_id);
        Ok((identity, stored))
    }

    async fn list_servers(&self) -> StoreResult<Vec<ServerIdentity>> {
        let tables = self.tables.read().await;

        let mut servers: Vec<ServerIdentity> = tables.servers.values().cloned().collect();
        servers.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.server_id.cmp(&b.server_id))
        });

        Ok(servers)
    }

    async fn get_server(&self, server_id: &str) -> StoreResult<ServerIdentity> {
        let tables = self.tables.read().await;

        tables
            .servers
            .get(server_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("server {} doesn't exist", server_id)))
    }

    async fn list_samples(&self) -> StoreResult<Vec<MetricSample>> {
        let tables = self.tables.read().await;
        Ok(tables.samples.clone())
    }

    async fn samples_for_server(
        &self,
        server_id: &str,
        limit: Option<usize>,
    ) -> StoreResult<Vec<MetricSample>> {
        let tables = self.tables.read().await;

        if !tables.servers.contains_key(server_id) {
            return Err(StoreError::NotFound(format!(
                "server {} doesn't exist",
                server_id
            )));
        }

        Ok(tables
            .samples
            .iter()
            .filter(|s| s.server_id == server_id)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn tail_samples(&self, server_id: &str, n: usize) -> StoreResult<Vec<MetricSample>> {
        let tables = self.tables.read().await;

        let mut tail: Vec<MetricSample> = tables
            .samples
            .iter()
            .rev()
            .filter(|s| s.server_id == server_id)
            .take(n)
            .cloned()
            .collect();

        tail.reverse();
        Ok(tail)
    }

    async fn get_sample(&self, id: i64) -> StoreResult<MetricSample> {
        let tables = self.tables.read().await;

        tables
            .samples
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("metric {} doesn't exist", id)))
    }

    async fn delete_server(&self, server_id: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;

        if tables.servers.remove(server_id).is_none() {
            return Err(StoreError::NotFound(format!(
                "server {} doesn't exist",
                server_id
            )));
        }

        tables.samples.retain(|s| s.server_id != server_id);
        Ok(())
    }

    async fn delete_sample(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;

        let before = tables.samples.len();
        tables.samples.retain(|s| s.id != id);

        if tables.samples.len() == before {
            return Err(StoreError::NotFound(format!("metric {} doesn't exist", id)));
        }

        Ok(())
    }

    async fn cleanup_old_samples(&self, before: DateTime<Utc>) -> StoreResult<usize> {
        let mut tables = self.tables.write().await;

        let count = tables.samples.len();
        tables.samples.retain(|s| s.created_at >= before);

        Ok(count - tables.samples.len())
    }

    async fn health_check(&self) -> StoreResult<HealthStatus> {
        let tables = self.tables.read().await;

        Ok(HealthStatus {
            healthy: true,
            message: "in-memory store operational".to_string(),
            metadata: HashMap::from([
                ("backend".to_string(), "memory".to_string()),
                (
                    "total_samples".to_string(),
                    tables.samples.len().to_string(),
                ),
            ]),
        })
    }

    async fn stats(&self) -> StoreResult<String> {
        let tables = self.tables.read().await;

        Ok(format!(
            "In-Memory: {} servers, {} samples (no persistence)",
            tables.servers.len(),
            tables.samples.len()
        ))
    }

    async fn close(&self) -> StoreResult<()> {
        info!("closing in-memory store (data discarded)");
        Ok(())
    }
}
