//! SQLite store implementation
//!
//! ## Features
//!
//! - **Embedded**: no separate database server required
//! - **WAL mode**: readers stay unblocked during writes
//! - **Connection pooling**: efficient resource usage
//! - **Migrations**: automatic schema versioning with sqlx
//!
//! ## Consistency notes
//!
//! Sample ids come from SQLite's AUTOINCREMENT sequence, so they are
//! strictly increasing and totally ordered even under concurrent writers.
//! `record_submission` and `delete_server` run inside transactions; the
//! identity-with-sample and cascade invariants hold for every reader.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use crate::NetworkStats;

use super::backend::{HealthStatus, MetricStore};
use super::error::{StoreError, StoreResult};
use super::schema::{MetricSample, NewSample, NewServer, ServerIdentity};

/// SQLite-backed metric record store.
///
/// Suitable for small to medium fleets (1-100 servers); the primary
/// production backend.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `db_path` and run
    /// migrations.
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StoreResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite store at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("SQLite store ready");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    fn millis_to_timestamp(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }

    fn row_to_server(row: &SqliteRow) -> ServerIdentity {
        ServerIdentity {
            server_id: row.get("server_id"),
            hostname: row.get("hostname"),
            ip_address: row.get("ip_address"),
            os_info: row.get("os_info"),
            created_at: Self::millis_to_timestamp(row.get("created_at")),
            updated_at: Self::millis_to_timestamp(row.get("updated_at")),
        }
    }

    fn row_to_sample(row: &SqliteRow) -> StoreResult<MetricSample> {
        let network_json: String = row.get("network_stats");
        let network_stats: NetworkStats = serde_json::from_str(&network_json).map_err(|e| {
            StoreError::Serialization(format!("failed to deserialize network_stats: {}", e))
        })?;

        Ok(MetricSample {
            id: row.get("id"),
            server_id: row.get("server_id"),
            cpu_usage: row.get("cpu_usage"),
            memory_usage: row.get("memory_usage"),
            disk_usage: row.get("disk_usage"),
            network_stats,
            created_at: Self::millis_to_timestamp(row.get("created_at")),
        })
    }

    /// Upsert an identity within an open transaction and return the stored
    /// row. `created_at` is preserved on conflict; `updated_at` always
    /// advances.
    async fn upsert_server_tx(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        server: &NewServer,
    ) -> StoreResult<ServerIdentity> {
        let now = Self::timestamp_to_millis(&Utc::now());

        sqlx::query(
            r#"
            INSERT INTO servers (server_id, hostname, ip_address, os_info, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (server_id) DO UPDATE SET
                hostname = excluded.hostname,
                ip_address = excluded.ip_address,
                os_info = excluded.os_info,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&server.server_id)
        .bind(&server.hostname)
        .bind(&server.ip_address)
        .bind(&server.os_info)
        .bind(now)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        let row = sqlx::query("SELECT * FROM servers WHERE server_id = ?")
            .bind(&server.server_id)
            .fetch_one(&mut **tx)
            .await?;

        Ok(Self::row_to_server(&row))
    }

    /// Insert one sample within an open transaction. The caller must have
    /// verified the server exists inside the same transaction.
    async fn insert_sample_tx(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        server_id: &str,
        sample: &NewSample,
    ) -> StoreResult<MetricSample> {
        let created_at = Utc::now();
        let network_json = serde_json::to_string(&sample.network_stats).map_err(|e| {
            StoreError::Serialization(format!("failed to serialize network_stats: {}", e))
        })?;

        let result = sqlx::query(
            r#"
            INSERT INTO metrics (server_id, cpu_usage, memory_usage, disk_usage, network_stats, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(server_id)
        .bind(sample.cpu_usage)
        .bind(sample.memory_usage)
        .bind(sample.disk_usage)
        .bind(&network_json)
        .bind(Self::timestamp_to_millis(&created_at))
        .execute(&mut **tx)
        .await?;

        Ok(MetricSample {
            id: result.last_insert_rowid(),
            server_id: server_id.to_string(),
            cpu_usage: sample.cpu_usage,
            memory_usage: sample.memory_usage,
            disk_usage: sample.disk_usage,
            network_stats: sample.network_stats,
            created_at,
        })
    }

    async fn server_exists_tx(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        server_id: &str,
    ) -> StoreResult<bool> {
        let row = sqlx::query("SELECT 1 FROM servers WHERE server_id = ?")
            .bind(server_id)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(row.is_some())
    }
}

#[async_trait]
impl MetricStore for SqliteStore {
    #[instrument(skip(self, server), fields(server_id = %server.server_id))]
    async fn upsert_server(&self, server: &NewServer) -> StoreResult<ServerIdentity> {
        let mut tx = self.pool.begin().await?;
        let identity = Self::upsert_server_tx(&mut tx, server).await?;
        tx.commit().await?;

        Ok(identity)
    }

    #[instrument(skip(self, sample))]
    async fn append_sample(
        &self,
        server_id: &str,
        sample: &NewSample,
    ) -> StoreResult<MetricSample> {
        let mut tx = self.pool.begin().await?;

        if !Self::server_exists_tx(&mut tx, server_id).await? {
            return Err(StoreError::NotFound(format!(
                "server {} doesn't exist",
                server_id
            )));
        }

        let stored = Self::insert_sample_tx(&mut tx, server_id, sample).await?;
        tx.commit().await?;

        Ok(stored)
    }

    #[instrument(skip(self, server, sample), fields(server_id = %server.server_id))]
    async fn record_submission(
        &self,
        server: &NewServer,
        sample: &NewSample,
    ) -> StoreResult<(ServerIdentity, MetricSample)> {
        let mut tx = self.pool.begin().await?;

        let identity = Self::upsert_server_tx(&mut tx, server).await?;
        let stored = Self::insert_sample_tx(&mut tx, &server.server_id, sample).await?;

        tx.commit().await?;

        debug!("recorded sample {} for {}", stored.id, stored.server_id);
        Ok((identity, stored))
    }

    async fn list_servers(&self) -> StoreResult<Vec<ServerIdentity>> {
        let rows = sqlx::query("SELECT * FROM servers ORDER BY created_at ASC, server_id ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(Self::row_to_server).collect())
    }

    async fn get_server(&self, server_id: &str) -> StoreResult<ServerIdentity> {
        let row = sqlx::query("SELECT * FROM servers WHERE server_id = ?")
            .bind(server_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| Self::row_to_server(&r))
            .ok_or_else(|| StoreError::NotFound(format!("server {} doesn't exist", server_id)))
    }

    async fn list_samples(&self) -> StoreResult<Vec<MetricSample>> {
        let rows = sqlx::query("SELECT * FROM metrics ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_sample).collect()
    }

    #[instrument(skip(self))]
    async fn samples_for_server(
        &self,
        server_id: &str,
        limit: Option<usize>,
    ) -> StoreResult<Vec<MetricSample>> {
        // Existence check first so unknown servers surface as NotFound
        // instead of an empty listing.
        self.get_server(server_id).await?;

        let limit = limit.map(|l| l as i64).unwrap_or(i64::MAX);
        let rows = sqlx::query("SELECT * FROM metrics WHERE server_id = ? ORDER BY id ASC LIMIT ?")
            .bind(server_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_sample).collect()
    }

    #[instrument(skip(self))]
    async fn tail_samples(&self, server_id: &str, n: usize) -> StoreResult<Vec<MetricSample>> {
        let rows = sqlx::query("SELECT * FROM metrics WHERE server_id = ? ORDER BY id DESC LIMIT ?")
            .bind(server_id)
            .bind(n as i64)
            .fetch_all(&self.pool)
            .await?;

        let mut samples: Vec<MetricSample> =
            rows.iter().map(Self::row_to_sample).collect::<StoreResult<_>>()?;

        // Back to chronological order (oldest first).
        samples.reverse();
        Ok(samples)
    }

    async fn get_sample(&self, id: i64) -> StoreResult<MetricSample> {
        let row = sqlx::query("SELECT * FROM metrics WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_sample(&row),
            None => Err(StoreError::NotFound(format!("metric {} doesn't exist", id))),
        }
    }

    #[instrument(skip(self))]
    async fn delete_server(&self, server_id: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        if !Self::server_exists_tx(&mut tx, server_id).await? {
            return Err(StoreError::NotFound(format!(
                "server {} doesn't exist",
                server_id
            )));
        }

        // Children first, parent second, one transaction: either both are
        // gone or neither is.
        sqlx::query("DELETE FROM metrics WHERE server_id = ?")
            .bind(server_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM servers WHERE server_id = ?")
            .bind(server_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!("deleted server {} and its samples", server_id);
        Ok(())
    }

    async fn delete_sample(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM metrics WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("metric {} doesn't exist", id)));
        }

        Ok(())
    }

    #[instrument(skip(self), fields(before = %before))]
    async fn cleanup_old_samples(&self, before: DateTime<Utc>) -> StoreResult<usize> {
        let result = sqlx::query("DELETE FROM metrics WHERE created_at < ?")
            .bind(Self::timestamp_to_millis(&before))
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() as usize;
        if deleted > 0 {
            info!("retention cleanup deleted {} old samples", deleted);
        }

        Ok(deleted)
    }

    async fn health_check(&self) -> StoreResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                let mut metadata = HashMap::new();
                metadata.insert("backend".to_string(), "sqlite".to_string());
                metadata.insert("db_path".to_string(), self.db_path.clone());

                Ok(HealthStatus {
                    healthy: true,
                    message: "SQLite store operational".to_string(),
                    metadata,
                })
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                    metadata: HashMap::new(),
                })
            }
        }
    }

    async fn stats(&self) -> StoreResult<String> {
        let (servers,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM servers")
            .fetch_one(&self.pool)
            .await?;

        let (samples,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM metrics")
            .fetch_one(&self.pool)
            .await?;

        let file_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(format!(
            "SQLite: {} servers, {} samples, {:.2} MB on disk",
            servers,
            samples,
            file_size as f64 / 1_000_000.0
        ))
    }

    async fn close(&self) -> StoreResult<()> {
        info!("closing SQLite store");
        self.pool.close().await;
        Ok(())
    }
}
