use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use fleet_metrics::{
    alerts::{actor::AlertHandle, AlertDispatcher},
    api::{spawn_api_server, ApiConfig, ApiState},
    cache::ResponseCache,
    config::{read_config_file, Config, StorageConfig},
    ingest::IngestionCoordinator,
    query::QueryService,
    store::{MemoryStore, MetricStore, SqliteStore},
};
use tracing::{debug, error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: Option<String>,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("fleet_metrics", LevelFilter::TRACE),
        ("hub", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(path) => read_config_file(path)?,
        None => {
            debug!("no config file given, using defaults");
            Config::default()
        }
    };

    let (store, retention_days): (Arc<dyn MetricStore>, Option<u32>) = match &config.storage {
        StorageConfig::Memory => {
            warn!("using in-memory storage, data is lost on restart");
            (Arc::new(MemoryStore::new()), None)
        }
        StorageConfig::Sqlite {
            path,
            retention_days,
        } => {
            let store = SqliteStore::new(path).await?;
            info!("sqlite store opened at {}", path.display());
            (Arc::new(store), *retention_days)
        }
    };

    let cache = Arc::new(ResponseCache::new());

    let dispatcher = AlertDispatcher::from_config(&config.alerts);
    let alerts = AlertHandle::spawn(
        dispatcher,
        Duration::from_secs(config.alerts.suppression_secs),
    );

    let coordinator = Arc::new(IngestionCoordinator::new(
        store.clone(),
        cache.clone(),
        alerts.clone(),
    ));
    let query = Arc::new(QueryService::new(
        store.clone(),
        cache.clone(),
        config.cache.clone(),
        config.tail_samples,
    ));

    let state = ApiState::new(
        coordinator,
        query,
        store.clone(),
        cache,
        alerts.clone(),
    );

    let api_config = ApiConfig {
        bind_addr: config.api.bind_addr,
        auth_token: config.api.auth_token.clone(),
        enable_cors: config.api.enable_cors,
    };

    spawn_api_server(api_config, state).await?;

    if let Some(days) = retention_days {
        tokio::spawn(retention_task(store.clone(), days));
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    alerts.shutdown().await;
    store.close().await?;

    Ok(())
}

/// Deletes samples older than the retention window, once a day.
async fn retention_task(store: Arc<dyn MetricStore>, days: u32) {
    let mut interval = tokio::time::interval(Duration::from_secs(24 * 60 * 60));

    loop {
        interval.tick().await;

        let cutoff = chrono::Utc::now() - chrono::Duration::days(days as i64);
        match store.cleanup_old_samples(cutoff).await {
            Ok(0) => trace!("retention: nothing to delete"),
            Ok(n) => info!("retention: deleted {n} samples older than {days} days"),
            Err(e) => error!("retention cleanup failed: {e}"),
        }
    }
}
