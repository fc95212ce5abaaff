//! Helper functions for integration tests

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use fleet_metrics::{
    alerts::{actor::AlertHandle, AlertDispatcher},
    api::{spawn_api_server, ApiConfig, ApiState},
    cache::ResponseCache,
    config::CacheConfig,
    ingest::IngestionCoordinator,
    query::QueryService,
    store::{MemoryStore, MetricStore},
};
use serde_json::{json, Value};

pub struct TestHub {
    pub addr: SocketAddr,
    pub store: Arc<dyn MetricStore>,
    pub cache: Arc<ResponseCache>,
    pub alerts: AlertHandle,
}

impl TestHub {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Spawn a full hub (memory store, empty alert channels) on a random
/// port.
pub async fn spawn_test_hub(auth_token: Option<&str>) -> TestHub {
    let store: Arc<dyn MetricStore> = Arc::new(MemoryStore::new());
    let cache = Arc::new(ResponseCache::new());
    let alerts = AlertHandle::spawn(AlertDispatcher::with_channels(vec![]), Duration::ZERO);

    let coordinator = Arc::new(IngestionCoordinator::new(
        store.clone(),
        cache.clone(),
        alerts.clone(),
    ));
    let query = Arc::new(QueryService::new(
        store.clone(),
        cache.clone(),
        CacheConfig::default(),
        10,
    ));

    let state = ApiState::new(
        coordinator,
        query,
        store.clone(),
        cache.clone(),
        alerts.clone(),
    );

    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(), // Random port
        auth_token: auth_token.map(String::from),
        enable_cors: true,
    };

    let addr = spawn_api_server(config, state).await.unwrap();

    TestHub {
        addr,
        store,
        cache,
        alerts,
    }
}

/// A structurally complete submission document.
pub fn submission_json(server_id: &str, cpu: f64) -> Value {
    json!({
        "timestamp": "2026-01-01T12:00:00Z",
        "server_info": {
            "server_id": server_id,
            "hostname": format!("host-{server_id}"),
            "ip": "10.0.0.5",
            "os": "Linux 6.1"
        },
        "metrics": {
            "cpu": cpu,
            "memory": 40.0,
            "disk": 50.0,
            "network": { "bytes_sent": 100, "bytes_recv": 200 }
        }
    })
}
