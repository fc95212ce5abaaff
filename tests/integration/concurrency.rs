//! Concurrent ingestion keeps ids totally ordered and loses nothing.

use std::sync::Arc;
use std::time::Duration;

use fleet_metrics::{
    alerts::{actor::AlertHandle, AlertDispatcher},
    cache::ResponseCache,
    ingest::IngestionCoordinator,
    store::{MetricStore, SqliteStore},
    MetricsBody, MetricsSubmission, NetworkStats, ServerInfo,
};
use tempfile::tempdir;

fn submission(server_id: &str, cpu: f64) -> MetricsSubmission {
    MetricsSubmission {
        timestamp: None,
        server_info: ServerInfo {
            server_id: server_id.to_string(),
            hostname: format!("host-{server_id}"),
            ip: "10.0.0.5".to_string(),
            os: "Linux".to_string(),
        },
        metrics: MetricsBody {
            cpu: Some(cpu),
            memory: Some(40.0),
            disk: Some(50.0),
            network: Some(NetworkStats {
                bytes_sent: 1,
                bytes_recv: 1,
            }),
        },
    }
}

#[tokio::test]
async fn test_concurrent_submissions_from_many_agents() {
    let dir = tempdir().unwrap();
    let store: Arc<dyn MetricStore> = Arc::new(
        SqliteStore::new(dir.path().join("concurrent.db"))
            .await
            .unwrap(),
    );
    let cache = Arc::new(ResponseCache::new());
    let alerts = AlertHandle::spawn(AlertDispatcher::with_channels(vec![]), Duration::ZERO);
    let coordinator = Arc::new(IngestionCoordinator::new(
        store.clone(),
        cache,
        alerts,
    ));

    let mut handles = vec![];
    for agent in 0..4 {
        let coordinator = coordinator.clone();
        handles.push(tokio::spawn(async move {
            let server_id = format!("srv-{agent}");
            for i in 0..10 {
                coordinator
                    .ingest(submission(&server_id, i as f64))
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // nothing lost
    let all = store.list_samples().await.unwrap();
    assert_eq!(all.len(), 40);

    // ids strictly increasing across the whole store
    for pair in all.windows(2) {
        assert!(pair[0].id < pair[1].id);
    }

    // per-server order matches submission order
    for agent in 0..4 {
        let samples = store
            .samples_for_server(&format!("srv-{agent}"), None)
            .await
            .unwrap();
        assert_eq!(samples.len(), 10);
        for (i, sample) in samples.iter().enumerate() {
            assert_eq!(sample.cpu_usage, i as f64);
        }
    }

    // exactly one identity row per agent
    assert_eq!(store.list_servers().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_concurrent_reads_during_writes() {
    let dir = tempdir().unwrap();
    let store: Arc<dyn MetricStore> = Arc::new(
        SqliteStore::new(dir.path().join("readwrite.db"))
            .await
            .unwrap(),
    );
    let cache = Arc::new(ResponseCache::new());
    let alerts = AlertHandle::spawn(AlertDispatcher::with_channels(vec![]), Duration::ZERO);
    let coordinator = Arc::new(IngestionCoordinator::new(
        store.clone(),
        cache,
        alerts,
    ));

    let writer = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            for i in 0..20 {
                coordinator
                    .ingest(submission("srv-1", i as f64))
                    .await
                    .unwrap();
            }
        })
    };

    // Readers must never see a sample without its server identity.
    let reader = {
        let store = store.clone();
        tokio::spawn(async move {
            for _ in 0..20 {
                let samples = store.list_samples().await.unwrap();
                if !samples.is_empty() {
                    store.get_server("srv-1").await.unwrap();
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();
}
