//! End-to-end ingestion: submission in, durable rows and alert events out

use std::sync::Arc;
use std::time::Duration;

use fleet_metrics::{
    alerts::{actor::AlertHandle, AlertDispatcher, NotificationChannel},
    cache::ResponseCache,
    ingest::IngestionCoordinator,
    store::{MetricStore, SqliteStore},
    MetricsBody, MetricsSubmission, NetworkStats, ServerInfo,
};
use tempfile::tempdir;
use tokio::sync::mpsc;

struct ChannelProbe {
    tx: mpsc::UnboundedSender<(String, String)>,
}

#[async_trait::async_trait]
impl NotificationChannel for ChannelProbe {
    fn name(&self) -> &'static str {
        "probe"
    }

    async fn send(&self, subject: &str, body: &str) -> anyhow::Result<()> {
        let _ = self.tx.send((subject.to_string(), body.to_string()));
        Ok(())
    }
}

fn submission(server_id: &str, cpu: f64, memory: f64) -> MetricsSubmission {
    MetricsSubmission {
        timestamp: Some("2026-01-01T12:00:00Z".to_string()),
        server_info: ServerInfo {
            server_id: server_id.to_string(),
            hostname: format!("host-{server_id}"),
            ip: "10.0.0.5".to_string(),
            os: "Linux 6.1".to_string(),
        },
        metrics: MetricsBody {
            cpu: Some(cpu),
            memory: Some(memory),
            disk: Some(50.0),
            network: Some(NetworkStats {
                bytes_sent: 100,
                bytes_recv: 200,
            }),
        },
    }
}

async fn sqlite_coordinator(
    dir: &tempfile::TempDir,
) -> (
    IngestionCoordinator,
    Arc<dyn MetricStore>,
    mpsc::UnboundedReceiver<(String, String)>,
) {
    let store: Arc<dyn MetricStore> = Arc::new(
        SqliteStore::new(dir.path().join("pipeline.db"))
            .await
            .unwrap(),
    );
    let cache = Arc::new(ResponseCache::new());

    let (probe_tx, probe_rx) = mpsc::unbounded_channel();
    let dispatcher = AlertDispatcher::with_channels(vec![Box::new(ChannelProbe { tx: probe_tx })]);
    let alerts = AlertHandle::spawn(dispatcher, Duration::ZERO);

    (
        IngestionCoordinator::new(store.clone(), cache, alerts),
        store,
        probe_rx,
    )
}

#[tokio::test]
async fn test_submission_is_durable() {
    let dir = tempdir().unwrap();
    let (coordinator, store, _probe) = sqlite_coordinator(&dir).await;

    coordinator
        .ingest(submission("srv-1", 30.0, 40.0))
        .await
        .unwrap();
    coordinator
        .ingest(submission("srv-1", 35.0, 45.0))
        .await
        .unwrap();

    let samples = store.samples_for_server("srv-1", None).await.unwrap();
    assert_eq!(samples.len(), 2);
    assert!(samples[0].id < samples[1].id);
    assert_eq!(samples[0].cpu_usage, 30.0);
    assert_eq!(samples[1].cpu_usage, 35.0);
}

#[tokio::test]
async fn test_healthy_submission_produces_no_alert() {
    let dir = tempdir().unwrap();
    let (coordinator, _store, mut probe) = sqlite_coordinator(&dir).await;

    coordinator
        .ingest(submission("srv-1", 30.0, 40.0))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(probe.try_recv().is_err());
}

#[tokio::test]
async fn test_breaching_submission_alerts_with_values() {
    let dir = tempdir().unwrap();
    let (coordinator, _store, mut probe) = sqlite_coordinator(&dir).await;

    // cpu above 80, memory above 90
    coordinator
        .ingest(submission("srv-1", 95.5, 92.0))
        .await
        .unwrap();

    let (subject, body) = tokio::time::timeout(Duration::from_secs(1), probe.recv())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(subject, "Server Alert: host-srv-1");
    assert!(body.contains("cpu: 95.5"));
    assert!(body.contains("memory: 92"));
    assert!(!body.contains("disk:"));
    // the agent timestamp is carried through verbatim
    assert!(body.contains("2026-01-01T12:00:00Z"));
}

#[tokio::test]
async fn test_value_at_threshold_does_not_alert() {
    let dir = tempdir().unwrap();
    let (coordinator, _store, mut probe) = sqlite_coordinator(&dir).await;

    // thresholds are strict: exactly 80 / 90 is fine
    coordinator
        .ingest(submission("srv-1", 80.0, 90.0))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(probe.try_recv().is_err());
}

#[tokio::test]
async fn test_alert_failure_does_not_fail_ingestion() {
    struct FailingChannel;

    #[async_trait::async_trait]
    impl NotificationChannel for FailingChannel {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn send(&self, _: &str, _: &str) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("smtp down"))
        }
    }

    let dir = tempdir().unwrap();
    let store: Arc<dyn MetricStore> = Arc::new(
        SqliteStore::new(dir.path().join("failing.db"))
            .await
            .unwrap(),
    );
    let cache = Arc::new(ResponseCache::new());
    let dispatcher = AlertDispatcher::with_channels(vec![Box::new(FailingChannel)]);
    let alerts = AlertHandle::spawn(dispatcher, Duration::ZERO);
    let coordinator = IngestionCoordinator::new(store.clone(), cache, alerts);

    let stored = coordinator
        .ingest(submission("srv-1", 99.0, 99.0))
        .await
        .unwrap();
    assert_eq!(stored.cpu_usage, 99.0);

    // the sample landed despite the channel failing
    let samples = store.samples_for_server("srv-1", None).await.unwrap();
    assert_eq!(samples.len(), 1);
}
