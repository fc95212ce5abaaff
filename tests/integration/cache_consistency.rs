//! Cache consistency: reads are cached, writes invalidate exactly the
//! keys they make stale.

use serde_json::Value;

use super::helpers::{spawn_test_hub, submission_json};

#[tokio::test]
async fn test_reads_are_served_from_cache() {
    let hub = spawn_test_hub(None).await;
    let client = reqwest::Client::new();

    client
        .post(hub.url("/api/v1/metrics"))
        .json(&submission_json("srv-1", 10.0))
        .send()
        .await
        .unwrap();

    let first: Value = client
        .get(hub.url("/api/v1/servers"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first.as_array().unwrap().len(), 1);

    // mutate the store directly, bypassing invalidation
    hub.store
        .upsert_server(&fleet_metrics::store::NewServer {
            server_id: "srv-2".to_string(),
            hostname: "host-srv-2".to_string(),
            ip_address: "10.0.0.6".to_string(),
            os_info: "Linux".to_string(),
        })
        .await
        .unwrap();

    // the cached list still shows one server
    let second: Value = client
        .get(hub.url("/api/v1/servers"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_ingest_invalidates_stale_views() {
    let hub = spawn_test_hub(None).await;
    let client = reqwest::Client::new();

    client
        .post(hub.url("/api/v1/metrics"))
        .json(&submission_json("srv-1", 10.0))
        .send()
        .await
        .unwrap();

    // warm the caches
    let detail: Value = client
        .get(hub.url("/api/v1/servers/srv-1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["metrics"].as_array().unwrap().len(), 1);

    let list: Value = client
        .get(hub.url("/api/v1/metrics"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);

    // a new submission invalidates both views
    client
        .post(hub.url("/api/v1/metrics"))
        .json(&submission_json("srv-1", 20.0))
        .send()
        .await
        .unwrap();

    let detail: Value = client
        .get(hub.url("/api/v1/servers/srv-1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["metrics"].as_array().unwrap().len(), 2);

    let list: Value = client
        .get(hub.url("/api/v1/metrics"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_ingest_preserves_other_servers_cached_views() {
    let hub = spawn_test_hub(None).await;
    let client = reqwest::Client::new();

    for id in ["srv-1", "srv-2"] {
        client
            .post(hub.url("/api/v1/metrics"))
            .json(&submission_json(id, 10.0))
            .send()
            .await
            .unwrap();
    }

    // warm srv-2's per-server view
    client
        .get(hub.url("/api/v1/metrics/server/srv-2"))
        .send()
        .await
        .unwrap();
    assert!(hub
        .cache
        .get("metrics:server:srv-2", "server_metrics")
        .await
        .is_some());

    // srv-1 traffic leaves srv-2's view cached
    client
        .post(hub.url("/api/v1/metrics"))
        .json(&submission_json("srv-1", 20.0))
        .send()
        .await
        .unwrap();
    assert!(hub
        .cache
        .get("metrics:server:srv-2", "server_metrics")
        .await
        .is_some());
    assert!(hub
        .cache
        .get("metrics:server:srv-1", "server_metrics")
        .await
        .is_none());
}

#[tokio::test]
async fn test_delete_sample_invalidates_owner_views() {
    let hub = spawn_test_hub(None).await;
    let client = reqwest::Client::new();

    let stored: Value = client
        .post(hub.url("/api/v1/metrics"))
        .json(&submission_json("srv-1", 10.0))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = stored["id"].as_i64().unwrap();

    // warm detail and list views
    client
        .get(hub.url(&format!("/api/v1/metrics/{id}")))
        .send()
        .await
        .unwrap();
    client
        .get(hub.url("/api/v1/servers/srv-1"))
        .send()
        .await
        .unwrap();

    let response = client
        .delete(hub.url(&format!("/api/v1/metrics/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    // the deleted sample is not resurrected by a stale cache entry
    let response = client
        .get(hub.url(&format!("/api/v1/metrics/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let detail: Value = client
        .get(hub.url("/api/v1/servers/srv-1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["metrics"].as_array().unwrap().len(), 0);
}
