//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - All REST endpoints return correct responses and status codes
//! - Authentication middleware covers /api/v1 but not /metrics
//! - Delete cascades and their cache invalidation are visible via the API
//! - Error handling maps store errors to the right status codes

use axum::http::StatusCode;
use serde_json::Value;

use super::helpers::{spawn_test_hub, submission_json};

#[tokio::test]
async fn test_submit_returns_201_with_stored_sample() {
    let hub = spawn_test_hub(None).await;
    let client = reqwest::Client::new();

    let response = client
        .post(hub.url("/api/v1/metrics"))
        .json(&submission_json("srv-1", 42.0))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), StatusCode::CREATED.as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["server_id"], "srv-1");
    assert_eq!(body["cpu_usage"], 42.0);
    assert!(body["id"].is_i64());
}

#[tokio::test]
async fn test_incomplete_submission_names_missing_fields() {
    let hub = spawn_test_hub(None).await;
    let client = reqwest::Client::new();

    let mut submission = submission_json("srv-1", 42.0);
    submission["metrics"]
        .as_object_mut()
        .unwrap()
        .remove("cpu");

    let response = client
        .post(hub.url("/api/v1/metrics"))
        .json(&submission)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("metrics.cpu"));
}

#[tokio::test]
async fn test_server_detail_embeds_recent_samples() {
    let hub = spawn_test_hub(None).await;
    let client = reqwest::Client::new();

    for cpu in [10.0, 20.0, 30.0] {
        client
            .post(hub.url("/api/v1/metrics"))
            .json(&submission_json("srv-1", cpu))
            .send()
            .await
            .unwrap();
    }

    let body: Value = client
        .get(hub.url("/api/v1/servers/srv-1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["hostname"], "host-srv-1");
    let metrics = body["metrics"].as_array().unwrap();
    assert_eq!(metrics.len(), 3);
    assert_eq!(metrics[0]["cpu_usage"], 10.0);
    assert_eq!(metrics[2]["cpu_usage"], 30.0);
}

#[tokio::test]
async fn test_unknown_ids_return_404() {
    let hub = spawn_test_hub(None).await;
    let client = reqwest::Client::new();

    let response = client
        .get(hub.url("/api/v1/servers/ghost"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = client
        .get(hub.url("/api/v1/metrics/999"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = client
        .get(hub.url("/api/v1/metrics/server/ghost"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn test_server_metrics_limit_parameter() {
    let hub = spawn_test_hub(None).await;
    let client = reqwest::Client::new();

    for cpu in [10.0, 20.0, 30.0, 40.0] {
        client
            .post(hub.url("/api/v1/metrics"))
            .json(&submission_json("srv-1", cpu))
            .send()
            .await
            .unwrap();
    }

    let body: Value = client
        .get(hub.url("/api/v1/metrics/server/srv-1?limit=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let samples = body.as_array().unwrap();
    assert_eq!(samples.len(), 2);
    // ascending order preserved
    assert!(samples[0]["id"].as_i64().unwrap() < samples[1]["id"].as_i64().unwrap());
}

#[tokio::test]
async fn test_delete_server_cascades_to_samples() {
    let hub = spawn_test_hub(None).await;
    let client = reqwest::Client::new();

    client
        .post(hub.url("/api/v1/metrics"))
        .json(&submission_json("srv-1", 10.0))
        .send()
        .await
        .unwrap();
    client
        .post(hub.url("/api/v1/metrics"))
        .json(&submission_json("srv-2", 20.0))
        .send()
        .await
        .unwrap();

    let response = client
        .delete(hub.url("/api/v1/servers/srv-1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    // identity and its samples are gone
    let response = client
        .get(hub.url("/api/v1/servers/srv-1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // the other server is untouched
    let body: Value = client
        .get(hub.url("/api/v1/metrics"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let samples = body.as_array().unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0]["server_id"], "srv-2");
}

#[tokio::test]
async fn test_update_server_identity() {
    let hub = spawn_test_hub(None).await;
    let client = reqwest::Client::new();

    client
        .post(hub.url("/api/v1/metrics"))
        .json(&submission_json("srv-1", 10.0))
        .send()
        .await
        .unwrap();

    let body: Value = client
        .put(hub.url("/api/v1/servers/srv-1"))
        .json(&serde_json::json!({ "hostname": "renamed" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["hostname"], "renamed");
    // unspecified fields keep their values
    assert_eq!(body["ip_address"], "10.0.0.5");

    // PUT on an unknown server never creates one
    let response = client
        .put(hub.url("/api/v1/servers/ghost"))
        .json(&serde_json::json!({ "hostname": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn test_forecast_endpoint() {
    let hub = spawn_test_hub(None).await;
    let client = reqwest::Client::new();

    for cpu in [10.0, 20.0, 30.0] {
        client
            .post(hub.url("/api/v1/metrics"))
            .json(&submission_json("srv-1", cpu))
            .send()
            .await
            .unwrap();
    }

    let body: Value = client
        .get(hub.url("/api/v1/servers/srv-1/forecast"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["samples"], 3);
    let next = body["predicted"]["cpu"].as_f64().unwrap();
    assert!((next - 40.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_health_and_stats() {
    let hub = spawn_test_hub(None).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .get(hub.url("/api/v1/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");

    let body: Value = client
        .get(hub.url("/api/v1/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["cache"]["entries"].is_u64());
    assert!(body["alerts"]["dispatched"].is_u64());
}

#[tokio::test]
async fn test_auth_covers_api_but_not_exposition() {
    let hub = spawn_test_hub(Some("secret-token")).await;
    let client = reqwest::Client::new();

    // no token; same {"error": ...} body shape as every other 4xx
    let response = client
        .get(hub.url("/api/v1/servers"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Authorization"));

    // wrong token
    let response = client
        .get(hub.url("/api/v1/servers"))
        .bearer_auth("wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());

    // correct token
    let response = client
        .get(hub.url("/api/v1/servers"))
        .bearer_auth("secret-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    // the exposition endpoint needs no credentials
    let response = client.get(hub.url("/metrics")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let text = response.text().await.unwrap();
    assert!(text.contains("ingest_total"));
}
