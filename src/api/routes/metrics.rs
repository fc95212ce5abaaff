//! Metric sample endpoints, including the agent submission entrypoint

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{error::ApiResult, state::ApiState};
use crate::MetricsSubmission;

/// POST /api/v1/metrics
///
/// The agent submission entrypoint. Returns 201 with the stored sample
/// once the transaction commits; detection and alerting happen after
/// the commit and cannot fail the request.
pub async fn submit_metrics(
    State(state): State<ApiState>,
    Json(submission): Json<MetricsSubmission>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let stored = state.coordinator.ingest(submission).await?;
    Ok((StatusCode::CREATED, Json(json!(stored))))
}

/// GET /api/v1/metrics
pub async fn list_metrics(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let samples = state.query.list_samples().await?;
    Ok(Json(samples))
}

/// GET /api/v1/metrics/:id
pub async fn get_metric(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let sample = state.query.get_sample(id).await?;
    Ok(Json(sample))
}

/// DELETE /api/v1/metrics/:id
pub async fn delete_metric(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    // need the owning server before the row disappears
    let sample = state.store.get_sample(id).await?;
    state.store.delete_sample(id).await?;

    state.cache.invalidate_prefix("metrics:list").await;
    state
        .cache
        .invalidate_prefix(&format!("metrics:detail:{id}"))
        .await;
    state
        .cache
        .invalidate_prefix(&format!("metrics:server:{}", sample.server_id))
        .await;
    state
        .cache
        .invalidate_prefix(&format!("servers:detail:{}", sample.server_id))
        .await;

    Ok(Json(json!({ "deleted": id })))
}

#[derive(Debug, Deserialize)]
pub struct ServerMetricsQuery {
    limit: Option<usize>,
}

/// GET /api/v1/metrics/server/:server_id
///
/// All samples for one server, ascending, optionally capped via
/// `?limit=N`.
pub async fn get_server_metrics(
    State(state): State<ApiState>,
    Path(server_id): Path<String>,
    Query(query): Query<ServerMetricsQuery>,
) -> ApiResult<Json<Value>> {
    let samples = state
        .query
        .samples_for_server(&server_id, query.limit)
        .await?;
    Ok(Json(samples))
}
