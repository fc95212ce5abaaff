//! Server identity endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{error::ApiResult, state::ApiState};
use crate::store::NewServer;

/// GET /api/v1/servers
pub async fn list_servers(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let servers = state.query.list_servers().await?;
    Ok(Json(servers))
}

/// GET /api/v1/servers/:id
///
/// Identity plus the most recent samples embedded under `metrics`.
pub async fn get_server(
    State(state): State<ApiState>,
    Path(server_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let server = state.query.get_server(&server_id).await?;
    Ok(Json(server))
}

/// Mutable identity fields accepted by PUT. Absent fields keep their
/// stored value.
#[derive(Debug, Deserialize)]
pub struct ServerUpdate {
    hostname: Option<String>,
    ip_address: Option<String>,
    os_info: Option<String>,
}

/// PUT /api/v1/servers/:id
pub async fn update_server(
    State(state): State<ApiState>,
    Path(server_id): Path<String>,
    Json(update): Json<ServerUpdate>,
) -> ApiResult<Json<Value>> {
    // 404 before write: PUT never creates an identity
    let current = state.store.get_server(&server_id).await?;

    let updated = state
        .store
        .upsert_server(&NewServer {
            server_id: server_id.clone(),
            hostname: update.hostname.unwrap_or(current.hostname),
            ip_address: update.ip_address.unwrap_or(current.ip_address),
            os_info: update.os_info.unwrap_or(current.os_info),
        })
        .await?;

    state.cache.invalidate_prefix("servers:list").await;
    state
        .cache
        .invalidate_prefix(&format!("servers:detail:{server_id}"))
        .await;

    Ok(Json(json!(updated)))
}

/// DELETE /api/v1/servers/:id
///
/// Removes the identity and all of its samples, then drops every
/// cached view the cascade made stale.
pub async fn delete_server(
    State(state): State<ApiState>,
    Path(server_id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.store.delete_server(&server_id).await?;

    state.cache.invalidate_prefix("servers:list").await;
    state
        .cache
        .invalidate_prefix(&format!("servers:detail:{server_id}"))
        .await;
    state
        .cache
        .invalidate_prefix(&format!("metrics:server:{server_id}"))
        .await;
    state.cache.invalidate_prefix("metrics:list").await;

    Ok(Json(json!({ "deleted": server_id })))
}

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    /// Restrict the extrapolation to the last N samples.
    window: Option<usize>,
}

/// GET /api/v1/servers/:id/forecast?window=20
pub async fn get_forecast(
    State(state): State<ApiState>,
    Path(server_id): Path<String>,
    Query(params): Query<ForecastQuery>,
) -> ApiResult<Json<Value>> {
    let forecast = state.query.forecast(&server_id, params.window).await?;
    Ok(Json(forecast))
}
