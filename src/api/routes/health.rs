//! Health check endpoint

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::api::{error::ApiResult, state::ApiState};

/// GET /api/v1/health
///
/// Pings the store; reports degraded rather than failing outright.
pub async fn health_check(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let store_health = state.store.health_check().await;

    let (status, store) = match store_health {
        Ok(health) if health.healthy => ("ok", json!({ "healthy": true, "message": health.message })),
        Ok(health) => (
            "degraded",
            json!({ "healthy": false, "message": health.message }),
        ),
        Err(e) => ("degraded", json!({ "healthy": false, "message": e.to_string() })),
    };

    Ok(Json(json!({
        "status": status,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "store": store,
    })))
}
