//! System statistics endpoint

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::api::{error::ApiResult, state::ApiState};

/// GET /api/v1/stats
///
/// Store, cache and alert dispatch statistics in one document.
pub async fn get_stats(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let store_stats = state
        .store
        .stats()
        .await
        .unwrap_or_else(|e| format!("unavailable: {e}"));
    let alert_stats = state.alerts.stats().await;

    Ok(Json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "store": store_stats,
        "cache": {
            "entries": state.cache.len().await,
        },
        "alerts": alert_stats,
    })))
}
