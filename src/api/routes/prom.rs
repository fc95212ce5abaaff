//! Prometheus exposition endpoint

use axum::http::header;
use axum::response::IntoResponse;

use crate::observability;

/// GET /metrics
///
/// Text-format exposition of the hub's own counters. Deliberately
/// outside the authenticated `/api/v1` tree so a scraper needs no
/// credentials.
pub async fn exposition() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        observability::gather(),
    )
}
