//! REST API server for the metrics hub
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - Writes go through the ingestion coordinator, reads through the
//!   cache-backed query service
//! - Bearer token auth covers the `/api/v1` tree only
//!
//! ## Endpoints
//!
//! - `POST /api/v1/metrics` - Agent submission (201 on commit)
//! - `GET /api/v1/metrics` - All samples
//! - `GET /api/v1/metrics/{id}` - One sample
//! - `DELETE /api/v1/metrics/{id}` - Delete one sample
//! - `GET /api/v1/metrics/server/{server_id}` - Samples for one server
//! - `GET /api/v1/servers` - List server identities
//! - `GET /api/v1/servers/{id}` - Identity with recent samples
//! - `PUT /api/v1/servers/{id}` - Update identity fields
//! - `DELETE /api/v1/servers/{id}` - Delete identity and its samples
//! - `GET /api/v1/servers/{id}/forecast` - Trend extrapolation
//! - `GET /api/v1/health` - Health check
//! - `GET /api/v1/stats` - Store/cache/alert statistics
//! - `GET /metrics` - Prometheus exposition (unauthenticated)

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8080")
    pub bind_addr: SocketAddr,

    /// Optional authentication token
    pub auth_token: Option<String>,

    /// Enable CORS for dashboards
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            auth_token: None,
            enable_cors: true,
        }
    }
}

/// Build the full application router.
pub fn build_router(config: &ApiConfig, state: ApiState) -> Router {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let mut api = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/stats", get(routes::stats::get_stats))
        .route(
            "/metrics",
            get(routes::metrics::list_metrics).post(routes::metrics::submit_metrics),
        )
        .route(
            "/metrics/:id",
            get(routes::metrics::get_metric).delete(routes::metrics::delete_metric),
        )
        .route(
            "/metrics/server/:server_id",
            get(routes::metrics::get_server_metrics),
        )
        .route("/servers", get(routes::servers::list_servers))
        .route(
            "/servers/:id",
            get(routes::servers::get_server)
                .put(routes::servers::update_server)
                .delete(routes::servers::delete_server),
        )
        .route("/servers/:id/forecast", get(routes::servers::get_forecast));

    // Auth covers /api/v1 only; the exposition endpoint below stays open
    if let Some(token) = &config.auth_token {
        api = api.layer(axum::middleware::from_fn_with_state(
            middleware::auth::BearerToken::new(token.clone()),
            middleware::auth::require_bearer,
        ));
    }

    let mut app = Router::new()
        .nest("/api/v1", api)
        .route("/metrics", get(routes::prom::exposition))
        .with_state(state)
        .layer(axum::middleware::from_fn(
            middleware::tracking::track_requests,
        ))
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Spawn the API server
///
/// Starts an Axum HTTP server in a background task and returns the
/// server's local address.
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind_addr);

    let app = build_router(&config, state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
