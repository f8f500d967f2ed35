use axum::{
    http::HeaderValue,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    api::{analytics, auth, logs},
    app_state::AppState,
};

/// Build the router exposing auth, log and analytics endpoints plus a health check.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/auth/login", post(auth::login))
        // Collector
        .route("/api/logs/ingest", post(logs::ingest))
        // Admin reads
        .route("/api/logs", get(logs::list_logs))
        .route("/api/logs/stats", get(analytics::stats))
        .route("/api/logs/trends", get(analytics::trends))
        .route(
            "/api/logs/violations/breakdown",
            get(analytics::violation_breakdown),
        )
        .route(
            "/api/logs/violations/recent",
            get(analytics::recent_violations),
        )
        .route(
            "/api/logs/{id}",
            get(logs::get_log).delete(logs::delete_log),
        )
        .route("/api/logs/{id}/verify", get(logs::verify_log))
        .route("/healthz", get(healthz))
        .with_state(app_state)
}

/// Allow browser clients served from `origin`. An unparsable origin leaves the router as is.
pub fn with_cors(router: Router, origin: &str) -> Router {
    match origin.parse::<HeaderValue>() {
        Ok(value) => router.layer(
            CorsLayer::new()
                .allow_origin(value)
                .allow_methods(Any)
                .allow_headers(Any),
        ),
        Err(e) => {
            tracing::warn!("Ignoring invalid CORS origin {origin:?}: {e}");
            router
        }
    }
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
