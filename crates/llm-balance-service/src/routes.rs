//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{balance, health};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for balance endpoints.
/// Each request may hold an upstream connection for the full retry schedule.
const BALANCE_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Maximum concurrent batch requests.
/// A batch fans out to many upstream requests at once.
const BATCH_MAX_CONCURRENT_REQUESTS: usize = 10;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /api/v1/health` - Health check
/// - `GET /api/v1/health/detailed` - Health check with uptime and cache stats
/// - `GET /api/v1/health/ready` - Readiness probe
///
/// ## Balance (rate-limited)
/// - `POST /api/v1/balance/check` - Check one key
/// - `POST /api/v1/balance/batch` - Check several keys
/// - `POST /api/check-balance` - Legacy alias of `/api/v1/balance/check`
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let batch_routes = Router::new()
        .route("/batch", post(balance::check_balance_batch))
        .layer(ConcurrencyLimitLayer::new(BATCH_MAX_CONCURRENT_REQUESTS));

    let balance_routes = Router::new()
        .route("/check", post(balance::check_balance))
        .merge(batch_routes)
        .layer(ConcurrencyLimitLayer::new(BALANCE_MAX_CONCURRENT_REQUESTS));

    let health_routes = Router::new()
        .route("/", get(health::health))
        .route("/detailed", get(health::health_detailed))
        .route("/ready", get(health::ready));

    let api_v1 = Router::new()
        .nest("/balance", balance_routes)
        .nest("/health", health_routes);

    let legacy_routes = Router::new()
        .route("/check-balance", post(balance::check_balance))
        .layer(ConcurrencyLimitLayer::new(BALANCE_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        .nest("/api/v1", api_v1)
        .nest("/api", legacy_routes)
        .fallback(health::not_found)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
