//! Health check handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::Uri;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use llm_balance_core::ProviderKind;

use crate::cache::CacheStats;
use crate::error::{ApiError, ApiFailure};
use crate::extract::RequestId;
use crate::state::AppState;

/// Service name reported by health endpoints.
const SERVICE_NAME: &str = "llm-balance";

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Current server time.
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            service: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// A configured provider, as reported by the detailed health endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    /// Provider name.
    pub name: ProviderKind,
    /// Base URL requests are sent to.
    pub base_url: String,
    /// Whether a legacy fallback path is configured.
    pub has_fallback: bool,
}

/// Detailed health response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedHealthResponse {
    /// Basic liveness fields.
    #[serde(flatten)]
    pub health: HealthResponse,
    /// Seconds since startup.
    pub uptime_seconds: u64,
    /// Balance cache statistics.
    pub cache: CacheStats,
    /// Configured providers.
    pub providers: Vec<ProviderStatus>,
}

/// Readiness response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Always `"ready"` once the router is serving.
    pub status: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Health check with uptime and cache statistics.
pub async fn health_detailed(State(state): State<Arc<AppState>>) -> Json<DetailedHealthResponse> {
    let providers = ProviderKind::ALL
        .iter()
        .map(|kind| {
            let endpoint = state.config.endpoint(*kind);
            ProviderStatus {
                name: *kind,
                base_url: endpoint.base_url.clone(),
                has_fallback: endpoint.fallback_path.is_some(),
            }
        })
        .collect();

    Json(DetailedHealthResponse {
        health: HealthResponse::ok(),
        uptime_seconds: state.uptime_seconds(),
        cache: state.cache.stats().await,
        providers,
    })
}

/// Readiness probe.
pub async fn ready() -> Json<ReadyResponse> {
    Json(ReadyResponse {
        status: "ready".to_string(),
    })
}

/// Fallback for unknown routes.
pub async fn not_found(request_id: RequestId, uri: Uri) -> ApiFailure {
    ApiError::NotFound(format!("No route for {}", uri.path())).with_request_id(request_id.0)
}
