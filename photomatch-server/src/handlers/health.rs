//! Health check handlers
//!
//! Provides health and readiness endpoints for monitoring and orchestration.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    #[schema(example = "healthy")]
    pub status: &'static str,
    /// Server version from Cargo.toml
    #[schema(example = "0.1.0")]
    pub version: &'static str,
    /// Service name
    #[schema(example = "photomatch-server")]
    pub service: &'static str,
    /// Perceptual hash algorithm used for every fingerprint
    #[schema(example = "phash")]
    pub hash_algorithm: String,
}

/// GET /health - Health check endpoint
///
/// Returns JSON with service status, version, and the configured hash algorithm.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "photomatch-server",
        hash_algorithm: state.hash_algorithm().to_string(),
    })
}

/// Readiness response for Kubernetes
#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Whether the service is ready to accept traffic
    pub ready: bool,
    /// Optional message explaining status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// GET /ready - Kubernetes readiness probe
///
/// Returns 200 when the catalog can be read, 503 when its database does not
/// answer.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready to accept traffic", body = ReadyResponse),
        (status = 503, description = "Catalog database unreachable", body = ReadyResponse)
    )
)]
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    if let Some(database) = &state.database {
        if let Err(e) = database.ping().await {
            tracing::warn!(error = %e, "Readiness check failed");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    ready: false,
                    message: Some("catalog database unreachable"),
                }),
            );
        }
    }

    (
        StatusCode::OK,
        Json(ReadyResponse {
            ready: true,
            message: None,
        }),
    )
}
