//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use photomatch_core::PhotomatchError;
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Not found - requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Error from the matching library
    #[error("Photomatch error: {0}")]
    Photomatch(#[from] PhotomatchError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Photomatch(ref e) => match e {
                // The catalog store is an upstream dependency
                PhotomatchError::Catalog(_) => StatusCode::SERVICE_UNAVAILABLE,

                PhotomatchError::UndecodableImage(_) | PhotomatchError::InvalidFingerprint(_) => {
                    StatusCode::BAD_REQUEST
                }

                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Get the error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Photomatch(ref e) => match e {
                PhotomatchError::Catalog(_) => "CATALOG_UNAVAILABLE",
                PhotomatchError::UndecodableImage(_) => "UNDECODABLE_IMAGE",
                PhotomatchError::InvalidFingerprint(_) => "INVALID_FINGERPRINT",
                PhotomatchError::IncomparableFingerprints { .. } => "INCOMPARABLE_FINGERPRINTS",
                PhotomatchError::Config(_) => "CONFIG_ERROR",
                PhotomatchError::SerializationError(_) => "SERIALIZATION_ERROR",
                PhotomatchError::Io(_) => "IO_ERROR",
                PhotomatchError::HttpClient(_) => "UPSTREAM_ERROR",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            // Library errors may carry connection strings or paths
            Self::Photomatch(ref e) => match e {
                PhotomatchError::Catalog(_) => "Product catalog unavailable".to_string(),
                PhotomatchError::UndecodableImage(_) => "Image could not be decoded".to_string(),
                PhotomatchError::InvalidFingerprint(_) => "Invalid fingerprint".to_string(),
                PhotomatchError::HttpClient(_) => "Upstream service error".to_string(),
                _ => "Image search failed".to_string(),
            },
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::Photomatch(_) => "photomatch",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        // Log based on severity, always including internal details
        match &self {
            Self::BadRequest(_) | Self::NotFound(_) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Client error"
                );
            }
            Self::Photomatch(PhotomatchError::Catalog(_)) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Service unavailable"
                );
            }
            Self::Photomatch(_) => {
                tracing::error!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    client_message = %client_message,
                    "Photomatch error (internal details logged)"
                );
            }
        }

        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}
