//! Upload and parameter validation module
//!
//! Provides validation utilities for image uploads and search parameters.

use photomatch_core::{SearchParams, FINGERPRINT_BITS};

use crate::config::MAX_RESULTS_CAP;
use crate::error::ApiError;

/// Allowed MIME type categories for query images
const ALLOWED_MIME_PREFIXES: &[&str] = &["image/", "application/octet-stream"];

/// Default max file size in bytes (25 MB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 25 * 1024 * 1024;

/// Validates the Content-Type of an uploaded file
///
/// Accepts image/* and application/octet-stream. A missing Content-Type is
/// treated as binary.
pub fn validate_content_type(content_type: Option<&str>) -> Result<(), ApiError> {
    match content_type {
        Some(ct) => {
            let ct_lower = ct.to_lowercase();
            if ALLOWED_MIME_PREFIXES
                .iter()
                .any(|prefix| ct_lower.starts_with(prefix))
            {
                Ok(())
            } else {
                Err(ApiError::bad_request(format!(
                    "Unsupported Content-Type: '{}'. Allowed types: image/*, application/octet-stream",
                    ct
                )))
            }
        }
        None => Ok(()),
    }
}

/// Validates the size of an uploaded file
///
/// Returns an error if the file exceeds the maximum size.
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ApiError> {
    if size > max_size {
        let max_mb = max_size / (1024 * 1024);
        let actual_mb = size / (1024 * 1024);
        Err(ApiError::bad_request(format!(
            "File too large: {} MB exceeds maximum of {} MB",
            actual_mb, max_mb
        )))
    } else {
        Ok(())
    }
}

/// Validates search parameters against the fingerprint width and result cap
pub fn validate_search_params(params: &SearchParams) -> Result<(), ApiError> {
    if params.threshold > FINGERPRINT_BITS {
        return Err(ApiError::bad_request(format!(
            "threshold must be between 0 and {}, got {}",
            FINGERPRINT_BITS, params.threshold
        )));
    }

    if params.max_results == 0 || params.max_results > MAX_RESULTS_CAP {
        return Err(ApiError::bad_request(format!(
            "max_results must be between 1 and {}, got {}",
            MAX_RESULTS_CAP, params.max_results
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_content_type_image() {
        assert!(validate_content_type(Some("image/jpeg")).is_ok());
        assert!(validate_content_type(Some("image/png")).is_ok());
        assert!(validate_content_type(Some("image/webp")).is_ok());
        assert!(validate_content_type(Some("IMAGE/JPEG")).is_ok()); // case insensitive
    }

    #[test]
    fn test_validate_content_type_binary_or_missing() {
        assert!(validate_content_type(Some("application/octet-stream")).is_ok());
        assert!(validate_content_type(None).is_ok());
    }

    #[test]
    fn test_validate_content_type_rejected() {
        assert!(validate_content_type(Some("text/html")).is_err());
        assert!(validate_content_type(Some("application/json")).is_err());
        assert!(validate_content_type(Some("video/mp4")).is_err());
    }

    #[test]
    fn test_validate_file_size() {
        let max = 10 * 1024 * 1024; // 10 MB
        assert!(validate_file_size(1024, max).is_ok());
        assert!(validate_file_size(max, max).is_ok()); // exactly max
        assert!(validate_file_size(max + 1, max).is_err());
    }

    #[test]
    fn test_validate_search_params() {
        let ok = |threshold, max_results| {
            validate_search_params(&SearchParams {
                threshold,
                max_results,
            })
            .is_ok()
        };

        assert!(ok(0, 1));
        assert!(ok(64, 100));
        assert!(!ok(65, 10));
        assert!(!ok(30, 0));
        assert!(!ok(30, 101));
    }
}
