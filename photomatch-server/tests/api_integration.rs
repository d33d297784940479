//! API integration tests for photomatch-server.
//!
//! These tests drive the router with realistic multipart requests against an
//! in-memory catalog, covering parameter validation, ranking, and failure
//! mapping of the search endpoint.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};
use photomatch_core::{
    CandidateRef, CandidateSource, FetchFailure, InMemoryFetcher, MatcherConfig,
    PhotomatchError, SimilarityMatcher, StaticCatalog,
};
use photomatch_server::{create_router, AppState, Config};
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "----TestBoundary7MA4YWxkTrZu0gW";

fn stripes(period: u32, vertical: bool) -> RgbImage {
    ImageBuffer::from_fn(120, 90, |x, y| {
        let coord = if vertical { x } else { y };
        if (coord / period) % 2 == 0 {
            Rgb([230, 220, 200])
        } else {
            Rgb([30, 40, 60])
        }
    })
}

fn encode_png(img: &RgbImage) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

/// Helper to create a multipart body with a file and optional text fields
fn create_search_multipart(
    content: &[u8],
    content_type: &str,
    fields: &[(&str, &str)],
) -> (String, Vec<u8>) {
    let mut body = Vec::new();

    // File field
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"query.png\"\r\n",
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(b"\r\n");

    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    // End boundary
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

fn candidate(id: &str) -> CandidateRef {
    CandidateRef {
        id: id.to_string(),
        name: Some(format!("Product {id}")),
        image_url: format!("https://cdn.example.com/{id}.png"),
    }
}

/// Three products: two share the query image, one is unrelated, one is
/// unreachable.
fn create_test_app() -> Router {
    let query = encode_png(&stripes(10, true));
    let other = encode_png(&stripes(7, false));

    let candidates = vec![
        candidate("mug"),
        candidate("lamp"),
        candidate("mug-copy"),
        candidate("missing"),
    ];
    let fetcher = InMemoryFetcher::new()
        .with_image(candidates[0].image_url.clone(), query.clone())
        .with_image(candidates[1].image_url.clone(), other)
        .with_image(candidates[2].image_url.clone(), query);

    let matcher = SimilarityMatcher::new(
        Arc::new(StaticCatalog::from_candidates(candidates)),
        Arc::new(fetcher),
        MatcherConfig::default(),
    );

    create_router(AppState::new(matcher, &Config::default()))
}

struct DownCatalog;

#[async_trait]
impl CandidateSource for DownCatalog {
    async fn list_candidates(&self) -> photomatch_core::Result<Vec<CandidateRef>> {
        Err(PhotomatchError::Catalog("connection refused (host=db:5432)".into()))
    }
}

async fn post_search(app: Router, uri: &str, content_type: String, body: Vec<u8>) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

// ============================================================================
// Health & Readiness Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "photomatch-server");
    assert_eq!(json["hash_algorithm"], "phash");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_ready_endpoint_without_database() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_openapi_document_lists_search_path() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["paths"]["/products/search-by-image"]["post"].is_object());
}

#[tokio::test]
async fn test_unknown_route_returns_not_found() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/products")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Search Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_search_returns_identical_products_first() {
    let query = encode_png(&stripes(10, true));
    let (content_type, body) = create_search_multipart(&query, "image/png", &[]);

    let (status, json) = post_search(
        create_test_app(),
        "/products/search-by-image?threshold=0",
        content_type,
        body,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["threshold"], 0);
    assert_eq!(json["count"], 2);

    let matches = json["matches"].as_array().unwrap();
    assert_eq!(matches[0]["candidate_id"], "mug");
    assert_eq!(matches[0]["distance"], 0);
    assert_eq!(matches[0]["name"], "Product mug");
    assert_eq!(matches[0]["image_url"], "https://cdn.example.com/mug.png");
    assert_eq!(matches[1]["candidate_id"], "mug-copy");
}

#[tokio::test]
async fn test_search_respects_max_results() {
    let query = encode_png(&stripes(10, true));
    let (content_type, body) = create_search_multipart(&query, "image/png", &[]);

    let (status, json) = post_search(
        create_test_app(),
        "/products/search-by-image?threshold=64&max_results=1",
        content_type,
        body,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(json["matches"][0]["candidate_id"], "mug");
}

#[tokio::test]
async fn test_search_uses_default_threshold() {
    let query = encode_png(&stripes(10, true));
    let (content_type, body) = create_search_multipart(&query, "image/png", &[]);

    let (status, json) =
        post_search(create_test_app(), "/products/search-by-image", content_type, body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["threshold"], 30);
    for m in json["matches"].as_array().unwrap() {
        assert!(m["distance"].as_u64().unwrap() <= 30);
    }
}

#[tokio::test]
async fn test_search_accepts_form_field_parameters() {
    let query = encode_png(&stripes(10, true));
    let (content_type, body) =
        create_search_multipart(&query, "image/png", &[("threshold", "0"), ("max_results", "1")]);

    let (status, json) =
        post_search(create_test_app(), "/products/search-by-image", content_type, body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["threshold"], 0);
    assert_eq!(json["count"], 1);
}

#[tokio::test]
async fn test_search_undecodable_upload_returns_empty() {
    let (content_type, body) =
        create_search_multipart(b"definitely not an image", "application/octet-stream", &[]);

    let (status, json) =
        post_search(create_test_app(), "/products/search-by-image", content_type, body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 0);
    assert!(json["matches"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_search_empty_upload_returns_empty() {
    let (content_type, body) = create_search_multipart(b"", "image/jpeg", &[]);

    let (status, json) =
        post_search(create_test_app(), "/products/search-by-image", content_type, body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 0);
}

#[tokio::test]
async fn test_search_rejects_threshold_above_fingerprint_width() {
    let query = encode_png(&stripes(10, true));
    let (content_type, body) = create_search_multipart(&query, "image/png", &[]);

    let (status, json) = post_search(
        create_test_app(),
        "/products/search-by-image?threshold=65",
        content_type,
        body,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_search_rejects_zero_and_oversized_max_results() {
    for max_results in ["0", "101"] {
        let query = encode_png(&stripes(10, true));
        let (content_type, body) = create_search_multipart(&query, "image/png", &[]);

        let (status, _) = post_search(
            create_test_app(),
            &format!("/products/search-by-image?max_results={}", max_results),
            content_type,
            body,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "max_results={}", max_results);
    }
}

#[tokio::test]
async fn test_search_rejects_non_numeric_threshold() {
    let query = encode_png(&stripes(10, true));
    let (content_type, body) = create_search_multipart(&query, "image/png", &[]);

    let (status, json) = post_search(
        create_test_app(),
        "/products/search-by-image?threshold=-3",
        content_type,
        body,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_search_rejects_unsupported_content_type() {
    let (content_type, body) = create_search_multipart(b"<html></html>", "text/html", &[]);

    let (status, json) =
        post_search(create_test_app(), "/products/search-by-image", content_type, body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_search_without_file_field() {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"threshold\"\r\n\r\n10\r\n");
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    let (status, json) = post_search(
        create_test_app(),
        "/products/search-by-image",
        format!("multipart/form-data; boundary={}", BOUNDARY),
        body,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("No file provided"));
}

#[tokio::test]
async fn test_search_lists_only_reachable_thumbnails() {
    let query = encode_png(&stripes(10, true));
    let candidates = vec![
        candidate("cdn-down"),
        candidate("mug"),
        candidate("slow"),
        candidate("corrupt"),
        candidate("mug-copy"),
        candidate("deleted"),
    ];
    // "deleted" is never registered and answers 404.
    let fetcher = InMemoryFetcher::new()
        .with_failure(candidates[0].image_url.clone(), FetchFailure::Status(503))
        .with_image(candidates[1].image_url.clone(), query.clone())
        .with_image(candidates[2].image_url.clone(), query.clone())
        .with_delay(candidates[2].image_url.clone(), Duration::from_secs(30))
        .with_image(candidates[3].image_url.clone(), b"\x89PNG\r\n\x1a\ntruncated".to_vec())
        .with_image(candidates[4].image_url.clone(), query.clone());

    let matcher = SimilarityMatcher::new(
        Arc::new(StaticCatalog::from_candidates(candidates)),
        Arc::new(fetcher),
        MatcherConfig {
            fetch_timeout: Duration::from_millis(200),
            ..Default::default()
        },
    );
    let app = create_router(AppState::new(matcher, &Config::default()));

    let (content_type, body) = create_search_multipart(&query, "image/png", &[]);
    let (status, json) = post_search(
        app,
        "/products/search-by-image?threshold=64&max_results=100",
        content_type,
        body,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);

    let ids: Vec<&str> = json["matches"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["candidate_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["mug", "mug-copy"]);
}

#[tokio::test]
async fn test_catalog_failure_returns_503() {
    let matcher = SimilarityMatcher::new(
        Arc::new(DownCatalog),
        Arc::new(InMemoryFetcher::new()),
        MatcherConfig::default(),
    );
    let app = create_router(AppState::new(matcher, &Config::default()));

    let query = encode_png(&stripes(10, true));
    let (content_type, body) = create_search_multipart(&query, "image/png", &[]);
    let (status, json) = post_search(app, "/products/search-by-image", content_type, body).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "CATALOG_UNAVAILABLE");
    assert!(!json["error"].as_str().unwrap().contains("db:5432"));
}
