//! Search-by-photo handler
//!
//! Handles POST /products/search-by-image: finds catalog products whose
//! thumbnails are perceptually close to an uploaded photo.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Multipart, Query, State};
use axum::Json;
use photomatch_core::{MatchResult, SearchParams};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::multipart::MultipartFields;
use crate::state::AppState;
use crate::validation::validate_search_params;

/// Optional query-string parameters.
///
/// The same names are also accepted as multipart text fields; the query
/// string wins when both are present.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Maximum Hamming distance (0-64) for a product to count as a match.
    /// Defaults to the server's `IMAGE_HASH_THRESHOLD`.
    pub threshold: Option<u32>,
    /// Maximum number of matches to return (1-100).
    pub max_results: Option<usize>,
}

/// Response for a search-by-photo query.
#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    /// Number of matches returned.
    #[schema(example = 2)]
    pub count: usize,

    /// Threshold that was applied.
    #[schema(example = 30)]
    pub threshold: u32,

    /// Matching products, closest first.
    pub matches: Vec<ProductMatch>,
}

/// A single product within the threshold.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductMatch {
    /// Catalog identifier of the product.
    #[schema(example = "prod-1042")]
    pub candidate_id: String,

    /// Product name, when the catalog has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "Ceramic mug")]
    pub name: Option<String>,

    /// Thumbnail location the match was computed from.
    #[schema(example = "https://cdn.example.com/thumbs/1042.jpg")]
    pub image_url: String,

    /// Hamming distance from the query (0 = identical fingerprint).
    #[schema(example = 4)]
    pub distance: u32,
}

impl From<MatchResult> for ProductMatch {
    fn from(m: MatchResult) -> Self {
        Self {
            candidate_id: m.candidate.id,
            name: m.candidate.name,
            image_url: m.candidate.image_url,
            distance: m.distance,
        }
    }
}

/// Search the catalog by photo.
///
/// Fingerprints the uploaded image, compares it against every product
/// thumbnail and returns the closest products. Thumbnails that cannot be
/// fetched or decoded are skipped. An empty or undecodable upload yields an
/// empty result.
#[utoipa::path(
    post,
    path = "/products/search-by-image",
    tag = "Search",
    params(SearchQuery),
    request_body(
        content_type = "multipart/form-data",
        description = "Query image in the 'file' field"
    ),
    responses(
        (status = 200, description = "Search completed", body = SearchResponse),
        (status = 400, description = "Invalid request (missing file, bad parameters, unsupported Content-Type)"),
        (status = 503, description = "Product catalog unavailable")
    )
)]
pub async fn search_by_image_handler(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
    mut multipart: Multipart,
) -> Result<Json<SearchResponse>, ApiError> {
    let Query(query) =
        query.map_err(|e| ApiError::bad_request(format!("Invalid query parameters: {}", e)))?;

    let fields = MultipartFields::parse(&mut multipart, true, state.max_file_size).await?;
    let file = fields.require_file()?;

    let threshold = match query.threshold {
        Some(t) => t,
        None => fields
            .get_number("threshold")?
            .unwrap_or(state.default_params.threshold),
    };
    let max_results = match query.max_results {
        Some(n) => n,
        None => fields
            .get_number("max_results")?
            .unwrap_or(state.default_params.max_results),
    };

    let params = SearchParams {
        threshold,
        max_results,
    };
    validate_search_params(&params)?;

    tracing::debug!(
        bytes = file.data.len(),
        file_name = file.file_name.as_deref().unwrap_or(""),
        content_type = file.content_type.as_deref().unwrap_or(""),
        threshold,
        max_results,
        "Search by image requested"
    );

    let report = state.matcher.search_with_report(&file.data, params).await?;

    if !report.query_decoded {
        tracing::info!(bytes = file.data.len(), "Uploaded image could not be fingerprinted");
    }

    let matches: Vec<ProductMatch> = report.matches.into_iter().map(Into::into).collect();

    Ok(Json(SearchResponse {
        count: matches.len(),
        threshold,
        matches,
    }))
}
