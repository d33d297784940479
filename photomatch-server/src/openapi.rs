//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3 document for the search-by-photo API.

use axum::Json;
use utoipa::OpenApi;

use crate::handlers::{HealthResponse, ProductMatch, ReadyResponse, SearchResponse};

/// Photomatch API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Photomatch API",
        version = "0.1.0",
        description = r#"
## Search a product catalog by photo

Upload a photo and get back the catalog products whose thumbnails look like it.

- Images are reduced to **64-bit perceptual fingerprints** (pHash by default)
- Similarity is the **Hamming distance** between fingerprints (0 = identical)
- Products further than `threshold` are dropped; the rest are returned closest first
- Thumbnails that cannot be fetched or decoded are skipped, never fatal
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Search", description = "Find products by visual similarity"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::search::search_by_image_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            SearchResponse,
            ProductMatch,
        )
    )
)]
pub struct ApiDoc;

/// GET /api-docs/openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
