//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod health;
pub mod search;

pub use crate::state::AppState;
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use search::{search_by_image_handler, ProductMatch, SearchQuery, SearchResponse};
