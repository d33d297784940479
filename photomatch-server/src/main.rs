//! Photomatch Server - REST API for searching a product catalog by photo
//!
//! Endpoints:
//! - POST /products/search-by-image - Find products that look like an uploaded photo
//! - GET  /health, GET /ready        - Liveness and readiness
//! - GET  /api-docs/openapi.json     - OpenAPI document

use std::net::SocketAddr;
use std::sync::Arc;

use photomatch_core::{
    CandidateSource, HttpFetcherConfig, HttpImageFetcher, SimilarityMatcher, StaticCatalog,
};
use photomatch_server::{create_router_with_config, AppState, Config, PostgresCatalog};
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("photomatch_server=info,photomatch_core=info,tower_http=info")),
        )
        .with_target(true)
        .init();

    let config = Config::from_env();

    let fetcher = HttpImageFetcher::with_config(HttpFetcherConfig {
        timeout: config.fetch_timeout(),
        ..Default::default()
    })?;

    let (catalog, database): (Arc<dyn CandidateSource>, Option<PostgresCatalog>) =
        match (&config.database_url, &config.catalog_file) {
            (Some(url), _) => {
                let db = PostgresCatalog::connect(url, config.database_max_connections).await?;
                (Arc::new(db.clone()), Some(db))
            }
            (None, Some(path)) => {
                let catalog = StaticCatalog::from_json_file(path)?;
                tracing::info!(
                    path = %path.display(),
                    entries = catalog.len(),
                    "Loaded JSON catalog"
                );
                (Arc::new(catalog), None)
            }
            (None, None) => {
                tracing::warn!("Neither DATABASE_URL nor CATALOG_FILE set, catalog is empty");
                (Arc::new(StaticCatalog::default()), None)
            }
        };

    let matcher = SimilarityMatcher::new(catalog, Arc::new(fetcher), config.matcher_config());

    let mut state = AppState::new(matcher, &config);
    if let Some(db) = database {
        state = state.with_database(db);
    }

    let app = create_router_with_config(state, &config);

    let addr = config.socket_addr();
    tracing::info!(
        %addr,
        algorithm = %config.hash_algorithm,
        threshold = config.default_threshold,
        max_results = config.default_max_results,
        concurrency = config.search_concurrency,
        "Photomatch server listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
