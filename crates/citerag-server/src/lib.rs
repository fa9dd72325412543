//! CiteRAG HTTP Server
//!
//! Answers questions over HTTP, streaming citations ahead of the answer text
//! on one response body, and accepts documents for ingestion.

mod error;
mod routes;
mod state;

pub use error::ApiError;
pub use routes::{BlockingAnswer, IngestResponse, QueryBody};
pub use state::AppState;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use citerag_core::Config;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

/// Build the application router
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/api/query", post(routes::query))
        .route("/api/ingest", post(routes::ingest))
        .route("/api/documents", get(routes::documents))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until Ctrl+C
pub async fn start_server(config: Config) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let app = router(state, config.server.max_upload_bytes);

    let bind = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!("citerag listening on http://{}", listener.local_addr()?);
    tracing::info!(
        "Generation model {} ({}), conversation mode {:?}",
        config.generation.model,
        if config.generation.streaming {
            "streaming"
        } else {
            "blocking"
        },
        config.query.conversation_mode
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
