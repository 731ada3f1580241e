//! HTTP transport for the concierge pipeline

pub mod routes;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::errors::{RagError, Result};
use crate::rag::RagPipeline;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
}

/// Build the `/api/rag` router
pub fn router(pipeline: Arc<RagPipeline>, max_upload_bytes: usize) -> Router {
    let api = Router::new()
        .route(
            "/ingest",
            post(routes::ingest_document).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/health", get(routes::health))
        .route("/ask", post(routes::ask));

    Router::new()
        .nest("/api/rag", api)
        .with_state(AppState { pipeline })
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until the process is stopped
pub async fn serve(config: &ServerConfig, pipeline: Arc<RagPipeline>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| RagError::Config(format!("Invalid address: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| RagError::Config(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Concierge API listening on http://{}/api/rag", addr);

    axum::serve(listener, router(pipeline, config.max_upload_bytes))
        .await
        .map_err(|e| RagError::Config(format!("Server error: {}", e)))
}
