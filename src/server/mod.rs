//! REST server for uploaded PDFs.
//!
//! Endpoints:
//! - GET /, GET /index.html - landing page
//! - GET /health - liveness check
//! - POST /upload - multipart `files` upload
//! - GET /files - list stored uploads
//! - DELETE /delete/{filename} - remove an upload
//! - GET /download/{filename} - fetch the stored PDF
//! - GET /static/* - static assets

pub mod error;
mod routes;

use std::sync::Arc;

use anyhow::Context;
use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::document;
use crate::storage::UploadStore;
use crate::Config;

/// Upper bound on `files` parts accepted in one request, used to size the body limit.
const MAX_FILES_PER_REQUEST: u64 = 20;
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    store: Arc<UploadStore>,
    max_file_size_mb: u64,
}

impl AppState {
    pub fn new(store: UploadStore, max_file_size_mb: u64) -> Self {
        Self { store: Arc::new(store), max_file_size_mb }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = document::mb_to_bytes(state.max_file_size_mb) * MAX_FILES_PER_REQUEST + MULTIPART_OVERHEAD;
    let assets = ServeDir::new(state.store.static_dir());

    Router::new()
        .route("/", get(routes::index))
        .route("/index.html", get(routes::index))
        .route("/health", get(routes::health))
        .route("/upload", post(routes::upload))
        .route("/files", get(routes::list_files))
        .route("/delete/{filename}", delete(routes::delete_file))
        .route("/download/{filename}", get(routes::download_file))
        .nest_service("/static", assets)
        .layer(DefaultBodyLimit::max(body_limit as usize))
        .layer(middleware::from_fn(log_request))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    log::info!("[HTTP] {} {} -> {}", method, path, response.status().as_u16());
    response
}

/// Prepares the folders, binds `host:port` and serves until Ctrl-C.
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let store = UploadStore::from_config(config);
    store.prepare().await?;
    let app = router(AppState::new(store, config.max_file_size_mb));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    log::info!("PDF Learner server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Cannot listen for shutdown signal: {}", e);
        return;
    }
    log::info!("PDF Learner server shutting down");
}
