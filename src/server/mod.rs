//! HTTP transport for the healing engine.

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::healing::engine::HealingEngine;

pub mod api_model;
pub mod handlers;

/// Markup snapshots of large pages easily exceed axum's 2 MB default.
pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Shared state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<HealingEngine>,
}

impl AppState {
    pub fn new(engine: HealingEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/learn", post(handlers::learn))
        .route("/heal", post(handlers::heal))
        .route("/fingerprints/*page_key", get(handlers::list_fingerprints))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener until the process is stopped.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Healing server running at http://{}", addr);
    }
    axum::serve(listener, build_router(state)).await
}
