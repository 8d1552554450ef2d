use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::mpsc;

/// Shared state for the HTTP boundary: just the sender side of the dispatch
/// loop's trigger channel. The handlers never touch tasks directly — every
/// execution request is funneled through the loop so launches stay
/// serialized.
pub struct AppState {
    pub trigger_tx: mpsc::Sender<String>,
}

impl AppState {
    pub fn new(trigger_tx: mpsc::Sender<String>) -> Self {
        Self { trigger_tx }
    }
}

/// Assemble the Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/scheduler/run", post(crate::http::trigger::trigger_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
