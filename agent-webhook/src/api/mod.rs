//! API Module
//!
//! HTTP surface of the webhook server.
//! Each submodule handles one endpoint.

pub mod error;
pub mod health;
pub mod help;
pub mod signature;
pub mod webhook;

use agent_core::domain::workflow::WorkflowCatalog;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::service::Dispatcher;

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub catalog: Arc<WorkflowCatalog>,
    /// Key for `X-Hub-Signature-256`
    pub hmac_secret: Arc<Vec<u8>>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Liveness and readiness
        .route("/healthz", get(health::liveness))
        .route("/healthz/ready", get(health::readiness))
        // GitHub deliveries
        .route("/hook", post(webhook::handle_webhook))
        // Plugin help for Prow's hook
        .route("/help", post(help::plugin_help))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
