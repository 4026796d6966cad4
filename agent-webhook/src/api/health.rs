//! Health API Handlers
//!
//! Liveness and readiness checks for the Deployment. The server only starts
//! listening after the catalog has loaded, so readiness reports what was
//! loaded and fails only for a catalog with nothing to launch.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct Readiness {
    pub ready: bool,
    pub workflows: usize,
}

/// GET /healthz
pub async fn liveness() -> &'static str {
    "OK"
}

/// GET /healthz/ready
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let workflows = state.catalog.len();
    let status = if workflows > 0 {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(Readiness {
            ready: workflows > 0,
            workflows,
        }),
    )
}
