//! Webhook API Handler
//!
//! Authenticates a GitHub delivery and hands it to the dispatcher.
//! Once a delivery is authenticated and decoded the answer is always
//! `200 OK`; outcomes are reported on the issue instead.

use agent_core::dto::github::{ISSUE_COMMENT_EVENT, ISSUES_EVENT, IssueCommentEvent, IssuesEvent};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, header},
};
use serde::de::DeserializeOwned;
use tracing::Instrument;

use super::AppState;
use super::error::{ApiError, ApiResult};
use super::signature::verify_signature;
use crate::service::DispatchOutcome;

const EVENT_HEADER: &str = "x-github-event";
const DELIVERY_HEADER: &str = "x-github-delivery";
const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// POST /hook
/// Receive a GitHub webhook delivery
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<&'static str> {
    let event_type = header_value(&headers, EVENT_HEADER)
        .ok_or_else(|| ApiError::BadRequest("Missing X-GitHub-Event header".to_string()))?;

    let delivery = header_value(&headers, DELIVERY_HEADER)
        .ok_or_else(|| ApiError::BadRequest("Missing X-GitHub-Delivery header".to_string()))?;

    let content_type = header_value(&headers, header::CONTENT_TYPE.as_str()).unwrap_or_default();
    if !content_type.starts_with("application/json") {
        return Err(ApiError::BadRequest(format!(
            "Unsupported Content-Type {:?}, expected application/json",
            content_type
        )));
    }

    let signature = header_value(&headers, SIGNATURE_HEADER)
        .ok_or_else(|| ApiError::Forbidden("Missing X-Hub-Signature-256 header".to_string()))?;

    if !verify_signature(&state.hmac_secret, &body, signature) {
        return Err(ApiError::Forbidden("Invalid X-Hub-Signature-256".to_string()));
    }

    let span = tracing::info_span!("delivery", event = event_type, id = delivery);

    let outcome = match event_type {
        ISSUE_COMMENT_EVENT => {
            let event: IssueCommentEvent = decode(&body, event_type)?;
            state
                .dispatcher
                .handle_issue_comment(&event)
                .instrument(span.clone())
                .await
        }
        ISSUES_EVENT => {
            let event: IssuesEvent = decode(&body, event_type)?;
            state
                .dispatcher
                .handle_issue(&event)
                .instrument(span.clone())
                .await
        }
        other => {
            tracing::debug!(parent: &span, "Ignoring unsupported event type: {}", other);
            return Ok("OK");
        }
    };

    log_outcome(&span, &outcome);
    Ok("OK")
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn decode<T: DeserializeOwned>(body: &[u8], event_type: &str) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|e| {
        ApiError::BadRequest(format!("Failed to parse {} payload: {}", event_type, e))
    })
}

fn log_outcome(span: &tracing::Span, outcome: &DispatchOutcome) {
    match outcome {
        DispatchOutcome::Ignored(reason) => {
            tracing::debug!(parent: span, "Delivery ignored: {:?}", reason)
        }
        DispatchOutcome::Rejected(error) => {
            tracing::warn!(parent: span, "Delivery rejected: {}", error)
        }
        DispatchOutcome::Failed { message, replied } => {
            tracing::info!(parent: span, replied, "Delivery failed: {}", message)
        }
        DispatchOutcome::Submitted {
            job_name, replied, ..
        } => tracing::info!(parent: span, replied, "Delivery submitted job {}", job_name),
    }
}
