//! Service Module
//!
//! Business logic layer for the webhook server.
//! Services orchestrate between repositories and contain domain logic.

pub mod auth;
pub mod dispatch;

// Re-export for convenience
pub use auth::AuthorizationGate;
pub use dispatch::{DispatchOutcome, Dispatcher, IgnoreReason};
