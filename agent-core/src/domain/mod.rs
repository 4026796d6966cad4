//! Core domain types
//!
//! Workflow catalog, command grammar and the ProwJob resource model shared by
//! the webhook server and its clients.

pub mod command;
pub mod duration;
pub mod prowjob;
pub mod quantity;
pub mod request;
pub mod workflow;
