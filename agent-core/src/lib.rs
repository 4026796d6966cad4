//! Workflow Agent Core
//!
//! Core types and logic for turning `/agent` comments into ProwJobs.
//!
//! This crate contains:
//! - Domain types: workflow catalog, agent commands, the ProwJob model
//! - DTOs: GitHub webhook payloads consumed by the server
//! - The job generator that combines the two

pub mod domain;
pub mod dto;
pub mod generator;
