//! Data Transfer Objects
//!
//! Wire types received from outside the service.

pub mod github;
