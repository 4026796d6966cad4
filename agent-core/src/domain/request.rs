//! Request context
//!
//! Identity of the conversation a command came from. It only feeds job
//! metadata and the reply target.

use serde::{Deserialize, Serialize};

/// Repository the command was posted in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

/// Issue or pull request the command was posted on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    pub number: u64,
    /// Login of the user who opened the issue
    pub author: String,
}

/// Everything about the originating event a generated job needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobContext {
    pub repo: RepoRef,
    pub issue: IssueRef,
    /// Login of the user who wrote the command
    pub requested_by: String,
}
