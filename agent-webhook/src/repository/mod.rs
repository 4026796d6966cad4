//! Repository layer
//!
//! The dispatcher's three collaborators: GitHub team membership, GitHub
//! issue comments, and ProwJob creation. Each is a trait so the dispatch
//! flow can run against fakes in tests and against logging stand-ins in
//! dry-run mode.

mod dry_run;
mod github;
mod kube;

use agent_core::domain::prowjob::ProwJob;
use agent_core::domain::request::RepoRef;
use anyhow::Result;
use async_trait::async_trait;

// Re-export implementations
pub use dry_run::{DryRunCommentPoster, DryRunJobSubmitter};
pub use github::HttpGitHubRepository;
pub use kube::HttpJobSubmitter;

/// Answers "is this user in that team?"
#[async_trait]
pub trait MembershipChecker: Send + Sync {
    /// Returns `Ok(false)` for non-members; `Err` only when the lookup itself failed
    ///
    /// # Arguments
    /// * `org` - Organization owning the team
    /// * `team` - Team slug
    /// * `login` - GitHub login to look up
    async fn is_team_member(&self, org: &str, team: &str, login: &str) -> Result<bool>;
}

/// Posts replies on issues
#[async_trait]
pub trait CommentPoster: Send + Sync {
    async fn post_comment(&self, repo: &RepoRef, number: u64, body: &str) -> Result<()>;
}

/// Creates ProwJobs in the namespace named by their metadata
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    async fn submit(&self, prow_job: &ProwJob) -> Result<()>;
}
