//! Logging stand-ins used with `--dry-run`
//!
//! Membership checks still hit GitHub; only the two side effects are
//! replaced.

use agent_core::domain::prowjob::ProwJob;
use agent_core::domain::request::RepoRef;
use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{CommentPoster, JobSubmitter};

#[derive(Debug, Clone, Default)]
pub struct DryRunCommentPoster;

#[async_trait]
impl CommentPoster for DryRunCommentPoster {
    async fn post_comment(&self, repo: &RepoRef, number: u64, body: &str) -> Result<()> {
        tracing::info!(
            "[dry-run] Would comment on {}/{}#{}: {}",
            repo.owner,
            repo.name,
            number,
            body
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DryRunJobSubmitter;

#[async_trait]
impl JobSubmitter for DryRunJobSubmitter {
    async fn submit(&self, prow_job: &ProwJob) -> Result<()> {
        let manifest = serde_json::to_string_pretty(prow_job)
            .context("Failed to serialize ProwJob")?;
        tracing::info!(
            "[dry-run] Would create ProwJob {} in {}:\n{}",
            prow_job.metadata.name,
            prow_job.metadata.namespace,
            manifest
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::domain::request::{IssueRef, JobContext};
    use agent_core::domain::workflow::WorkflowCatalog;
    use agent_core::generator::{GeneratorConfig, JobGenerator};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_dry_run_side_effects_succeed() {
        let catalog = WorkflowCatalog::from_yaml(
            "workflows:\n  lint:\n    image: img\n    command: [make, lint]\n",
        )
        .unwrap();
        let generator = JobGenerator::new(Arc::new(catalog), GeneratorConfig::default());
        let repo = RepoRef {
            owner: "acme".to_string(),
            name: "community".to_string(),
        };
        let context = JobContext {
            repo: repo.clone(),
            issue: IssueRef {
                number: 7,
                author: "opener".to_string(),
            },
            requested_by: "octocat".to_string(),
        };
        let job = generator
            .create_workflow_prow_job("lint", &BTreeMap::new(), &[], &context, None)
            .unwrap();

        assert!(DryRunJobSubmitter.submit(&job.prow_job).await.is_ok());
        assert!(DryRunCommentPoster.post_comment(&repo, 7, "hello").await.is_ok());
    }
}
