//! Kubernetes-backed job submission

use agent_client::KubeClient;
use agent_core::domain::prowjob::ProwJob;
use anyhow::{Context, Result};
use async_trait::async_trait;

use super::JobSubmitter;

/// Creates ProwJobs through the Kubernetes API
#[derive(Debug, Clone)]
pub struct HttpJobSubmitter {
    client: KubeClient,
}

impl HttpJobSubmitter {
    pub fn new(client: KubeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobSubmitter for HttpJobSubmitter {
    async fn submit(&self, prow_job: &ProwJob) -> Result<()> {
        self.client
            .submit_prow_job(prow_job, &prow_job.metadata.namespace)
            .await
            .with_context(|| format!("Failed to create ProwJob {}", prow_job.metadata.name))
    }
}
