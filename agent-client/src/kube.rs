//! Kubernetes API endpoints
//!
//! Only ProwJob creation is needed, so this speaks plain REST against the
//! `prow.k8s.io/v1` custom resource instead of pulling in a full Kubernetes
//! client.

use agent_core::domain::prowjob::{GROUP, ProwJob, RESOURCE, VERSION};
use reqwest::{Certificate, Client};
use std::path::Path;

use crate::build_http_client;
use crate::error::{ClientError, Result};
use crate::handle_empty_response;

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// HTTP client for the Kubernetes API server
#[derive(Debug, Clone)]
pub struct KubeClient {
    /// API server URL (e.g., "https://10.0.0.1:443")
    api_url: String,
    token: Option<String>,
    client: Client,
}

impl KubeClient {
    /// Create a client for an explicit API server
    ///
    /// # Arguments
    /// * `api_url` - API server base URL
    /// * `token` - Bearer token, if the server requires one
    /// * `ca_pem` - PEM bundle to trust in addition to the system roots
    pub fn new(
        api_url: impl Into<String>,
        token: Option<String>,
        ca_pem: Option<&[u8]>,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(pem) = ca_pem {
            let cert = Certificate::from_pem(pem)
                .map_err(|e| ClientError::InvalidConfig(format!("invalid CA bundle: {}", e)))?;
            builder = builder.add_root_certificate(cert);
        }

        let api_url = api_url.into();
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            client: build_http_client(builder)?,
        })
    }

    /// Create a client from files on disk
    ///
    /// Missing paths are skipped; a path that exists but cannot be read is an error.
    pub fn from_files(
        api_url: impl Into<String>,
        token_path: Option<&Path>,
        ca_path: Option<&Path>,
    ) -> Result<Self> {
        let token = token_path
            .filter(|p| p.exists())
            .map(read_file)
            .transpose()?
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let ca = ca_path.filter(|p| p.exists()).map(read_file).transpose()?;

        Self::new(api_url, token, ca.as_deref().map(str::as_bytes))
    }

    /// Create a client from the pod's service account
    pub fn in_cluster() -> Result<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST").map_err(|_| {
            ClientError::InvalidConfig("KUBERNETES_SERVICE_HOST is not set".to_string())
        })?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());

        let dir = Path::new(SERVICE_ACCOUNT_DIR);
        Self::from_files(
            in_cluster_url(&host, &port),
            Some(dir.join("token").as_path()),
            Some(dir.join("ca.crt").as_path()),
        )
    }

    /// Get the API server URL
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Create a ProwJob in `namespace`
    pub async fn submit_prow_job(&self, prow_job: &ProwJob, namespace: &str) -> Result<()> {
        let url = prow_jobs_url(&self.api_url, namespace);

        tracing::info!(
            "Submitting ProwJob to Kubernetes: name={}, namespace={}",
            prow_job.metadata.name,
            namespace
        );

        let mut request = self.client.post(&url).json(prow_job);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        handle_empty_response(response).await?;

        tracing::info!(
            "Successfully submitted ProwJob: name={}, namespace={}",
            prow_job.metadata.name,
            namespace
        );
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ClientError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn in_cluster_url(host: &str, port: &str) -> String {
    // IPv6 service hosts need brackets
    if host.contains(':') {
        format!("https://[{}]:{}", host, port)
    } else {
        format!("https://{}:{}", host, port)
    }
}

fn prow_jobs_url(api_url: &str, namespace: &str) -> String {
    format!(
        "{}/apis/{}/{}/namespaces/{}/{}",
        api_url, GROUP, VERSION, namespace, RESOURCE
    )
}
