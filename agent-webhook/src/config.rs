//! Server configuration
//!
//! Every setting is a command-line flag with an environment variable
//! fallback, so the same binary runs from a shell or from a Deployment
//! manifest.

use clap::Parser;
use std::path::PathBuf;

/// Workflow agent configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "workflow-agent")]
#[command(about = "Launches catalog workflows as ProwJobs from /agent commands", long_about = None)]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8888)]
    pub port: u16,

    /// Log jobs and replies instead of creating them
    #[arg(long, env = "DRY_RUN")]
    pub dry_run: bool,

    /// GitHub team slug whose members may trigger workflows
    #[arg(long, env = "ALLOWED_TEAM")]
    pub allowed_team: String,

    /// Bucket for pod-utility artifact upload; job decoration is off when unset
    #[arg(long, env = "S3_BUCKET_NAME")]
    pub s3_bucket_name: Option<String>,

    /// File holding the webhook HMAC secret
    #[arg(long, env = "HMAC_SECRET_FILE", default_value = "/etc/webhook/hmac")]
    pub hmac_secret_file: PathBuf,

    /// Workflow catalog file
    #[arg(
        long,
        env = "WORKFLOWS_CONFIG_PATH",
        default_value = "/etc/workflows/workflows.yaml"
    )]
    pub workflow_config_path: PathBuf,

    /// Namespace ProwJobs are created in
    #[arg(long, env = "PROW_JOB_NAMESPACE", default_value = "prow-jobs")]
    pub prow_job_namespace: String,

    /// GitHub API endpoint
    #[arg(long, env = "GITHUB_ENDPOINT", default_value = "https://api.github.com")]
    pub github_endpoint: String,

    /// File holding the GitHub token
    #[arg(long, env = "GITHUB_TOKEN_PATH", default_value = "/etc/github/oauth")]
    pub github_token_path: PathBuf,

    /// Kubernetes API server; the in-cluster service account is used when unset
    #[arg(long, env = "KUBE_API_URL")]
    pub kube_api_url: Option<String>,

    /// Bearer token file for an explicit API server
    #[arg(long, env = "KUBE_TOKEN_PATH")]
    pub kube_token_path: Option<PathBuf>,

    /// CA bundle for an explicit API server
    #[arg(long, env = "KUBE_CA_PATH")]
    pub kube_ca_path: Option<PathBuf>,

    /// Log level for the agent crates when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.allowed_team.trim().is_empty() {
            anyhow::bail!("allowed_team cannot be empty");
        }

        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if !self.github_endpoint.starts_with("http://")
            && !self.github_endpoint.starts_with("https://")
        {
            anyhow::bail!("github_endpoint must start with http:// or https://");
        }

        if let Some(url) = &self.kube_api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("kube_api_url must start with http:// or https://");
            }
        }

        if self.prow_job_namespace.is_empty() {
            anyhow::bail!("prow_job_namespace cannot be empty");
        }

        Ok(())
    }

    /// Default tracing filter, used when RUST_LOG is unset
    pub fn log_filter(&self) -> String {
        let level = &self.log_level;
        format!(
            "agent_webhook={level},agent_client={level},agent_core={level},tower_http=debug"
        )
    }

    /// Read the webhook secret, trimming trailing whitespace
    pub fn read_hmac_secret(&self) -> anyhow::Result<Vec<u8>> {
        let secret = std::fs::read_to_string(&self.hmac_secret_file).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read HMAC secret {}: {}",
                self.hmac_secret_file.display(),
                e
            )
        })?;

        let secret = secret.trim();
        if secret.is_empty() {
            anyhow::bail!(
                "HMAC secret file {} is empty",
                self.hmac_secret_file.display()
            );
        }

        Ok(secret.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Config {
        let mut args = vec![
            "workflow-agent",
            "--allowed-team",
            "maintainers",
            "--port",
            "8888",
            "--github-endpoint",
            "https://api.github.com",
            "--prow-job-namespace",
            "prow-jobs",
        ];
        args.extend_from_slice(extra);
        Config::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_flags() {
        let config = parse(&["--s3-bucket-name", "artifacts", "--log-level", "debug"]);
        assert_eq!(config.allowed_team, "maintainers");
        assert_eq!(config.port, 8888);
        assert_eq!(config.s3_bucket_name.as_deref(), Some("artifacts"));
        assert!(config.validate().is_ok());
        assert!(config.log_filter().starts_with("agent_webhook=debug,"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = parse(&[]);
        assert!(config.validate().is_ok());

        config.allowed_team = " ".to_string();
        assert!(config.validate().is_err());
        config.allowed_team = "maintainers".to_string();

        config.port = 0;
        assert!(config.validate().is_err());
        config.port = 8888;

        config.github_endpoint = "api.github.com".to_string();
        assert!(config.validate().is_err());
        config.github_endpoint = "http://localhost:3000".to_string();
        assert!(config.validate().is_ok());

        config.kube_api_url = Some("k8s.local".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_hmac_secret() {
        let mut config = parse(&[]);

        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "s3cret\n").unwrap();
        config.hmac_secret_file = file.path().to_path_buf();
        assert_eq!(config.read_hmac_secret().unwrap(), b"s3cret");

        std::fs::write(file.path(), "\n").unwrap();
        assert!(config.read_hmac_secret().is_err());

        config.hmac_secret_file = PathBuf::from("/nonexistent/hmac");
        assert!(config.read_hmac_secret().is_err());
    }
}
