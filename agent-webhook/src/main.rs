//! Workflow Agent
//!
//! GitHub webhook server that turns `/agent <workflow>` comments from team
//! members into ProwJobs and reports back on the issue.

use agent_client::{GitHubClient, KubeClient};
use agent_core::domain::workflow::WorkflowCatalog;
use agent_core::generator::{GeneratorConfig, JobGenerator};
use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::AppState;
use config::Config;
use repository::{
    CommentPoster, DryRunCommentPoster, DryRunJobSubmitter, HttpGitHubRepository,
    HttpJobSubmitter, JobSubmitter,
};
use service::{AuthorizationGate, Dispatcher};

pub mod api;
pub mod config;
pub mod repository;
pub mod service;

#[cfg(test)]
mod test_support;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.validate().context("Invalid configuration")?;

    tracing::info!("Starting workflow agent...");

    let state = build_state(&config)?;

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, api::create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Workflow agent stopped");
    Ok(())
}

fn build_state(config: &Config) -> Result<AppState> {
    let catalog = Arc::new(
        WorkflowCatalog::from_path(&config.workflow_config_path).with_context(|| {
            format!(
                "Failed to load workflows from {}",
                config.workflow_config_path.display()
            )
        })?,
    );
    tracing::info!(
        "Loaded {} workflows from {}",
        catalog.len(),
        config.workflow_config_path.display()
    );

    let hmac_secret = config.read_hmac_secret()?;

    let github = Arc::new(HttpGitHubRepository::new(
        GitHubClient::from_token_file(&config.github_endpoint, &config.github_token_path)
            .context("Failed to create GitHub client")?,
    ));

    let comments: Arc<dyn CommentPoster>;
    let jobs: Arc<dyn JobSubmitter>;
    if config.dry_run {
        tracing::warn!("Dry-run mode: jobs and replies are logged, not created");
        comments = Arc::new(DryRunCommentPoster);
        jobs = Arc::new(DryRunJobSubmitter);
    } else {
        comments = github.clone();
        jobs = Arc::new(HttpJobSubmitter::new(kube_client(config)?));
    }

    let generator = JobGenerator::new(
        catalog.clone(),
        GeneratorConfig {
            namespace: config.prow_job_namespace.clone(),
            artifact_bucket: config.s3_bucket_name.clone().filter(|b| !b.is_empty()),
        },
    );

    let dispatcher = Dispatcher::new(
        AuthorizationGate::new(github, config.allowed_team.clone()),
        generator,
        comments,
        jobs,
    );

    Ok(AppState {
        dispatcher: Arc::new(dispatcher),
        catalog,
        hmac_secret: Arc::new(hmac_secret),
    })
}

fn kube_client(config: &Config) -> Result<KubeClient> {
    let client = match &config.kube_api_url {
        Some(url) => KubeClient::from_files(
            url,
            config.kube_token_path.as_deref(),
            config.kube_ca_path.as_deref(),
        ),
        None => KubeClient::in_cluster(),
    }
    .context("Failed to create Kubernetes client")?;

    tracing::info!("Submitting ProwJobs to {}", client.api_url());
    Ok(client)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
