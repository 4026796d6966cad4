//! ProwJob generator
//!
//! Turns a validated command plus its originating issue into a complete
//! ProwJob. Generation is pure apart from the clock and the random job id
//! suffix; nothing is submitted from here.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::duration::{DurationError, format_duration, parse_duration};
use crate::domain::prowjob::{
    API_VERSION, ConfigMapVolumeSource, Container, DecorationConfig, EnvVar, GcsConfiguration,
    KIND, ObjectMeta, PodSpec, ProwJob, ProwJobAgent, ProwJobSpec, ProwJobState, ProwJobStatus,
    ProwJobType, ResourceRequirements, SecretVolumeSource, Volume, VolumeMount,
};
use crate::domain::quantity::Quantity;
use crate::domain::request::JobContext;
use crate::domain::workflow::{WorkflowCatalog, WorkflowDefinition};

pub const TRIGGERED_BY: &str = "workflow-agent";
pub const DEFAULT_NAMESPACE: &str = "prow-jobs";

const JOB_NAME_PREFIX: &str = "periodic-agent";
const RANDOM_SUFFIX_BYTES: usize = 6;
const CONTAINER_NAME: &str = "workflow-runner";
const SERVICE_ACCOUNT: &str = "workflow-runner";
const S3_CREDENTIALS_SECRET: &str = "s3-credentials";

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("workflow {0} not found")]
    UnknownWorkflow(String),

    #[error("invalid timeout: {0}")]
    InvalidTimeout(#[from] DurationError),

    #[error("failed to generate job id: {0}")]
    Entropy(String),
}

/// Deployment-level settings baked into every generated job
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Namespace ProwJobs are created in
    pub namespace: String,
    /// Artifact bucket for pod-utility log upload; decoration is off when unset
    pub artifact_bucket: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            artifact_bucket: None,
        }
    }
}

/// A generated ProwJob together with the timeout it was built with
#[derive(Debug, Clone)]
pub struct GeneratedJob {
    pub prow_job: ProwJob,
    pub timeout: Duration,
}

impl GeneratedJob {
    pub fn name(&self) -> &str {
        &self.prow_job.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.prow_job.metadata.namespace
    }
}

/// Builds ProwJobs from catalog workflows
#[derive(Debug, Clone)]
pub struct JobGenerator {
    catalog: Arc<WorkflowCatalog>,
    config: GeneratorConfig,
}

impl JobGenerator {
    pub fn new(catalog: Arc<WorkflowCatalog>, config: GeneratorConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &WorkflowCatalog {
        &self.catalog
    }

    /// Create the ProwJob for one workflow invocation
    ///
    /// `timeout_override` is the user's `--timeout` value; when absent the
    /// workflow's own timeout applies. An unknown workflow or an unparsable
    /// override aborts generation. Bad resource quantities do not: they fall
    /// back to conservative defaults.
    pub fn create_workflow_prow_job(
        &self,
        workflow_name: &str,
        args: &BTreeMap<String, String>,
        flags: &[String],
        context: &JobContext,
        timeout_override: Option<&str>,
    ) -> Result<GeneratedJob, GenerateError> {
        let workflow = self
            .catalog
            .get(workflow_name)
            .map_err(|_| GenerateError::UnknownWorkflow(workflow_name.to_string()))?;

        let timeout = match timeout_override.filter(|t| !t.is_empty()) {
            Some(value) => parse_duration(value)?,
            None => workflow.timeout_duration,
        };

        let job_name = format!(
            "{}-{}-{}",
            JOB_NAME_PREFIX,
            dns_safe_name(workflow_name),
            generate_job_id(Utc::now())?
        );

        tracing::debug!(
            job = %job_name,
            workflow = workflow_name,
            issue = context.issue.number,
            "Generating ProwJob"
        );

        let prow_job = ProwJob {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: self.build_metadata(job_name, workflow_name, args, context, timeout),
            spec: ProwJobSpec {
                job_type: ProwJobType::Periodic,
                agent: ProwJobAgent::Kubernetes,
                cluster: "default".to_string(),
                job: prow_job_name(workflow_name),
                decoration_config: self.build_decoration(timeout),
                pod_spec: build_pod_spec(workflow_name, workflow, args, flags, context),
            },
            status: ProwJobStatus {
                start_time: Utc::now(),
                state: ProwJobState::Triggered,
                description: format!("Job triggered by {}", TRIGGERED_BY),
            },
        };

        Ok(GeneratedJob { prow_job, timeout })
    }

    fn build_metadata(
        &self,
        name: String,
        workflow_name: &str,
        args: &BTreeMap<String, String>,
        context: &JobContext,
        timeout: Duration,
    ) -> ObjectMeta {
        let labels = BTreeMap::from([
            ("workflow-type".to_string(), workflow_name.to_string()),
            ("triggered-by".to_string(), TRIGGERED_BY.to_string()),
            ("prow.k8s.io/type".to_string(), "periodic".to_string()),
            ("prow.k8s.io/job".to_string(), prow_job_name(workflow_name)),
            ("prow.k8s.io/refs.org".to_string(), context.repo.owner.clone()),
            ("prow.k8s.io/refs.repo".to_string(), context.repo.name.clone()),
            ("created-by-prow".to_string(), "true".to_string()),
        ]);

        let annotations = BTreeMap::from([
            (
                "workflow-agent/workflow-name".to_string(),
                workflow_name.to_string(),
            ),
            (
                "workflow-agent/issue-number".to_string(),
                context.issue.number.to_string(),
            ),
            ("workflow-agent/command-args".to_string(), flatten_args(args)),
            ("workflow-agent/timeout".to_string(), format_duration(timeout)),
        ]);

        ObjectMeta {
            name,
            namespace: self.config.namespace.clone(),
            labels,
            annotations,
        }
    }

    fn build_decoration(&self, timeout: Duration) -> Option<DecorationConfig> {
        let bucket = self.config.artifact_bucket.as_deref()?;
        if bucket.is_empty() {
            return None;
        }

        Some(DecorationConfig {
            timeout: Some(format_duration(timeout)),
            gcs_configuration: Some(GcsConfiguration {
                bucket: format!("s3://{}", bucket.trim_start_matches("s3://")),
                path_strategy: "explicit".to_string(),
            }),
            s3_credentials_secret: Some(S3_CREDENTIALS_SECRET.to_string()),
        })
    }
}

fn build_pod_spec(
    workflow_name: &str,
    workflow: &WorkflowDefinition,
    args: &BTreeMap<String, String>,
    flags: &[String],
    context: &JobContext,
) -> PodSpec {
    PodSpec {
        restart_policy: "Never".to_string(),
        service_account_name: SERVICE_ACCOUNT.to_string(),
        containers: vec![Container {
            name: CONTAINER_NAME.to_string(),
            image: workflow.image.clone(),
            command: workflow.command.clone(),
            args: build_container_args(args, flags),
            env: build_env(workflow_name, workflow, context),
            resources: build_resources(workflow),
            volume_mounts: vec![
                VolumeMount {
                    name: "github-app".to_string(),
                    mount_path: "/etc/github".to_string(),
                    read_only: true,
                },
                VolumeMount {
                    name: "jobs-config".to_string(),
                    mount_path: "/prow/jobs".to_string(),
                    read_only: true,
                },
            ],
        }],
        volumes: vec![
            Volume {
                name: "github-app".to_string(),
                secret: Some(SecretVolumeSource {
                    secret_name: "github-app-files".to_string(),
                }),
                config_map: None,
            },
            Volume {
                name: "jobs-config".to_string(),
                secret: None,
                config_map: Some(ConfigMapVolumeSource {
                    name: "jobs-config".to_string(),
                }),
            },
        ],
    }
}

/// Fixed context vars first, then literal workflow env, then secret references
fn build_env(
    workflow_name: &str,
    workflow: &WorkflowDefinition,
    context: &JobContext,
) -> Vec<EnvVar> {
    let mut env = vec![
        EnvVar::literal("WORKFLOW_NAME", workflow_name),
        EnvVar::literal("ISSUE_NUMBER", context.issue.number.to_string()),
        EnvVar::literal("REPO_OWNER", &context.repo.owner),
        EnvVar::literal("REPO_NAME", &context.repo.name),
        EnvVar::literal("ISSUE_AUTHOR", &context.issue.author),
        EnvVar::literal("REQUESTED_BY", &context.requested_by),
    ];

    env.extend(
        workflow
            .environment
            .iter()
            .map(|(name, value)| EnvVar::literal(name, value)),
    );

    env.extend(
        workflow
            .environment_from_secrets
            .iter()
            .map(|(name, secret)| EnvVar::from_secret(name, &secret.name, &secret.key)),
    );

    env
}

/// `--key value` for every argument in key order, then the raw flags
///
/// Flags are passed through untouched, so a `--timeout` the user gave also
/// reaches the container.
fn build_container_args(args: &BTreeMap<String, String>, flags: &[String]) -> Vec<String> {
    args.iter()
        .flat_map(|(key, value)| [format!("--{}", key), value.clone()])
        .chain(flags.iter().cloned())
        .collect()
}

fn build_resources(workflow: &WorkflowDefinition) -> ResourceRequirements {
    let mut resources = ResourceRequirements::default();
    let Some(limits) = &workflow.resources else {
        return resources;
    };

    for (resource, value) in [("cpu", &limits.cpu), ("memory", &limits.memory)] {
        if value.is_empty() {
            continue;
        }
        let quantity = Quantity::parse_or_fallback(value);
        resources
            .requests
            .insert(resource.to_string(), quantity.clone());
        resources.limits.insert(resource.to_string(), quantity);
    }

    resources
}

fn prow_job_name(workflow_name: &str) -> String {
    format!("agent-workflow-{}", workflow_name)
}

/// Lowercase alphanumerics and hyphens only (DNS-1123)
fn dns_safe_name(workflow_name: &str) -> String {
    workflow_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

/// Unix timestamp plus a random hex suffix
fn generate_job_id(now: DateTime<Utc>) -> Result<String, GenerateError> {
    let mut random = [0u8; RANDOM_SUFFIX_BYTES];
    getrandom::getrandom(&mut random).map_err(|e| GenerateError::Entropy(e.to_string()))?;
    Ok(format!("{}-{}", now.timestamp(), hex::encode(random)))
}

/// `key=value,key=value` in key order, for the audit annotation
fn flatten_args(args: &BTreeMap<String, String>) -> String {
    args.iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(",")
}
