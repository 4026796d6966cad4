//! Help API Handler
//!
//! Prow's hook asks external plugins for help by POSTing the list of repos
//! the plugin is enabled on and expects a plugin-help document back. Field
//! names follow Prow's Go structs, which carry no JSON tags.

use agent_core::domain::command::TRIGGER;
use agent_core::domain::duration::format_duration;
use agent_core::domain::workflow::{WorkflowCatalog, WorkflowDefinition};
use agent_core::dto::github::{ISSUE_COMMENT_EVENT, ISSUES_EVENT};
use axum::{Json, body::Bytes, extract::State};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::AppState;
use super::error::{ApiError, ApiResult};

/// One repository the plugin is enabled on
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrgRepo {
    pub org: String,
    #[serde(default)]
    pub repo: String,
}

impl OrgRepo {
    fn key(&self) -> String {
        if self.repo.is_empty() {
            self.org.clone()
        } else {
            format!("{}/{}", self.org, self.repo)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PluginHelp {
    pub description: String,
    /// Per-repo configuration summary, keyed by `org/repo`
    pub config: BTreeMap<String, String>,
    pub events: Vec<String>,
    pub commands: Vec<Command>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Command {
    pub usage: String,
    pub featured: bool,
    pub description: String,
    pub examples: Vec<String>,
    pub who_can_use: String,
}

/// POST /help
pub async fn plugin_help(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<PluginHelp>> {
    let repos: Vec<OrgRepo> = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Failed to parse repo list: {}", e)))?;

    Ok(Json(build_help(
        &state.catalog,
        state.dispatcher.allowed_team(),
        &repos,
    )))
}

pub fn build_help(
    catalog: &WorkflowCatalog,
    allowed_team: &str,
    repos: &[OrgRepo],
) -> PluginHelp {
    let who_can_use = format!("Members of the '{}' team", allowed_team);

    let mut commands = vec![Command {
        usage: format!(
            "{} <workflow-name> [key=value ...] [--timeout <duration>] [--flag ...]",
            TRIGGER
        ),
        featured: true,
        description: "Starts a catalog workflow as a ProwJob and replies with the job name."
            .to_string(),
        examples: catalog
            .iter()
            .map(|(name, workflow)| example(name, workflow))
            .collect(),
        who_can_use: who_can_use.clone(),
    }];

    commands.extend(catalog.iter().map(|(name, workflow)| Command {
        usage: usage(name, workflow),
        featured: false,
        description: describe(workflow),
        examples: vec![example(name, workflow)],
        who_can_use: who_can_use.clone(),
    }));

    let summary = format!(
        "{} workflows available: {}",
        catalog.len(),
        catalog.iter().map(|(name, _)| name).collect::<Vec<_>>().join(", ")
    );

    PluginHelp {
        description: "Launches workflows from the workflow catalog as ProwJobs. \
            The job name is posted back on the issue."
            .to_string(),
        config: repos
            .iter()
            .map(|repo| (repo.key(), summary.clone()))
            .collect(),
        events: vec![ISSUE_COMMENT_EVENT.to_string(), ISSUES_EVENT.to_string()],
        commands,
    }
}

fn usage(name: &str, workflow: &WorkflowDefinition) -> String {
    let mut usage = format!("{} {}", TRIGGER, name);
    for arg in &workflow.required_args {
        usage.push_str(&format!(" {}=<value>", arg));
    }
    for arg in &workflow.optional_args {
        usage.push_str(&format!(" [{}=<value>]", arg));
    }
    usage.push_str(" [--timeout <duration>]");
    usage
}

fn describe(workflow: &WorkflowDefinition) -> String {
    let timeout = format!("Default timeout {}.", format_duration(workflow.timeout_duration));
    let description = workflow.description.trim().trim_end_matches('.');
    if description.is_empty() {
        timeout
    } else {
        format!("{}. {}", description, timeout)
    }
}

fn example(name: &str, workflow: &WorkflowDefinition) -> String {
    let mut example = format!("{} {}", TRIGGER, name);
    for arg in &workflow.required_args {
        example.push_str(&format!(" {}=<{}>", arg, arg));
    }
    example
}
