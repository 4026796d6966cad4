//! Workflow catalog
//!
//! The catalog maps workflow names to the container template a `/agent`
//! command runs. It is loaded once at startup from YAML and never mutated
//! afterwards; a single invalid entry fails the whole load.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::domain::duration::{DurationError, parse_duration};

/// Timeout applied when a workflow does not declare one
pub const DEFAULT_WORKFLOW_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse workflow config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid timeout for workflow {name}: {source}")]
    InvalidTimeout {
        name: String,
        #[source]
        source: DurationError,
    },

    #[error("invalid workflow {name}: {reason}")]
    InvalidWorkflow { name: String, reason: String },

    #[error("workflow {0} not found")]
    NotFound(String),
}

/// A single workflow template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub image: String,

    #[serde(default)]
    pub command: Vec<String>,

    #[serde(default)]
    pub required_args: Vec<String>,

    #[serde(default)]
    pub optional_args: Vec<String>,

    /// Timeout as written in the catalog
    #[serde(default)]
    pub timeout: String,

    /// Timeout resolved at load time
    #[serde(skip)]
    pub timeout_duration: Duration,

    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    #[serde(default, rename = "environmentFromSecrets")]
    pub environment_from_secrets: BTreeMap<String, SecretKeyRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceLimits>,
}

/// Reference to a key inside a Kubernetes secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKeyRef {
    pub name: String,
    pub key: String,
}

/// CPU and memory for the workflow container, applied as both request and limit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceLimits {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cpu: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memory: String,
}

impl WorkflowDefinition {
    /// Check the fields every workflow needs to produce a runnable pod
    pub fn validate(&self) -> Result<(), String> {
        if self.image.trim().is_empty() {
            return Err("workflow image cannot be empty".to_string());
        }
        if self.command.is_empty() {
            return Err("workflow command cannot be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    workflows: BTreeMap<String, WorkflowDefinition>,
}

/// Immutable registry of workflow definitions, keyed by name
#[derive(Debug, Clone, Default)]
pub struct WorkflowCatalog {
    workflows: BTreeMap<String, WorkflowDefinition>,
}

impl WorkflowCatalog {
    /// Load and validate a catalog from a YAML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    /// Load and validate a catalog from a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_yaml::from_str(contents)?;
        Self::from_definitions(document.workflows)
    }

    /// Build a catalog from already deserialized definitions
    ///
    /// Resolves every timeout and validates every entry. The first failure
    /// aborts construction so a partial catalog is never produced.
    pub fn from_definitions(
        definitions: BTreeMap<String, WorkflowDefinition>,
    ) -> Result<Self, CatalogError> {
        let mut workflows = BTreeMap::new();

        for (name, mut workflow) in definitions {
            workflow.timeout_duration = if workflow.timeout.trim().is_empty() {
                DEFAULT_WORKFLOW_TIMEOUT
            } else {
                parse_duration(workflow.timeout.trim()).map_err(|source| {
                    CatalogError::InvalidTimeout {
                        name: name.clone(),
                        source,
                    }
                })?
            };

            workflow
                .validate()
                .map_err(|reason| CatalogError::InvalidWorkflow {
                    name: name.clone(),
                    reason,
                })?;

            workflows.insert(name, workflow);
        }

        Ok(Self { workflows })
    }

    /// Look up a workflow by its exact name
    pub fn get(&self, name: &str) -> Result<&WorkflowDefinition, CatalogError> {
        self.workflows
            .get(name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }

    /// Iterate workflows in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &WorkflowDefinition)> {
        self.workflows
            .iter()
            .map(|(name, workflow)| (name.as_str(), workflow))
    }
}
