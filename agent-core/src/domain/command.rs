//! `/agent` command parsing
//!
//! Format: `/agent <workflow-name> [key=value ...] [--timeout 30m] [--flag ...]`
//!
//! Parsing is a single left-to-right pass over whitespace separated tokens.
//! Duplicate keys keep the last value so an edited comment parses the same
//! way every time it is delivered.

use std::collections::BTreeMap;

use crate::domain::duration::{DurationError, parse_duration};

/// Literal that must open a comment for it to be treated as a command
pub const TRIGGER: &str = "/agent";

const TIMEOUT_FLAG: &str = "--timeout";
const TIMEOUT_FLAG_PREFIX: &str = "--timeout=";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("not a valid agent command")]
    NotACommand,

    #[error("--timeout flag requires a value")]
    MissingTimeoutValue,

    #[error("invalid argument format: {0} (expected key=value or --flag)")]
    InvalidArgument(String),

    #[error("missing required arguments: {}", .0.join(", "))]
    MissingRequiredArgs(Vec<String>),

    #[error("invalid timeout format '{value}': {source}")]
    InvalidTimeout {
        value: String,
        #[source]
        source: DurationError,
    },
}

/// A parsed `/agent` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCommand {
    pub workflow_name: String,
    pub args: BTreeMap<String, String>,
    pub flags: Vec<String>,
}

impl AgentCommand {
    /// Parse comment text into a command
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        let tokens: Vec<&str> = text.split_whitespace().collect();

        if tokens.len() < 2 || tokens[0] != TRIGGER {
            return Err(CommandError::NotACommand);
        }

        let mut command = Self {
            workflow_name: tokens[1].to_string(),
            args: BTreeMap::new(),
            flags: Vec::new(),
        };

        let mut rest = tokens[2..].iter();
        while let Some(&token) = rest.next() {
            if token == TIMEOUT_FLAG {
                match rest.next() {
                    Some(&value) if !value.starts_with("--") => {
                        command.flags.push(token.to_string());
                        command.flags.push(value.to_string());
                    }
                    _ => return Err(CommandError::MissingTimeoutValue),
                }
            } else if token.starts_with("--") {
                // Covers `--timeout=VALUE` as well as any other flag.
                command.flags.push(token.to_string());
            } else if let Some((key, value)) = token.split_once('=') {
                let (key, value) = (key.trim(), value.trim());
                if key.is_empty() || value.is_empty() {
                    return Err(CommandError::InvalidArgument(token.to_string()));
                }
                command.args.insert(key.to_string(), value.to_string());
            } else {
                return Err(CommandError::InvalidArgument(token.to_string()));
            }
        }

        Ok(command)
    }

    /// Ensure every required argument is present with a non-blank value
    ///
    /// Reports every missing name, sorted, not just the first one.
    pub fn validate_required_args<S: AsRef<str>>(
        &self,
        required: &[S],
    ) -> Result<(), CommandError> {
        let mut missing: Vec<String> = required
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| {
                self.args
                    .get(*name)
                    .is_none_or(|value| value.trim().is_empty())
            })
            .map(str::to_string)
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        missing.sort();
        missing.dedup();
        Err(CommandError::MissingRequiredArgs(missing))
    }

    /// Ensure a `--timeout` value, when given, is a valid duration
    pub fn validate_timeout(&self) -> Result<(), CommandError> {
        if let Some(value) = self.timeout() {
            parse_duration(value).map_err(|source| CommandError::InvalidTimeout {
                value: value.to_string(),
                source,
            })?;
        }
        Ok(())
    }

    /// The `--timeout` value, if the command set one
    pub fn timeout(&self) -> Option<&str> {
        let mut flags = self.flags.iter();
        while let Some(flag) = flags.next() {
            if flag == TIMEOUT_FLAG {
                return flags.next().map(String::as_str).filter(|v| !v.is_empty());
            }
            if let Some(value) = flag.strip_prefix(TIMEOUT_FLAG_PREFIX) {
                return Some(value).filter(|v| !v.is_empty());
            }
        }
        None
    }

    /// Render the command back into comment text that parses to the same command
    pub fn to_command_text(&self) -> String {
        let mut parts = vec![TRIGGER.to_string(), self.workflow_name.clone()];
        parts.extend(self.args.iter().map(|(k, v)| format!("{}={}", k, v)));
        parts.extend(self.flags.iter().cloned());
        parts.join(" ")
    }
}
