//! Dispatch service
//!
//! Carries one inbound event from routing to a reply:
//! authorize, parse, validate against the catalog, generate, submit, reply.
//! Every step after parsing that fails ends with exactly one comment on the
//! originating issue. Unauthorized authors and ordinary comments get no
//! reply at all.

use agent_core::domain::command::{AgentCommand, CommandError};
use agent_core::domain::duration::format_duration;
use agent_core::domain::request::JobContext;
use agent_core::dto::github::{IssueCommentEvent, IssuesEvent};
use agent_core::generator::{GeneratedJob, JobGenerator, TRIGGERED_BY};
use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::repository::{CommentPoster, JobSubmitter};
use crate::service::auth::AuthorizationGate;

/// Upper bound on every outbound call made while handling one event
pub const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Why an event produced no job and no reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Action other than comment created/edited or issue opened
    UnsupportedAction(String),
    /// Author is not in the allowed team
    NotAuthorized,
    /// Body does not start with the trigger
    NotACommand,
    /// Body starts with the trigger but does not parse
    MalformedCommand(String),
}

/// Terminal state of one dispatched event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Ignored(IgnoreReason),
    /// The membership lookup itself failed; nothing ran and nothing was posted
    Rejected(String),
    /// A user-visible failure; `replied` is false when posting the reply failed too
    Failed { message: String, replied: bool },
    Submitted {
        job_name: String,
        timeout: Duration,
        replied: bool,
    },
}

pub struct Dispatcher {
    gate: AuthorizationGate,
    generator: JobGenerator,
    comments: Arc<dyn CommentPoster>,
    jobs: Arc<dyn JobSubmitter>,
    call_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        gate: AuthorizationGate,
        generator: JobGenerator,
        comments: Arc<dyn CommentPoster>,
        jobs: Arc<dyn JobSubmitter>,
    ) -> Self {
        Self {
            gate,
            generator,
            comments,
            jobs,
            call_timeout: CALL_TIMEOUT,
        }
    }

    /// Override the per-call timeout
    #[cfg(test)]
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn allowed_team(&self) -> &str {
        self.gate.allowed_team()
    }

    pub async fn handle_issue_comment(&self, event: &IssueCommentEvent) -> DispatchOutcome {
        if !event.is_actionable() {
            tracing::debug!("Ignoring issue_comment action: {}", event.action);
            return DispatchOutcome::Ignored(IgnoreReason::UnsupportedAction(event.action.clone()));
        }

        self.dispatch(event.body(), event.job_context()).await
    }

    pub async fn handle_issue(&self, event: &IssuesEvent) -> DispatchOutcome {
        if !event.is_actionable() {
            tracing::debug!("Ignoring issues action: {}", event.action);
            return DispatchOutcome::Ignored(IgnoreReason::UnsupportedAction(event.action.clone()));
        }

        self.dispatch(event.body(), event.job_context()).await
    }

    async fn dispatch(&self, body: &str, context: JobContext) -> DispatchOutcome {
        let authorized = self
            .bounded(
                "membership check",
                self.gate
                    .is_authorized(&context.repo.owner, &context.requested_by),
            )
            .await;

        match authorized {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(
                    "Ignoring event from {} on {}/{}#{}: not a member of {}",
                    context.requested_by,
                    context.repo.owner,
                    context.repo.name,
                    context.issue.number,
                    self.gate.allowed_team()
                );
                return DispatchOutcome::Ignored(IgnoreReason::NotAuthorized);
            }
            Err(e) => {
                tracing::error!(
                    "Authorization check failed for {} on {}/{}#{}: {:#}",
                    context.requested_by,
                    context.repo.owner,
                    context.repo.name,
                    context.issue.number,
                    e
                );
                return DispatchOutcome::Rejected(format!("{:#}", e));
            }
        }

        let command = match AgentCommand::parse(body) {
            Ok(command) => command,
            Err(CommandError::NotACommand) => {
                return DispatchOutcome::Ignored(IgnoreReason::NotACommand);
            }
            Err(e) => {
                // Malformed invocations are dropped without a reply, like plain comments
                tracing::debug!(
                    "Ignoring malformed command on {}/{}#{}: {}",
                    context.repo.owner,
                    context.repo.name,
                    context.issue.number,
                    e
                );
                return DispatchOutcome::Ignored(IgnoreReason::MalformedCommand(e.to_string()));
            }
        };

        tracing::info!(
            "Received command for workflow {} from {} on {}/{}#{}",
            command.workflow_name,
            context.requested_by,
            context.repo.owner,
            context.repo.name,
            context.issue.number
        );

        let workflow = match self.generator.catalog().get(&command.workflow_name) {
            Ok(workflow) => workflow,
            Err(_) => {
                let message = format!("Unknown workflow: {}", command.workflow_name);
                return self.fail(&context, message).await;
            }
        };

        if let Err(e) = command.validate_required_args(&workflow.required_args) {
            return self.fail(&context, e.to_string()).await;
        }

        if let Err(e) = command.validate_timeout() {
            return self.fail(&context, e.to_string()).await;
        }

        let job = match self.generator.create_workflow_prow_job(
            &command.workflow_name,
            &command.args,
            &command.flags,
            &context,
            command.timeout(),
        ) {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(
                    "Failed to generate job for workflow {} on #{}: {}",
                    command.workflow_name,
                    context.issue.number,
                    e
                );
                let message = format!("Failed to create workflow job: {}", e);
                return self.fail(&context, message).await;
            }
        };

        if let Err(e) = self.bounded("job submission", self.jobs.submit(&job.prow_job)).await {
            tracing::error!(
                "Failed to submit job {} for workflow {} on #{}: {:#}",
                job.name(),
                command.workflow_name,
                context.issue.number,
                e
            );
            let message = format!("Failed to submit workflow job: {:#}", e);
            return self.fail(&context, message).await;
        }

        tracing::info!(
            "Submitted job {} in {} for workflow {} on {}/{}#{}",
            job.name(),
            job.namespace(),
            command.workflow_name,
            context.repo.owner,
            context.repo.name,
            context.issue.number
        );

        self.succeed(&context, &command.workflow_name, job).await
    }

    async fn succeed(
        &self,
        context: &JobContext,
        workflow_name: &str,
        job: GeneratedJob,
    ) -> DispatchOutcome {
        let message = format!(
            "Started workflow `{}` as job `{}` (timeout: {})",
            workflow_name,
            job.name(),
            format_duration(job.timeout)
        );
        let replied = self.reply(context, &message).await;

        DispatchOutcome::Submitted {
            job_name: job.name().to_string(),
            timeout: job.timeout,
            replied,
        }
    }

    async fn fail(&self, context: &JobContext, message: String) -> DispatchOutcome {
        tracing::info!(
            "Rejecting command on {}/{}#{}: {}",
            context.repo.owner,
            context.repo.name,
            context.issue.number,
            message
        );
        let replied = self.reply(context, &message).await;
        DispatchOutcome::Failed { message, replied }
    }

    /// Post `message` with the attribution footer; returns whether it was posted
    async fn reply(&self, context: &JobContext, message: &str) -> bool {
        let body = format_reply(message, Utc::now());
        let posted = self
            .bounded(
                "comment",
                self.comments
                    .post_comment(&context.repo, context.issue.number, &body),
            )
            .await;

        match posted {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    "Failed to post reply on {}/{}#{}: {:#}",
                    context.repo.owner,
                    context.repo.name,
                    context.issue.number,
                    e
                );
                false
            }
        }
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => anyhow::bail!(
                "{} timed out after {}",
                operation,
                format_duration(self.call_timeout)
            ),
        }
    }
}

/// Append the attribution footer to a reply
pub fn format_reply(message: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}\n\n_Posted by {} at {}_",
        message,
        TRIGGERED_BY,
        at.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}
