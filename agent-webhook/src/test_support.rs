//! In-memory collaborators and event builders shared by the service and API tests.

use agent_core::domain::prowjob::ProwJob;
use agent_core::domain::request::RepoRef;
use agent_core::domain::workflow::WorkflowCatalog;
use agent_core::dto::github::{IssueCommentEvent, IssuesEvent};
use agent_core::generator::{GeneratorConfig, JobGenerator};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::repository::{CommentPoster, JobSubmitter, MembershipChecker};
use crate::service::{AuthorizationGate, Dispatcher};

pub const ALLOWED_TEAM: &str = "maintainers";

pub struct FakeMembership {
    calls: Mutex<Vec<String>>,
    result: Mutex<fn() -> Result<bool>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeMembership {
    /// Lookups made so far, as `org/team/login`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MembershipChecker for FakeMembership {
    async fn is_team_member(&self, org: &str, team: &str, login: &str) -> Result<bool> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}/{}/{}", org, team, login));

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = *self.result.lock().unwrap();
        result()
    }
}

#[derive(Default)]
pub struct FakeCommentPoster {
    comments: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl FakeCommentPoster {
    /// Posted comments as (`owner/repo#number`, body)
    pub fn comments(&self) -> Vec<(String, String)> {
        self.comments.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommentPoster for FakeCommentPoster {
    async fn post_comment(&self, repo: &RepoRef, number: u64, body: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("GitHub returned 502");
        }
        self.comments.lock().unwrap().push((
            format!("{}/{}#{}", repo.owner, repo.name, number),
            body.to_string(),
        ));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeJobSubmitter {
    jobs: Mutex<Vec<ProwJob>>,
    error: Mutex<Option<String>>,
}

impl FakeJobSubmitter {
    pub fn jobs(&self) -> Vec<ProwJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobSubmitter for FakeJobSubmitter {
    async fn submit(&self, prow_job: &ProwJob) -> Result<()> {
        if let Some(error) = self.error.lock().unwrap().clone() {
            anyhow::bail!(error);
        }
        self.jobs.lock().unwrap().push(prow_job.clone());
        Ok(())
    }
}

/// A dispatcher wired to fakes; every author is a member unless reconfigured
pub struct Harness {
    pub dispatcher: Dispatcher,
    pub catalog: Arc<WorkflowCatalog>,
    pub checker: Arc<FakeMembership>,
    pub poster: Arc<FakeCommentPoster>,
    pub submitter: Arc<FakeJobSubmitter>,
}

impl Harness {
    pub fn new(catalog_yaml: &str) -> Self {
        let catalog = Arc::new(WorkflowCatalog::from_yaml(catalog_yaml).unwrap());
        let checker = Arc::new(FakeMembership {
            calls: Mutex::new(Vec::new()),
            result: Mutex::new(|| Ok(true)),
            delay: Mutex::new(None),
        });
        let poster = Arc::new(FakeCommentPoster::default());
        let submitter = Arc::new(FakeJobSubmitter::default());

        let dispatcher = Dispatcher::new(
            AuthorizationGate::new(checker.clone(), ALLOWED_TEAM),
            JobGenerator::new(catalog.clone(), GeneratorConfig::default()),
            poster.clone(),
            submitter.clone(),
        );

        Self {
            dispatcher,
            catalog,
            checker,
            poster,
            submitter,
        }
    }

    pub fn with_membership(self, result: fn() -> Result<bool>) -> Self {
        *self.checker.result.lock().unwrap() = result;
        self
    }

    pub fn with_slow_membership(self, delay: Duration) -> Self {
        *self.checker.delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn with_failing_poster(self) -> Self {
        self.poster.fail.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_failing_submitter(self, error: &str) -> Self {
        *self.submitter.error.lock().unwrap() = Some(error.to_string());
        self
    }
}

/// An `issue_comment` payload on acme/community#42, commented by `octocat`
pub fn comment_event_json(action: &str, body: &str) -> serde_json::Value {
    serde_json::json!({
        "action": action,
        "issue": { "number": 42, "user": { "login": "opener" }, "body": "Issue text" },
        "comment": { "id": 1, "user": { "login": "octocat" }, "body": body },
        "repository": { "name": "community", "owner": { "login": "acme" } },
        "sender": { "login": "octocat" }
    })
}

pub fn comment_event(action: &str, body: &str) -> IssueCommentEvent {
    serde_json::from_value(comment_event_json(action, body)).unwrap()
}

/// An `issues` payload for acme/community#42, opened by `opener`
pub fn issues_event(action: &str, body: &str) -> IssuesEvent {
    serde_json::from_value(serde_json::json!({
        "action": action,
        "issue": { "number": 42, "user": { "login": "opener" }, "body": body },
        "repository": { "name": "community", "owner": { "login": "acme" } },
        "sender": { "login": "opener" }
    }))
    .unwrap()
}
