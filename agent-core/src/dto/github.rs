//! GitHub webhook payloads
//!
//! Only the fields the dispatcher reads are modelled; serde ignores the rest
//! of GitHub's (very large) event bodies.

use serde::{Deserialize, Serialize};

use crate::domain::request::{IssueRef, JobContext, RepoRef};

/// Event kinds the server acts on, taken from the `X-GitHub-Event` header
pub const ISSUE_COMMENT_EVENT: &str = "issue_comment";
pub const ISSUES_EVENT: &str = "issues";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub user: User,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueComment {
    pub user: User,
    #[serde(default)]
    pub body: Option<String>,
}

/// Payload of an `issue_comment` delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueCommentEvent {
    pub action: String,
    pub issue: Issue,
    pub comment: IssueComment,
    pub repository: Repository,
}

impl IssueCommentEvent {
    /// Only new and edited comments can carry a fresh command
    pub fn is_actionable(&self) -> bool {
        matches!(self.action.as_str(), "created" | "edited")
    }

    pub fn job_context(&self) -> JobContext {
        JobContext {
            repo: repo_ref(&self.repository),
            issue: issue_ref(&self.issue),
            requested_by: self.comment.user.login.clone(),
        }
    }

    pub fn body(&self) -> &str {
        self.comment.body.as_deref().unwrap_or_default()
    }
}

/// Payload of an `issues` delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuesEvent {
    pub action: String,
    pub issue: Issue,
    pub repository: Repository,
    pub sender: User,
}

impl IssuesEvent {
    /// A command in an issue body only counts when the issue is opened
    pub fn is_actionable(&self) -> bool {
        self.action == "opened"
    }

    pub fn job_context(&self) -> JobContext {
        JobContext {
            repo: repo_ref(&self.repository),
            issue: issue_ref(&self.issue),
            requested_by: self.sender.login.clone(),
        }
    }

    pub fn body(&self) -> &str {
        self.issue.body.as_deref().unwrap_or_default()
    }
}

fn repo_ref(repository: &Repository) -> RepoRef {
    RepoRef {
        owner: repository.owner.login.clone(),
        name: repository.name.clone(),
    }
}

fn issue_ref(issue: &Issue) -> IssueRef {
    IssueRef {
        number: issue.number,
        author: issue.user.login.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_comment_event_from_github_json() {
        let payload = serde_json::json!({
            "action": "created",
            "issue": { "number": 42, "user": { "login": "opener" }, "body": null, "state": "open" },
            "comment": { "id": 7, "user": { "login": "commenter" }, "body": "/agent lint" },
            "repository": {
                "name": "community",
                "full_name": "acme/community",
                "owner": { "login": "acme" }
            },
            "sender": { "login": "commenter" }
        });

        let event: IssueCommentEvent = serde_json::from_value(payload).unwrap();
        assert!(event.is_actionable());
        assert_eq!(event.body(), "/agent lint");

        let context = event.job_context();
        assert_eq!(context.repo.owner, "acme");
        assert_eq!(context.repo.name, "community");
        assert_eq!(context.issue.number, 42);
        assert_eq!(context.issue.author, "opener");
        assert_eq!(context.requested_by, "commenter");
    }

    #[test]
    fn test_issues_event_actions() {
        let payload = serde_json::json!({
            "action": "closed",
            "issue": { "number": 3, "user": { "login": "opener" } },
            "repository": { "name": "repo", "owner": { "login": "org" } },
            "sender": { "login": "closer" }
        });

        let event: IssuesEvent = serde_json::from_value(payload).unwrap();
        assert!(!event.is_actionable());
        assert_eq!(event.body(), "");
        assert_eq!(event.job_context().requested_by, "closer");
    }

    #[test]
    fn test_deleted_comment_is_not_actionable() {
        let payload = serde_json::json!({
            "action": "deleted",
            "issue": { "number": 1, "user": { "login": "a" } },
            "comment": { "user": { "login": "b" }, "body": "/agent wf" },
            "repository": { "name": "r", "owner": { "login": "o" } }
        });
        let event: IssueCommentEvent = serde_json::from_value(payload).unwrap();
        assert!(!event.is_actionable());
    }
}
