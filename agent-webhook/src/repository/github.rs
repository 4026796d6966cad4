//! GitHub-backed membership checks and comments

use agent_client::GitHubClient;
use agent_core::domain::request::RepoRef;
use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{CommentPoster, MembershipChecker};

/// GitHub REST implementation of [`MembershipChecker`] and [`CommentPoster`]
#[derive(Debug, Clone)]
pub struct HttpGitHubRepository {
    client: GitHubClient,
}

impl HttpGitHubRepository {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MembershipChecker for HttpGitHubRepository {
    async fn is_team_member(&self, org: &str, team: &str, login: &str) -> Result<bool> {
        self.client
            .team_has_member(org, team, login)
            .await
            .with_context(|| format!("Failed to check membership of {} in {}/{}", login, org, team))
    }
}

#[async_trait]
impl CommentPoster for HttpGitHubRepository {
    async fn post_comment(&self, repo: &RepoRef, number: u64, body: &str) -> Result<()> {
        self.client
            .create_comment(&repo.owner, &repo.name, number, body)
            .await
            .with_context(|| {
                format!("Failed to comment on {}/{}#{}", repo.owner, repo.name, number)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn unreachable_repository() -> HttpGitHubRepository {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        HttpGitHubRepository::new(GitHubClient::new(endpoint, "token").unwrap())
    }

    #[tokio::test]
    async fn test_comment_error_names_the_issue() {
        let repository = unreachable_repository().await;
        let repo = RepoRef {
            owner: "acme".to_string(),
            name: "community".to_string(),
        };

        let err = repository.post_comment(&repo, 42, "hi").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to comment on acme/community#42");
    }

    #[tokio::test]
    async fn test_membership_error_names_the_team() {
        let repository = unreachable_repository().await;

        let err = repository
            .is_team_member("acme", "maintainers", "octocat")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to check membership of octocat in acme/maintainers"
        );
    }
}
