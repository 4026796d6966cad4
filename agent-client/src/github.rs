//! GitHub REST endpoints

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ClientError, Result};
use crate::{build_http_client, handle_empty_response, handle_response};

/// HTTP client for the GitHub REST API
#[derive(Debug, Clone)]
pub struct GitHubClient {
    /// Base URL of the API (e.g., "https://api.github.com")
    base_url: String,
    token: String,
    client: Client,
}

impl GitHubClient {
    /// Create a new client authenticating with a bearer token
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = build_http_client(Client::builder())?;
        Ok(Self::with_client(base_url, token, client))
    }

    /// Create a client reading the token from a file (trailing whitespace trimmed)
    pub fn from_token_file(base_url: impl Into<String>, token_path: &Path) -> Result<Self> {
        let token = std::fs::read_to_string(token_path).map_err(|source| ClientError::Io {
            path: token_path.display().to_string(),
            source,
        })?;

        let token = token.trim();
        if token.is_empty() {
            return Err(ClientError::InvalidConfig(format!(
                "GitHub token file {} is empty",
                token_path.display()
            )));
        }

        Self::new(base_url, token)
    }

    /// Create a client around a preconfigured reqwest Client
    pub fn with_client(
        base_url: impl Into<String>,
        token: impl Into<String>,
        client: Client,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        }
    }

    /// Get the base URL of the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Post a comment on an issue or pull request
    pub async fn create_comment(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<()> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.base_url, org, repo, number
        );

        tracing::debug!("Posting comment to {}/{}#{}", org, repo, number);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .json(&CreateCommentRequest { body })
            .send()
            .await?;

        if let Err(e) = handle_empty_response(response).await {
            match &e {
                ClientError::ApiError { status: 401, .. } => tracing::warn!(
                    "GitHub authentication failed. Check token permissions for repo: {}/{}",
                    org,
                    repo
                ),
                ClientError::ApiError { status: 404, .. } => tracing::warn!(
                    "Repository or issue not found: {}/{} #{}",
                    org,
                    repo,
                    number
                ),
                _ => {}
            }
            return Err(e);
        }

        Ok(())
    }

    /// Check whether `login` is an active member of team `team_slug` in `org`
    ///
    /// A 404 from GitHub means "not a member"; any other failure is an error.
    pub async fn team_has_member(&self, org: &str, team_slug: &str, login: &str) -> Result<bool> {
        let url = format!(
            "{}/orgs/{}/teams/{}/memberships/{}",
            self.base_url, org, team_slug, login
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }

        let membership: TeamMembership = handle_response(response).await?;
        Ok(membership.state == "active")
    }
}

#[derive(Debug, Serialize)]
struct CreateCommentRequest<'a> {
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct TeamMembership {
    state: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = GitHubClient::new("https://api.github.com/", "token").unwrap();
        assert_eq!(client.base_url(), "https://api.github.com");
    }

    #[test]
    fn test_from_empty_token_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "  \n").unwrap();
        let result = GitHubClient::from_token_file("https://api.github.com", file.path());
        assert!(matches!(result, Err(ClientError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_active_member() {
        let (url, request) = serve_once(200, r#"{"state":"active","role":"member"}"#).await;
        let client = GitHubClient::new(url, "secret-token").unwrap();

        assert!(client.team_has_member("acme", "maintainers", "octocat").await.unwrap());

        let request = request.await.unwrap();
        assert!(request.starts_with("GET /orgs/acme/teams/maintainers/memberships/octocat "));
        assert!(request.to_lowercase().contains("authorization: bearer secret-token"));
    }

    #[tokio::test]
    async fn test_pending_member_is_not_authorized() {
        let (url, _request) = serve_once(200, r#"{"state":"pending"}"#).await;
        let client = GitHubClient::new(url, "token").unwrap();

        assert!(!client.team_has_member("acme", "maintainers", "newbie").await.unwrap());
    }

    #[tokio::test]
    async fn test_not_found_means_not_member() {
        let (url, _request) = serve_once(404, r#"{"message":"Not Found"}"#).await;
        let client = GitHubClient::new(url, "token").unwrap();

        assert!(!client.team_has_member("acme", "maintainers", "stranger").await.unwrap());
    }

    #[tokio::test]
    async fn test_membership_server_error_propagates() {
        let (url, _request) = serve_once(502, r#"{"message":"Bad Gateway"}"#).await;
        let client = GitHubClient::new(url, "token").unwrap();

        let err = client
            .team_has_member("acme", "maintainers", "octocat")
            .await
            .unwrap_err();
        assert!(err.is_server_error());
    }

    #[tokio::test]
    async fn test_create_comment() {
        let (url, request) = serve_once(201, r#"{"id":1}"#).await;
        let client = GitHubClient::new(url, "token").unwrap();

        client
            .create_comment("acme", "community", 42, "Started workflow")
            .await
            .unwrap();

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /repos/acme/community/issues/42/comments "));
        assert!(request.ends_with(r#"{"body":"Started workflow"}"#));
    }

    #[tokio::test]
    async fn test_create_comment_failure() {
        let (url, _request) = serve_once(404, r#"{"message":"Not Found"}"#).await;
        let client = GitHubClient::new(url, "token").unwrap();

        let err = client
            .create_comment("acme", "missing", 1, "hello")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
