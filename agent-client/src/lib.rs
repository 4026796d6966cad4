//! Workflow Agent HTTP Clients
//!
//! Thin, typed clients for the two systems the webhook server talks to:
//! - GitHub REST: team membership checks and issue comments
//! - Kubernetes API: ProwJob creation
//!
//! # Example
//!
//! ```no_run
//! use agent_client::GitHubClient;
//!
//! #[tokio::main]
//! async fn main() -> agent_client::Result<()> {
//!     let github = GitHubClient::new("https://api.github.com", "token")?;
//!
//!     if github.team_has_member("acme", "maintainers", "octocat").await? {
//!         github.create_comment("acme", "community", 42, "hello").await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
mod github;
mod kube;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use github::GitHubClient;
pub use kube::KubeClient;

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Per-request timeout applied by every client
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = "workflow-agent";

fn build_http_client(builder: reqwest::ClientBuilder) -> Result<Client> {
    builder
        .timeout(DEFAULT_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(ClientError::RequestFailed)
}

// =============================================================================
// Response Handlers
// =============================================================================

/// Check the status code and deserialize the JSON body
async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let response = ensure_success(response).await?;

    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

/// Check the status code and discard the body
async fn handle_empty_response(response: reqwest::Response) -> Result<()> {
    ensure_success(response).await.map(|_| ())
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    Ok(response)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! A one-shot HTTP server for exercising the clients against canned responses.

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve exactly one request, answering with `status` and a JSON `body`.
    ///
    /// Returns the base URL and a handle resolving to the raw request text.
    pub async fn serve_once(status: u16, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let body = body.to_string();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;

            let response = format!(
                "HTTP/1.1 {} Status\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request
        });

        (format!("http://{}", addr), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];

        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&data);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if data.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        String::from_utf8_lossy(&data).into_owned()
    }
}
