//! GitHub REST client for the label catalog and pull-request bodies.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client as HttpClient, Method, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::labels::Label;

const GITHUB_API_URL: &str = "https://api.github.com";

/// GitHub API client scoped to one repository.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http_client: HttpClient,
    base_url: String,
    token: String,
    owner: String,
    repo: String,
}

#[derive(Debug, Deserialize)]
struct GitHubError {
    message: String,
}

impl GitHubClient {
    /// Create a new client against the public GitHub API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: &str, owner: &str, repo: &str) -> Result<Self, SyncError> {
        Self::with_base_url(GITHUB_API_URL, token, owner, repo)
    }

    /// Create a client against a custom API base URL (used in tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(
        base_url: &str,
        token: &str,
        owner: &str,
        repo: &str,
    ) -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("checksync/0.1"));

        let http_client = HttpClient::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response, SyncError> {
        let mut request = self
            .http_client
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token));

        if let Some(body) = body {
            request = request.json(&body);
        }

        Ok(request.send().await?)
    }

    async fn error_for(response: Response) -> SyncError {
        let status = response.status().as_u16();
        let message = match response.json::<GitHubError>().await {
            Ok(err) => err.message,
            Err(_) => "unrecognized error body".to_string(),
        };
        SyncError::Api { status, message }
    }

    /// List the repository's label catalog.
    pub async fn list_repo_labels(&self) -> Result<Vec<Label>, SyncError> {
        let url = format!(
            "{}/repos/{}/{}/labels?per_page=100",
            self.base_url, self.owner, self.repo
        );

        let response = self.send(Method::GET, &url, None).await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let labels: Vec<Label> = response.json().await?;
        debug!(count = labels.len(), "Retrieved repository label catalog");
        Ok(labels)
    }

    /// Register a label in the repository catalog.
    ///
    /// # Errors
    ///
    /// A 422 means the label already exists; callers treat that as success.
    pub async fn create_label(&self, label: &Label) -> Result<Label, SyncError> {
        let url = format!("{}/repos/{}/{}/labels", self.base_url, self.owner, self.repo);

        let body = serde_json::json!({
            "name": label.name,
            "color": label.color,
            "description": label.description,
        });
        let response = self.send(Method::POST, &url, Some(body)).await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let created: Label = response.json().await?;
        info!(label = %created.name, "Created repository label");
        Ok(created)
    }

    /// Labels currently attached to a pull request.
    pub async fn pull_request_labels(&self, number: u64) -> Result<Vec<Label>, SyncError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/labels",
            self.base_url, self.owner, self.repo, number
        );

        let response = self.send(Method::GET, &url, None).await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let labels: Vec<Label> = response.json().await?;
        debug!(
            count = labels.len(),
            pr_number = number,
            "Retrieved labels on pull request"
        );
        Ok(labels)
    }

    /// Attach labels to a pull request. A no-op for an empty set.
    pub async fn add_labels(&self, number: u64, names: &[String]) -> Result<(), SyncError> {
        if names.is_empty() {
            return Ok(());
        }

        let url = format!(
            "{}/repos/{}/{}/issues/{}/labels",
            self.base_url, self.owner, self.repo, number
        );

        let body = serde_json::json!({ "labels": names });
        let response = self.send(Method::POST, &url, Some(body)).await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        info!(count = names.len(), pr_number = number, "Added labels to pull request");
        Ok(())
    }

    /// Detach one label from a pull request. Absent labels count as removed.
    pub async fn remove_label(&self, number: u64, name: &str) -> Result<(), SyncError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/labels/{}",
            self.base_url, self.owner, self.repo, number, name
        );

        let response = self.send(Method::DELETE, &url, None).await?;
        match response.status().as_u16() {
            200 | 204 => {
                debug!(label = %name, pr_number = number, "Removed label from pull request");
                Ok(())
            }
            404 => {
                debug!(
                    label = %name,
                    pr_number = number,
                    "Label not found on pull request (already removed)"
                );
                Ok(())
            }
            _ => Err(Self::error_for(response).await),
        }
    }

    /// Detach a set of labels from a pull request. A no-op for an empty set.
    /// Every removal is attempted; failures are collected and reported
    /// together afterwards.
    pub async fn remove_labels(&self, number: u64, names: &[String]) -> Result<(), SyncError> {
        let mut failures = Vec::new();
        for name in names {
            if let Err(error) = self.remove_label(number, name).await {
                warn!(label = %name, pr_number = number, %error, "Failed to remove label");
                failures.push(error);
            }
        }
        SyncError::aggregate(names.len(), failures)
    }

    /// Rewrite the pull-request body.
    pub async fn update_body(&self, number: u64, new_body: &str) -> Result<(), SyncError> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.base_url, self.owner, self.repo, number
        );

        let body = serde_json::json!({ "body": new_body });
        let response = self.send(Method::PATCH, &url, Some(body)).await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        info!(pr_number = number, "Updated pull request body");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GitHubClient {
        GitHubClient::with_base_url(&server.uri(), "test-token", "acme", "widgets").unwrap()
    }

    #[tokio::test]
    async fn remove_labels_attempts_every_name_despite_failures() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/repos/acme/widgets/issues/7/labels/minor"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "message": "boom",
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/repos/acme/widgets/issues/7/labels/patch"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .remove_labels(7, &["minor".to_string(), "patch".to_string()])
            .await
            .unwrap_err();
        match err {
            SyncError::Aggregated { attempted, failures } => {
                assert_eq!(attempted, 2);
                assert_eq!(failures.len(), 1);
                assert!(matches!(failures[0], SyncError::Api { status: 500, .. }));
            }
            other => panic!("expected aggregated failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn remove_labels_treats_missing_labels_as_removed() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/repos/acme/widgets/issues/7/labels/major"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "message": "Label does not exist",
            })))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .remove_labels(7, &["major".to_string()])
            .await
            .unwrap();
    }
}
