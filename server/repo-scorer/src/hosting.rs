//! Hosting API seam: the three read-only GitHub requests the collector needs.
//!
//! The client reports raw outcomes (including 404/409) as [`HostingError`];
//! turning those into field defaults is the collector's job.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::IgnoredAny;
use serde::Deserialize;

use crate::config::Config;
use crate::error::HostingError;
use crate::types::RepositoryReference;

const USER_AGENT: &str = concat!("repo-scorer/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// Repository summary as the hosting API returns it. Every field may be
/// missing or null upstream; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RepoSummary {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub html_url: Option<String>,
  #[serde(default)]
  pub stargazers_count: Option<u64>,
  #[serde(default)]
  pub forks_count: Option<u64>,
  #[serde(default)]
  pub language: Option<String>,
  #[serde(default)]
  pub topics: Option<Vec<String>>,
}

#[async_trait]
pub trait HostingApi: Send + Sync {
  /// `GET /repos/{owner}/{name}`.
  async fn repository(&self, repo: &RepositoryReference) -> Result<RepoSummary, HostingError>;

  /// `GET /repos/{owner}/{name}/commits?per_page={limit}`; number of commits returned.
  async fn recent_commit_count(
    &self,
    repo: &RepositoryReference,
    limit: u32,
  ) -> Result<u32, HostingError>;

  /// `GET /repos/{owner}/{name}/readme`; `Ok(true)` when a README resolves.
  async fn has_readme(&self, repo: &RepositoryReference) -> Result<bool, HostingError>;
}

/// reqwest-backed GitHub REST client.
pub struct GitHubClient {
  base_url: String,
  token: Option<String>,
  client: Client,
}

impl GitHubClient {
  pub fn new(config: &Config) -> Result<Self, HostingError> {
    let client = Client::builder()
      .timeout(config.hosting_timeout)
      .user_agent(USER_AGENT)
      .build()
      .map_err(|e| HostingError::Transport(e.to_string()))?;

    Ok(Self {
      base_url: config.github_api_url.trim_end_matches('/').to_string(),
      token: config.github_token.clone(),
      client,
    })
  }

  fn get(&self, repo: &RepositoryReference, suffix: &str) -> RequestBuilder {
    let url = format!("{}/repos/{}{}", self.base_url, repo.slug(), suffix);
    let builder = self
      .client
      .get(url)
      .header(ACCEPT, "application/vnd.github+json")
      .header("X-GitHub-Api-Version", API_VERSION);
    match &self.token {
      Some(token) => builder.header(AUTHORIZATION, format!("token {}", token)),
      None => builder,
    }
  }

  async fn send(&self, request: RequestBuilder) -> Result<Response, HostingError> {
    let response = request
      .send()
      .await
      .map_err(|e| HostingError::Transport(e.to_string()))?;
    let status = response.status();
    if status.is_success() {
      Ok(response)
    } else {
      Err(HostingError::from_status(status.as_u16()))
    }
  }
}

#[async_trait]
impl HostingApi for GitHubClient {
  async fn repository(&self, repo: &RepositoryReference) -> Result<RepoSummary, HostingError> {
    let response = self.send(self.get(repo, "")).await?;
    response
      .json::<RepoSummary>()
      .await
      .map_err(|e| HostingError::Decode(e.to_string()))
  }

  async fn recent_commit_count(
    &self,
    repo: &RepositoryReference,
    limit: u32,
  ) -> Result<u32, HostingError> {
    let request = self
      .get(repo, "/commits")
      .query(&[("per_page", limit.to_string())]);
    let response = self.send(request).await?;
    let commits = response
      .json::<Vec<IgnoredAny>>()
      .await
      .map_err(|e| HostingError::Decode(e.to_string()))?;
    Ok((commits.len() as u32).min(limit))
  }

  async fn has_readme(&self, repo: &RepositoryReference) -> Result<bool, HostingError> {
    self.send(self.get(repo, "/readme")).await.map(|_| true)
  }
}
