//! In-memory stand-ins for the hosting API and the model service.
//!
//! Both count calls so tests can assert on retries and on calls that must
//! never happen.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{HostingError, ModelError};
use crate::hosting::{HostingApi, RepoSummary};
use crate::model::ModelClient;
use crate::types::{EvaluationRequest, RepositoryReference};

/// Hosting API that answers every repository with fixed results.
pub struct StaticHosting {
  summary: Result<RepoSummary, HostingError>,
  commits: Result<u32, HostingError>,
  readme: Result<bool, HostingError>,
  calls: AtomicUsize,
}

impl StaticHosting {
  pub fn new(summary: RepoSummary, commits: u32, readme: bool) -> Self {
    Self {
      summary: Ok(summary),
      commits: Ok(commits),
      readme: Ok(readme),
      calls: AtomicUsize::new(0),
    }
  }

  /// Every endpoint answers 404.
  pub fn missing() -> Self {
    Self {
      summary: Err(HostingError::NotFound),
      commits: Err(HostingError::NotFound),
      readme: Err(HostingError::NotFound),
      calls: AtomicUsize::new(0),
    }
  }

  pub fn with_summary(mut self, summary: Result<RepoSummary, HostingError>) -> Self {
    self.summary = summary;
    self
  }

  pub fn with_commits(mut self, commits: Result<u32, HostingError>) -> Self {
    self.commits = commits;
    self
  }

  pub fn with_readme(mut self, readme: Result<bool, HostingError>) -> Self {
    self.readme = readme;
    self
  }

  /// Total sub-requests served.
  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl HostingApi for StaticHosting {
  async fn repository(&self, _repo: &RepositoryReference) -> Result<RepoSummary, HostingError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.summary.clone()
  }

  async fn recent_commit_count(
    &self,
    _repo: &RepositoryReference,
    limit: u32,
  ) -> Result<u32, HostingError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.commits.clone().map(|n| n.min(limit))
  }

  async fn has_readme(&self, _repo: &RepositoryReference) -> Result<bool, HostingError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.readme.clone()
  }
}

/// Model that replays a script of answers, one per call.
pub struct ScriptedModel {
  script: Mutex<VecDeque<Result<String, ModelError>>>,
  delay: Option<Duration>,
  calls: AtomicUsize,
}

impl ScriptedModel {
  pub fn new(script: Vec<Result<String, ModelError>>) -> Self {
    Self {
      script: Mutex::new(script.into()),
      delay: None,
      calls: AtomicUsize::new(0),
    }
  }

  /// Sleep before answering, to exercise timeouts.
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl ModelClient for ScriptedModel {
  async fn generate(&self, _request: &EvaluationRequest, _api_key: &str) -> Result<String, ModelError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }
    let next = match self.script.lock() {
      Ok(mut script) => script.pop_front(),
      Err(poisoned) => poisoned.into_inner().pop_front(),
    };
    next.unwrap_or_else(|| Err(ModelError::Transport("script exhausted".into())))
  }
}
