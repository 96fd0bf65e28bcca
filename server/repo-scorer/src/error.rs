//! Structured error types for the analysis pipeline.
//!
//! Each stage has its own error enum; [`ErrorKind`] is the caller-facing
//! taxonomy every terminal failure collapses into.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Caller-facing failure taxonomy. One fixed message per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  InvalidReference,
  RepositoryNotFound,
  /// Only ever recorded as a degraded-field reason; never terminal.
  RateLimited,
  ModelUnavailable,
  AuthenticationFailed,
  QuotaExceeded,
  MalformedResponse,
}

impl ErrorKind {
  pub fn user_message(self) -> &'static str {
    match self {
      Self::InvalidReference => {
        "That does not look like a repository. Use owner/name or the full GitHub URL."
      }
      Self::RepositoryNotFound => {
        "Repository not found. Check the owner and name, and make sure the repository is public."
      }
      Self::RateLimited => "GitHub rate limit reached; some metrics were filled with defaults.",
      Self::ModelUnavailable => {
        "The evaluation model is unavailable right now. Please try again in a moment."
      }
      Self::AuthenticationFailed => {
        "The evaluation model rejected the configured API key. Check the key and try again."
      }
      Self::QuotaExceeded => "The evaluation model quota is exhausted. Please try again later.",
      Self::MalformedResponse => {
        "The evaluation model returned an answer that could not be understood. Please try again."
      }
    }
  }
}

/// Error from a single hosting-API sub-request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostingError {
  #[error("not found")]
  NotFound,

  #[error("rate limited (HTTP {status})")]
  RateLimited { status: u16 },

  /// The repository exists but has no commits (HTTP 409 on the commit list).
  #[error("repository is empty")]
  EmptyRepository,

  #[error("unexpected HTTP status {0}")]
  Status(u16),

  #[error("transport: {0}")]
  Transport(String),

  #[error("decode: {0}")]
  Decode(String),
}

impl HostingError {
  pub fn from_status(status: u16) -> Self {
    match status {
      404 => Self::NotFound,
      409 => Self::EmptyRepository,
      403 | 429 => Self::RateLimited { status },
      other => Self::Status(other),
    }
  }
}

/// Error from one model call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
  #[error("model call timed out after {0:?}")]
  Timeout(Duration),

  #[error("model transport: {0}")]
  Transport(String),

  #[error("model service error (HTTP {status}): {message}")]
  Service { status: u16, message: String },

  #[error("authentication failed: {0}")]
  Authentication(String),

  #[error("quota exceeded: {0}")]
  Quota(String),

  #[error("model response: {0}")]
  Decode(String),
}

impl ModelError {
  /// Timeouts, connection failures and 5xx responses may succeed on a second try.
  pub fn is_transient(&self) -> bool {
    match self {
      Self::Timeout(_) | Self::Transport(_) => true,
      Self::Service { status, .. } => *status >= 500,
      Self::Authentication(_) | Self::Quota(_) | Self::Decode(_) => false,
    }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Authentication(_) => ErrorKind::AuthenticationFailed,
      Self::Quota(_) => ErrorKind::QuotaExceeded,
      // An envelope we cannot read carries no usable answer.
      Self::Decode(_) => ErrorKind::MalformedResponse,
      Self::Timeout(_) | Self::Transport(_) | Self::Service { .. } => ErrorKind::ModelUnavailable,
    }
  }
}

/// The model's answer did not satisfy the result schema.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("schema: {field}: {reason}")]
pub struct SchemaError {
  pub field: String,
  pub reason: String,
}

impl SchemaError {
  pub fn new(field: &str, reason: impl Into<String>) -> Self {
    Self {
      field: field.to_string(),
      reason: reason.into(),
    }
  }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReferenceError {
  #[error("empty repository reference")]
  Empty,

  #[error("expected owner/name, got {0:?}")]
  Shape(String),

  #[error("invalid {segment} segment {value:?}")]
  Segment { segment: &'static str, value: String },
}

/// Terminal pipeline error; carries the stage-local cause.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
  #[error("repository {0} does not exist")]
  RepositoryNotFound(String),

  #[error(transparent)]
  Model(#[from] ModelError),

  #[error(transparent)]
  Schema(#[from] SchemaError),
}

impl PipelineError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::RepositoryNotFound(_) => ErrorKind::RepositoryNotFound,
      Self::Model(e) => e.kind(),
      Self::Schema(_) => ErrorKind::MalformedResponse,
    }
  }
}
