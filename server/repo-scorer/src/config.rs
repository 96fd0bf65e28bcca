//! Pipeline and service configuration with sane defaults.

use std::env;
use std::time::Duration;

/// Mentor persona the prompt opens with.
pub const DEFAULT_PERSONA: &str = "You are an AI Coding Mentor reviewing a student's GitHub \
repository the way a technical recruiter would. Give an honest, critical but fair evaluation \
with feedback the student can act on immediately.";

/// Runtime settings. The model API key is not stored here; callers pass it
/// to each pipeline run.
#[derive(Debug, Clone)]
pub struct Config {
  /// Bind address for the HTTP service.
  pub host: String,
  pub port: u16,
  /// Hosting API base URL (no trailing slash).
  pub github_api_url: String,
  /// Optional hosting token for a higher rate limit.
  pub github_token: Option<String>,
  /// Per sub-request timeout for the hosting API.
  pub hosting_timeout: Duration,
  /// Generative model API base URL.
  pub model_api_url: String,
  pub model_name: String,
  /// Bound on a single model call.
  pub model_timeout: Duration,
  /// Longest roadmap kept from the model's answer.
  pub roadmap_max_steps: usize,
  pub persona: String,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      host: "127.0.0.1".into(),
      port: 5005,
      github_api_url: "https://api.github.com".into(),
      github_token: None,
      hosting_timeout: Duration::from_secs(5),
      model_api_url: "https://generativelanguage.googleapis.com".into(),
      model_name: "gemini-2.5-flash".into(),
      model_timeout: Duration::from_secs(30),
      roadmap_max_steps: 5,
      persona: DEFAULT_PERSONA.into(),
    }
  }
}

impl Config {
  /// Load overrides from environment variables on top of [`Config::default`].
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  /// Same as [`Config::from_env`] with an injectable variable source.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let defaults = Self::default();

    let host = lookup("HOST").unwrap_or(defaults.host);
    let port = parse_or(&lookup, "PORT", defaults.port)?;
    let github_api_url = lookup("GITHUB_API_URL")
      .map(|u| u.trim_end_matches('/').to_string())
      .unwrap_or(defaults.github_api_url);
    let github_token = lookup("GITHUB_TOKEN").filter(|t| !t.trim().is_empty());
    let hosting_timeout = Duration::from_secs(parse_or(
      &lookup,
      "HOSTING_TIMEOUT_SECS",
      defaults.hosting_timeout.as_secs(),
    )?);
    let model_api_url = lookup("MODEL_API_URL")
      .map(|u| u.trim_end_matches('/').to_string())
      .unwrap_or(defaults.model_api_url);
    let model_name = lookup("MODEL_NAME").unwrap_or(defaults.model_name);
    let model_timeout = Duration::from_secs(parse_or(
      &lookup,
      "MODEL_TIMEOUT_SECS",
      defaults.model_timeout.as_secs(),
    )?);
    let roadmap_max_steps = parse_or(&lookup, "ROADMAP_MAX_STEPS", defaults.roadmap_max_steps)?;

    if hosting_timeout.is_zero() {
      return Err(ConfigError::InvalidValue("HOSTING_TIMEOUT_SECS"));
    }
    if model_timeout.is_zero() {
      return Err(ConfigError::InvalidValue("MODEL_TIMEOUT_SECS"));
    }
    if roadmap_max_steps == 0 {
      return Err(ConfigError::InvalidValue("ROADMAP_MAX_STEPS"));
    }

    Ok(Self {
      host,
      port,
      github_api_url,
      github_token,
      hosting_timeout,
      model_api_url,
      model_name,
      model_timeout,
      roadmap_max_steps,
      persona: defaults.persona,
    })
  }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
  F: Fn(&str) -> Option<String>,
  T: std::str::FromStr,
{
  match lookup(key) {
    Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(key)),
    None => Ok(default),
  }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("Invalid value for environment variable: {0}")]
  InvalidValue(&'static str),
}
