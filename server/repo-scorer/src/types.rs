//! Core types for the analysis pipeline (data model + JSON contracts).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorKind;

// ---------------------------------------------------------------------------
// Repository reference
// ---------------------------------------------------------------------------

/// `owner/name` of a hosted repository. Built only through
/// [`RepositoryReference::new`] / [`RepositoryReference::parse`], so the
/// segments always satisfy the hosting API's path syntax.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RepositoryReference {
  pub(crate) owner: String,
  pub(crate) name: String,
}

impl RepositoryReference {
  pub fn owner(&self) -> &str {
    &self.owner
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// `owner/name`, as used in hosting API paths.
  pub fn slug(&self) -> String {
    format!("{}/{}", self.owner, self.name)
  }
}

impl std::fmt::Display for RepositoryReference {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/{}", self.owner, self.name)
  }
}

// ---------------------------------------------------------------------------
// Feature record (collector output)
// ---------------------------------------------------------------------------

/// Normalized metrics for one repository. Every field always has a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRecord {
  pub name: String,
  pub description: String,
  pub html_url: String,
  pub stars: u64,
  pub forks: u64,
  pub language: String,
  /// Commits among the most recent 50 (0..=50). An activity proxy,
  /// not the lifetime commit count.
  pub recent_commits: u32,
  pub has_readme: bool,
  pub topics: Vec<String>,
}

/// A FeatureRecord field that can be filled from a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureField {
  Name,
  Description,
  HtmlUrl,
  Stars,
  Forks,
  Language,
  Topics,
  RecentCommits,
  Readme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradeReason {
  /// Hosting API answered 403/429.
  RateLimited,
  /// Sub-request failed (transport, 5xx, undecodable body).
  Unavailable,
  /// Sub-request succeeded but the field was null or absent upstream.
  Absent,
}

impl DegradeReason {
  pub fn kind(self) -> Option<ErrorKind> {
    match self {
      Self::RateLimited => Some(ErrorKind::RateLimited),
      Self::Unavailable | Self::Absent => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedField {
  pub field: FeatureField,
  pub reason: DegradeReason,
}

/// Collector output: the record plus which fields came from defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedFeatures {
  pub record: FeatureRecord,
  pub degraded: Vec<DegradedField>,
}

impl CollectedFeatures {
  pub fn is_degraded(&self, field: FeatureField) -> bool {
    self.degraded.iter().any(|d| d.field == field)
  }
}

// ---------------------------------------------------------------------------
// Evaluation request (prompt builder output)
// ---------------------------------------------------------------------------

/// Rendered model request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationRequest {
  text: String,
  schema_version: &'static str,
  digest: String,
}

impl EvaluationRequest {
  pub(crate) fn new(text: String, schema_version: &'static str) -> Self {
    let digest = blake3::hash(text.as_bytes()).to_hex()[..16].to_string();
    Self {
      text,
      schema_version,
      digest,
    }
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn schema_version(&self) -> &'static str {
    self.schema_version
  }

  /// Short blake3 digest of the rendered text, for log correlation.
  pub fn digest(&self) -> &str {
    &self.digest
  }
}

// ---------------------------------------------------------------------------
// Level / medal tiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
  Beginner,
  Intermediate,
  Advanced,
  Expert,
}

impl Level {
  pub const ALL: [Level; 4] = [
    Self::Beginner,
    Self::Intermediate,
    Self::Advanced,
    Self::Expert,
  ];

  /// 0-39 Beginner, 40-69 Intermediate, 70-89 Advanced, 90-100 Expert.
  pub fn from_score(score: u8) -> Self {
    match score {
      0..=39 => Self::Beginner,
      40..=69 => Self::Intermediate,
      70..=89 => Self::Advanced,
      _ => Self::Expert,
    }
  }

  pub fn from_str_loose(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "beginner" | "novice" => Some(Self::Beginner),
      "intermediate" => Some(Self::Intermediate),
      "advanced" => Some(Self::Advanced),
      "expert" => Some(Self::Expert),
      _ => None,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Beginner => "Beginner",
      Self::Intermediate => "Intermediate",
      Self::Advanced => "Advanced",
      Self::Expert => "Expert",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Medal {
  None,
  Bronze,
  Silver,
  Gold,
}

impl Medal {
  pub const ALL: [Medal; 4] = [Self::None, Self::Bronze, Self::Silver, Self::Gold];

  /// 0-39 None, 40-69 Bronze, 70-89 Silver, 90-100 Gold.
  pub fn from_score(score: u8) -> Self {
    match score {
      0..=39 => Self::None,
      40..=69 => Self::Bronze,
      70..=89 => Self::Silver,
      _ => Self::Gold,
    }
  }

  pub fn from_str_loose(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "none" | "no medal" | "" => Some(Self::None),
      "bronze" => Some(Self::Bronze),
      "silver" => Some(Self::Silver),
      "gold" => Some(Self::Gold),
      _ => None,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::None => "None",
      Self::Bronze => "Bronze",
      Self::Silver => "Silver",
      Self::Gold => "Gold",
    }
  }
}

// ---------------------------------------------------------------------------
// Evaluation result (validator output)
// ---------------------------------------------------------------------------

/// Validated model judgment. `level` and `medal` always agree with `score`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
  pub score: u8,
  pub level: Level,
  pub medal: Medal,
  pub summary: String,
  pub roadmap: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub strengths: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub improvements: Vec<String>,
}

/// A deviation the validator fixed instead of rejecting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repair {
  pub field: String,
  pub note: String,
}

impl Repair {
  pub fn new(field: &str, note: impl Into<String>) -> Self {
    Self {
      field: field.to_string(),
      note: note.into(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated {
  pub result: EvaluationResult,
  pub repairs: Vec<Repair>,
}

// ---------------------------------------------------------------------------
// Pipeline states and outcome (JSON contract with the caller)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
  Collecting,
  Prompting,
  Invoking,
  Validating,
  Succeeded,
  Failed,
}

impl Stage {
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Succeeded | Self::Failed)
  }
}

/// Everything the caller receives for a successful analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
  pub analysis_id: Uuid,
  pub analyzed_at: DateTime<Utc>,
  pub repository: String,
  pub features: FeatureRecord,
  /// Fields that came from defaults; informational only.
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub degraded_fields: Vec<DegradedField>,
  pub result: EvaluationResult,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub repairs: Vec<Repair>,
  pub request_digest: String,
  pub attempts: u32,
}

/// Terminal failure, one per error kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureDescriptor {
  pub kind: ErrorKind,
  pub message: String,
  pub detail: String,
  pub attempts: u32,
}

impl FailureDescriptor {
  pub fn new(kind: ErrorKind, detail: impl Into<String>, attempts: u32) -> Self {
    Self {
      kind,
      message: kind.user_message().to_string(),
      detail: detail.into(),
      attempts,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
  Succeeded(Box<AnalysisReport>),
  Failed(FailureDescriptor),
}

impl PipelineOutcome {
  pub fn stage(&self) -> Stage {
    match self {
      Self::Succeeded(_) => Stage::Succeeded,
      Self::Failed(_) => Stage::Failed,
    }
  }

  /// Model calls made, including the retry.
  pub fn attempts(&self) -> u32 {
    match self {
      Self::Succeeded(report) => report.attempts,
      Self::Failed(failure) => failure.attempts,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn level_and_medal_are_monotonic_in_score() {
    let mut prev_level = Level::Beginner;
    let mut prev_medal = Medal::None;
    for score in 0..=100u8 {
      let level = Level::from_score(score);
      let medal = Medal::from_score(score);
      assert!(level >= prev_level, "level dropped at {}", score);
      assert!(medal >= prev_medal, "medal dropped at {}", score);
      prev_level = level;
      prev_medal = medal;
    }
    assert_eq!(Level::from_score(90), Level::Expert);
    assert_eq!(Medal::from_score(90), Medal::Gold);
    assert_eq!(Level::from_score(39), Level::Beginner);
    assert_eq!(Medal::from_score(39), Medal::None);
  }

  #[test]
  fn loose_parsing_accepts_case_and_whitespace() {
    assert_eq!(Level::from_str_loose(" advanced "), Some(Level::Advanced));
    assert_eq!(Level::from_str_loose("Senior"), None);
    assert_eq!(Medal::from_str_loose("GOLD"), Some(Medal::Gold));
    assert_eq!(Medal::from_str_loose("none"), Some(Medal::None));
    assert_eq!(Medal::from_str_loose("platinum"), None);
  }

  #[test]
  fn request_digest_tracks_text() {
    let a = EvaluationRequest::new("hello".into(), "v1");
    let b = EvaluationRequest::new("hello".into(), "v1");
    let c = EvaluationRequest::new("hello!".into(), "v1");
    assert_eq!(a.digest(), b.digest());
    assert_ne!(a.digest(), c.digest());
    assert_eq!(a.digest().len(), 16);
  }

  #[test]
  fn failure_descriptor_uses_fixed_message() {
    let f = FailureDescriptor::new(ErrorKind::QuotaExceeded, "429 from model", 1);
    assert_eq!(f.message, ErrorKind::QuotaExceeded.user_message());
    let json = serde_json::to_value(&f).unwrap();
    assert_eq!(json["kind"], "quota_exceeded");
  }
}
