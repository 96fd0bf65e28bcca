//! Metric collector: hosting API responses -> fully defaulted FeatureRecord.
//!
//! The three sub-requests run concurrently and are joined; a failure in one
//! never cancels or aborts the others. All default/degradation policy lives in
//! [`resolve`] so nothing downstream ever sees a missing value.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{HostingError, PipelineError};
use crate::hosting::{HostingApi, RepoSummary};
use crate::types::*;

/// Commit list page size; `recent_commits` is capped here.
pub const COMMIT_SAMPLE: u32 = 50;

pub const DEFAULT_LANGUAGE: &str = "Unknown";
pub const DEFAULT_DESCRIPTION: &str = "No description provided";

pub struct Collector {
  hosting: Arc<dyn HostingApi>,
}

impl Collector {
  pub fn new(hosting: Arc<dyn HostingApi>) -> Self {
    Self { hosting }
  }

  /// Collect and normalize metrics for `repo`.
  ///
  /// Fails only when the repository itself does not exist.
  pub async fn collect(&self, repo: &RepositoryReference) -> Result<CollectedFeatures, PipelineError> {
    let (summary, commits, readme) = tokio::join!(
      self.hosting.repository(repo),
      self.hosting.recent_commit_count(repo, COMMIT_SAMPLE),
      self.hosting.has_readme(repo),
    );

    if matches!(summary, Err(HostingError::NotFound)) {
      debug!(repository = %repo, "repository summary returned 404");
      return Err(PipelineError::RepositoryNotFound(repo.slug()));
    }

    let collected = resolve(repo, summary, commits, readme);
    for d in &collected.degraded {
      warn!(
        repository = %repo,
        field = ?d.field,
        reason = ?d.reason,
        kind = ?d.reason.kind(),
        "feature defaulted"
      );
    }
    Ok(collected)
  }
}

fn degrade_reason(err: &HostingError) -> DegradeReason {
  match err {
    HostingError::RateLimited { .. } => DegradeReason::RateLimited,
    _ => DegradeReason::Unavailable,
  }
}

/// Resolve sub-request outcomes into a record, noting every defaulted field.
pub fn resolve(
  repo: &RepositoryReference,
  summary: Result<RepoSummary, HostingError>,
  commits: Result<u32, HostingError>,
  readme: Result<bool, HostingError>,
) -> CollectedFeatures {
  let mut degraded = Vec::new();
  let mut note = |field: FeatureField, reason: DegradeReason| {
    degraded.push(DegradedField { field, reason });
  };

  // A failed summary request degrades every field it would have supplied.
  let summary = match summary {
    Ok(s) => s,
    Err(e) => {
      let reason = degrade_reason(&e);
      for field in [
        FeatureField::Name,
        FeatureField::Description,
        FeatureField::HtmlUrl,
        FeatureField::Stars,
        FeatureField::Forks,
        FeatureField::Language,
        FeatureField::Topics,
      ] {
        note(field, reason);
      }
      RepoSummary::default()
    }
  };

  let name = non_blank(summary.name).unwrap_or_else(|| {
    note(FeatureField::Name, DegradeReason::Absent);
    repo.name().to_string()
  });
  let description = non_blank(summary.description).unwrap_or_else(|| {
    note(FeatureField::Description, DegradeReason::Absent);
    DEFAULT_DESCRIPTION.to_string()
  });
  let html_url = non_blank(summary.html_url).unwrap_or_else(|| {
    note(FeatureField::HtmlUrl, DegradeReason::Absent);
    format!("https://github.com/{}", repo.slug())
  });
  let stars = summary.stargazers_count.unwrap_or_else(|| {
    note(FeatureField::Stars, DegradeReason::Absent);
    0
  });
  let forks = summary.forks_count.unwrap_or_else(|| {
    note(FeatureField::Forks, DegradeReason::Absent);
    0
  });
  let language = non_blank(summary.language).unwrap_or_else(|| {
    note(FeatureField::Language, DegradeReason::Absent);
    DEFAULT_LANGUAGE.to_string()
  });
  let topics = summary
    .topics
    .map(|t| {
      t.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
    })
    .unwrap_or_else(|| {
      note(FeatureField::Topics, DegradeReason::Absent);
      Vec::new()
    });

  let recent_commits = match commits {
    Ok(n) => n.min(COMMIT_SAMPLE),
    // Empty repository: the answer is a definite zero.
    Err(HostingError::EmptyRepository) => 0,
    Err(e) => {
      note(FeatureField::RecentCommits, degrade_reason(&e));
      0
    }
  };

  let has_readme = match readme {
    Ok(present) => present,
    Err(HostingError::NotFound) => false,
    Err(e) => {
      note(FeatureField::Readme, degrade_reason(&e));
      false
    }
  };

  // Summary failure may have recorded a field twice (once per failure, once absent).
  degraded.sort_by_key(|d| d.field);
  degraded.dedup_by_key(|d| d.field);

  CollectedFeatures {
    record: FeatureRecord {
      name,
      description,
      html_url,
      stars,
      forks,
      language,
      recent_commits,
      has_readme,
      topics,
    },
    degraded,
  }
}

fn non_blank(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
}
