//! Pipeline orchestrator: Collecting -> Prompting -> Invoking -> Validating.
//!
//! A single retry budget covers both model failures and unusable answers:
//! `Invoking`/`Validating` may loop back to `Invoking` once. Authentication
//! and quota errors never retry.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::collector::Collector;
use crate::config::Config;
use crate::error::{ErrorKind, ModelError, PipelineError};
use crate::hosting::HostingApi;
use crate::model::{Invoker, ModelClient};
use crate::prompt::PromptBuilder;
use crate::types::*;
use crate::validate::Validator;

/// Re-invocations allowed after the first model call.
pub const MODEL_RETRIES: u32 = 1;

/// Wires the four stages together. Holds no per-analysis state, so one
/// instance can serve concurrent analyses.
pub struct Pipeline {
  collector: Collector,
  builder: PromptBuilder,
  invoker: Invoker,
  validator: Validator,
}

impl Pipeline {
  pub fn new(config: &Config, hosting: Arc<dyn HostingApi>, model: Arc<dyn ModelClient>) -> Self {
    Self {
      collector: Collector::new(hosting),
      builder: PromptBuilder::new(config.persona.clone(), config.roadmap_max_steps),
      invoker: Invoker::new(model, config.model_timeout),
      validator: Validator::new(config.roadmap_max_steps),
    }
  }

  /// Run one analysis to a terminal state.
  pub async fn run(&self, repo: &RepositoryReference, api_key: &str) -> PipelineOutcome {
    let mut run = Run::new(repo);

    run.enter(Stage::Collecting);
    let collected = match self.collector.collect(repo).await {
      Ok(c) => c,
      Err(e) => return run.fail(e),
    };

    run.enter(Stage::Prompting);
    let request = self.builder.build(&collected.record);
    debug!(
      repository = %repo,
      digest = request.digest(),
      schema = request.schema_version(),
      "request rendered"
    );

    loop {
      run.enter(Stage::Invoking);
      // Only calls that reach the model count as attempts.
      if let Err(e) = Invoker::check_key(api_key) {
        return run.fail(e.into());
      }
      run.attempts += 1;
      let raw = match self.invoker.invoke(&request, api_key).await {
        Ok(raw) => raw,
        Err(e) => {
          if retryable(&e) && run.can_retry() {
            warn!(repository = %repo, attempt = run.attempts, error = %e, "model call failed; retrying");
            continue;
          }
          return run.fail(e.into());
        }
      };

      run.enter(Stage::Validating);
      match self.validator.validate(&raw) {
        Ok(validated) => return run.succeed(collected, validated, &request),
        Err(e) => {
          if run.can_retry() {
            warn!(repository = %repo, attempt = run.attempts, error = %e, "unusable model answer; retrying");
            continue;
          }
          return run.fail(e.into());
        }
      }
    }
  }
}

/// Transient failures and undecodable envelopes are worth one more call.
fn retryable(err: &ModelError) -> bool {
  err.is_transient() || err.kind() == ErrorKind::MalformedResponse
}

/// Bookkeeping for one pipeline run.
struct Run<'a> {
  repo: &'a RepositoryReference,
  stage: Stage,
  attempts: u32,
}

impl<'a> Run<'a> {
  fn new(repo: &'a RepositoryReference) -> Self {
    Self {
      repo,
      stage: Stage::Collecting,
      attempts: 0,
    }
  }

  fn enter(&mut self, next: Stage) {
    debug_assert!(!self.stage.is_terminal(), "run already finished");
    debug!(repository = %self.repo, from = ?self.stage, to = ?next, "stage");
    self.stage = next;
  }

  fn can_retry(&self) -> bool {
    self.attempts <= MODEL_RETRIES
  }

  fn fail(&mut self, err: PipelineError) -> PipelineOutcome {
    let kind = err.kind();
    warn!(
      repository = %self.repo,
      stage = ?self.stage,
      kind = ?kind,
      attempts = self.attempts,
      error = %err,
      "analysis failed"
    );
    self.stage = Stage::Failed;
    PipelineOutcome::Failed(FailureDescriptor::new(kind, err.to_string(), self.attempts))
  }

  fn succeed(
    &mut self,
    collected: CollectedFeatures,
    validated: Validated,
    request: &EvaluationRequest,
  ) -> PipelineOutcome {
    let result = validated.result;
    info!(
      repository = %self.repo,
      score = result.score,
      level = result.level.as_str(),
      attempts = self.attempts,
      repairs = validated.repairs.len(),
      degraded = collected.degraded.len(),
      "analysis succeeded"
    );
    self.stage = Stage::Succeeded;
    PipelineOutcome::Succeeded(Box::new(AnalysisReport {
      analysis_id: Uuid::new_v4(),
      analyzed_at: Utc::now(),
      repository: self.repo.slug(),
      features: collected.record,
      degraded_fields: collected.degraded,
      result,
      repairs: validated.repairs,
      request_digest: request.digest().to_string(),
      attempts: self.attempts,
    }))
  }
}
