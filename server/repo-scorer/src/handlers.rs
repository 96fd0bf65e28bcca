//! HTTP handlers for the analysis service.

use axum::{
  extract::{rejection::JsonRejection, State},
  http::StatusCode,
  Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::error::ErrorKind;
use crate::state::AppState;
use crate::types::{FailureDescriptor, PipelineOutcome, RepositoryReference};

#[derive(Debug, Deserialize)]
pub struct AnalyzePayload {
  /// `owner/name` or a github.com URL.
  pub repository: String,
}

pub async fn health() -> &'static str {
  "ok"
}

pub async fn analyze(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<AnalyzePayload>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
  // Unreadable bodies get the same failure shape as a bad reference.
  let Json(payload) = match payload {
    Ok(p) => p,
    Err(rejection) => {
      info!(status = %rejection.status(), error = %rejection.body_text(), "rejected analyze body");
      return invalid_reference(rejection.body_text());
    }
  };

  let repo = match RepositoryReference::parse(&payload.repository) {
    Ok(r) => r,
    Err(e) => {
      info!(input = %payload.repository, error = %e, "rejected repository reference");
      return invalid_reference(e.to_string());
    }
  };

  let outcome = state.pipeline.run(&repo, &state.api_key).await;
  let status = match &outcome {
    PipelineOutcome::Succeeded(_) => StatusCode::OK,
    PipelineOutcome::Failed(f) => status_for(f.kind),
  };
  (status, Json(to_json(&outcome)))
}

fn invalid_reference(detail: String) -> (StatusCode, Json<Value>) {
  let outcome = PipelineOutcome::Failed(FailureDescriptor::new(ErrorKind::InvalidReference, detail, 0));
  (status_for(ErrorKind::InvalidReference), Json(to_json(&outcome)))
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::InvalidReference => StatusCode::BAD_REQUEST,
    ErrorKind::RepositoryNotFound => StatusCode::NOT_FOUND,
    ErrorKind::QuotaExceeded | ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
    ErrorKind::AuthenticationFailed | ErrorKind::MalformedResponse => StatusCode::BAD_GATEWAY,
    ErrorKind::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
  }
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
  serde_json::to_value(value).unwrap_or_else(|e| {
    serde_json::json!({ "status": "failed", "kind": "internal", "message": e.to_string() })
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::hosting::RepoSummary;
  use crate::pipeline::Pipeline;
  use crate::testing::{ScriptedModel, StaticHosting};
  use axum::body::Body;
  use axum::extract::FromRequest;
  use axum::http::header::CONTENT_TYPE;
  use axum::http::Request;

  fn state(hosting: StaticHosting, model: ScriptedModel) -> Arc<AppState> {
    Arc::new(AppState {
      pipeline: Pipeline::new(&Config::default(), Arc::new(hosting), Arc::new(model)),
      api_key: "key".into(),
    })
  }

  fn payload(repository: &str) -> Result<Json<AnalyzePayload>, JsonRejection> {
    Ok(Json(AnalyzePayload {
      repository: repository.into(),
    }))
  }

  async fn raw_payload(content_type: &str, body: &'static str) -> Result<Json<AnalyzePayload>, JsonRejection> {
    let request = Request::builder()
      .method("POST")
      .uri("/analyze")
      .header(CONTENT_TYPE, content_type)
      .body(Body::from(body))
      .unwrap();
    Json::<AnalyzePayload>::from_request(request, &()).await
  }

  #[tokio::test]
  async fn invalid_reference_is_400() {
    let st = state(StaticHosting::missing(), ScriptedModel::new(vec![]));
    let (status, Json(body)) = analyze(State(st), payload("not a repo")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["kind"], "invalid_reference");
    assert_eq!(body["message"], ErrorKind::InvalidReference.user_message());
  }

  #[tokio::test]
  async fn unreadable_body_is_400_with_failure_shape() {
    for (content_type, body) in [
      ("application/json", "{\"repository\": "),
      ("application/json", "{\"repo\": \"octo/hello\"}"),
      ("text/plain", "octo/hello"),
    ] {
      let model = ScriptedModel::new(vec![]);
      let st = state(StaticHosting::missing(), model);
      let rejected = raw_payload(content_type, body).await;
      assert!(rejected.is_err(), "{} / {}", content_type, body);

      let (status, Json(out)) = analyze(State(st), rejected).await;
      assert_eq!(status, StatusCode::BAD_REQUEST);
      assert_eq!(out["status"], "failed");
      assert_eq!(out["kind"], "invalid_reference");
      assert_eq!(out["attempts"], 0);
      assert!(!out["detail"].as_str().unwrap().is_empty());
    }
  }

  #[tokio::test]
  async fn well_formed_body_is_parsed() {
    let parsed = raw_payload("application/json", r#"{"repository": "octo/hello"}"#)
      .await
      .unwrap();
    assert_eq!(parsed.0.repository, "octo/hello");
  }

  #[tokio::test]
  async fn missing_repository_is_404() {
    let st = state(StaticHosting::missing(), ScriptedModel::new(vec![]));
    let (status, Json(body)) = analyze(State(st), payload("https://github.com/octo/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["kind"], "repository_not_found");
  }

  #[tokio::test]
  async fn success_is_200_with_result() {
    let hosting = StaticHosting::new(RepoSummary::default(), 10, true);
    let model = ScriptedModel::new(vec![Ok(
      r#"{"score": 45, "level": "Intermediate", "medal": "Bronze", "summary": "Fine.", "roadmap": ["Add CI"]}"#
        .into(),
    )]);
    let (status, Json(body)) = analyze(State(state(hosting, model)), payload("octo/hello")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "succeeded");
    assert_eq!(body["result"]["score"], 45);
    assert_eq!(body["result"]["level"], "Intermediate");
    assert_eq!(body["repository"], "octo/hello");
  }

  #[test]
  fn every_kind_maps_to_an_error_status() {
    for kind in [
      ErrorKind::InvalidReference,
      ErrorKind::RepositoryNotFound,
      ErrorKind::RateLimited,
      ErrorKind::ModelUnavailable,
      ErrorKind::AuthenticationFailed,
      ErrorKind::QuotaExceeded,
      ErrorKind::MalformedResponse,
    ] {
      let status = status_for(kind);
      assert!(status.is_client_error() || status.is_server_error(), "{:?}", kind);
    }
  }
}
