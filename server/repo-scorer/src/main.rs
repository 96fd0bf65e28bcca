//! Binary entrypoint for the analysis service.

use axum::{routing::get, routing::post, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repo_scorer::{AppState, Config, GeminiClient, GitHubClient, Pipeline};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "repo_scorer=info,tower_http=info".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = Config::from_env()?;
  let api_key = std::env::var("GEMINI_API_KEY")
    .map_err(|_| "GEMINI_API_KEY must be set")?;

  let hosting = Arc::new(GitHubClient::new(&config)?);
  let model = Arc::new(GeminiClient::new(&config)?);
  let state = Arc::new(AppState {
    pipeline: Pipeline::new(&config, hosting, model),
    api_key,
  });

  let app = Router::new()
    .route("/health", get(repo_scorer::handlers::health))
    .route("/analyze", post(repo_scorer::handlers::analyze))
    .layer(CorsLayer::permissive())
    .with_state(state);

  let ip: std::net::IpAddr = config.host.parse()?;
  let addr = SocketAddr::from((ip, config.port));
  info!(%addr, model = %config.model_name, "repo-scorer listening");

  let listener = tokio::net::TcpListener::bind(addr).await?;
  axum::serve(listener, app).await?;

  Ok(())
}
