//! Shared state for the HTTP handlers.

use crate::pipeline::Pipeline;

/// One pipeline shared by every request; the model key is read-only.
pub struct AppState {
  pub pipeline: Pipeline,
  pub api_key: String,
}
