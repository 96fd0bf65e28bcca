//! Repo Scorer: repository reference in, recruiter-style assessment out.
//!
//! Collects repository metrics from the GitHub REST API, renders a
//! deterministic mentor prompt, calls the generative model under a JSON output
//! contract, and validates/repairs the answer into an EvaluationResult.
//!
//! No persistence, no end-user auth; the model key is supplied per call.

pub mod collector;
pub mod config;
pub mod error;
pub mod handlers;
pub mod hosting;
pub mod model;
pub mod pipeline;
pub mod prompt;
pub mod reference;
pub mod state;
pub mod testing;
pub mod types;
pub mod validate;

pub use config::Config;
pub use error::{ErrorKind, PipelineError};
pub use hosting::{GitHubClient, HostingApi};
pub use model::{GeminiClient, ModelClient};
pub use pipeline::Pipeline;
pub use state::AppState;
pub use types::{AnalysisReport, EvaluationResult, FailureDescriptor, PipelineOutcome, RepositoryReference};
