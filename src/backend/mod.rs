//! Backend capability: submit a prompt to one model, eventually get text or
//! a failure. Backends are opaque; the orchestrator treats every non-success
//! outcome uniformly.

pub mod catalog;
pub mod ollama;

pub use catalog::{describe_model, ModelDescriptor};
pub use ollama::OllamaClient;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ArenaError;
use crate::models::QuestionType;

/// A successful backend reply
#[derive(Debug, Clone)]
pub struct BackendReply {
    pub text: String,
    pub elapsed: Duration,
}

/// Uniform capability wrapping a model-serving backend.
///
/// Cancellation is advisory and lives outside this trait: the orchestrator
/// races `invoke` against the run's cancel flag and drops the future, which
/// aborts the underlying call. A result that arrives after cancellation is
/// discarded at the state layer either way.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Submit a prompt to one model. `hint` may adjust backend behavior but
    /// backends that ignore it must still succeed.
    async fn invoke(
        &self,
        model: &str,
        prompt: &str,
        hint: QuestionType,
    ) -> Result<BackendReply, ArenaError>;

    /// List the model identifiers this backend can serve
    async fn list_models(&self) -> Result<Vec<String>, ArenaError>;
}
