//! Run orchestration: concurrent Q&A fan-out and the debate round-barrier
//! state machine. Both dispatch one task per backend invocation and apply
//! terminal transitions under the run's per-session lock.

pub mod debate;
pub mod prompts;
pub mod query;

pub use debate::DebateOrchestrator;
pub use query::QueryOrchestrator;

use std::sync::Arc;
use std::time::Duration;

use crate::backend::{BackendClient, BackendReply};
use crate::models::QuestionType;
use crate::session::CancelFlag;

/// Outcome of one raced invocation, before it is applied to a record
pub(crate) enum Outcome {
    Completed(BackendReply),
    Error(String),
    Cancelled,
}

/// Race one backend invocation against the run's cancel flag and the
/// per-invocation deadline. Cancellation drops the invocation future
/// (advisory abort); a deadline expiry behaves exactly like an externally
/// observed cancellation of this one invocation.
pub(crate) async fn invoke_raced(
    backend: &Arc<dyn BackendClient>,
    cancel: &CancelFlag,
    model: &str,
    prompt: &str,
    hint: QuestionType,
    deadline: Duration,
) -> Outcome {
    tokio::select! {
        _ = cancel.cancelled() => Outcome::Cancelled,
        result = tokio::time::timeout(deadline, backend.invoke(model, prompt, hint)) => {
            match result {
                Ok(Ok(reply)) => Outcome::Completed(reply),
                Ok(Err(e)) => Outcome::Error(e.to_string()),
                Err(_) => {
                    log::warn!("Invocation of '{}' hit the {}s deadline", model, deadline.as_secs());
                    Outcome::Cancelled
                }
            }
        }
    }
}
