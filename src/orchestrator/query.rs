//! Q&A fan-out: one concurrent invocation per selected backend, per-record
//! events as results arrive, one run-level completion event at the end.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use super::{invoke_raced, prompts, Outcome};
use crate::backend::BackendClient;
use crate::error::ArenaError;
use crate::events::{
    FailedModel, QueryCompletePayload, ResponseUpdatePayload, EVENT_QUERY_COMPLETE,
    EVENT_RESPONSE_UPDATE,
};
use crate::models::{dedup_models, QueryRun, QuestionType, ResponseStatus};
use crate::session::{RunHandle, RunState, Session};

/// Dispatches Q&A runs. Stateless apart from the backend handle; all run
/// state lives in the session.
#[derive(Clone)]
pub struct QueryOrchestrator {
    backend: Arc<dyn BackendClient>,
    deadline: Duration,
}

impl QueryOrchestrator {
    pub fn new(backend: Arc<dyn BackendClient>, deadline: Duration) -> Self {
        Self { backend, deadline }
    }

    /// Validate and start a query run. Rejections are synchronous and leave
    /// no run behind; results arrive on the session's event stream.
    pub fn start(
        &self,
        session: Arc<Session>,
        question: &str,
        hint: QuestionType,
        selected_models: &[String],
    ) -> Result<(), ArenaError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ArenaError::invalid("question must not be empty"));
        }
        let models = dedup_models(selected_models);
        if models.is_empty() {
            return Err(ArenaError::invalid("at least one model must be selected"));
        }

        let run = QueryRun::new(question, hint, &models);
        let handle = session.begin_run(RunState::Query(run))?;

        log::info!(
            "Session '{}': query fan-out to {} models ({})",
            session.id,
            models.len(),
            hint
        );

        let prompt = prompts::enhance_prompt(question, hint);
        let backend = self.backend.clone();
        let deadline = self.deadline;
        tokio::spawn(async move {
            run_query(session, handle, backend, prompt, hint, models, deadline).await;
        });
        Ok(())
    }
}

async fn run_query(
    session: Arc<Session>,
    handle: RunHandle,
    backend: Arc<dyn BackendClient>,
    prompt: String,
    hint: QuestionType,
    models: Vec<String>,
    deadline: Duration,
) {
    let mut workers = JoinSet::new();
    for model in models {
        let session = session.clone();
        let handle = handle.clone();
        let backend = backend.clone();
        let prompt = prompt.clone();
        workers.spawn(async move {
            invoke_one(&session, &handle, &backend, &model, &prompt, hint, deadline).await;
        });
    }
    while workers.join_next().await.is_some() {}

    // A cancel may have already completed the run; finish_query is a no-op then
    finish_query(&session, &handle, false);
}

/// One worker: mark processing, race the invocation, apply the terminal
/// transition. A record that is already terminal when the result arrives is
/// stale (cancelled earlier) and the result is discarded without an event.
async fn invoke_one(
    session: &Session,
    handle: &RunHandle,
    backend: &Arc<dyn BackendClient>,
    model: &str,
    prompt: &str,
    hint: QuestionType,
    deadline: Duration,
) {
    {
        let mut state = handle.state.lock().unwrap();
        let RunState::Query(run) = &mut *state else {
            return;
        };
        let Some(record) = run.records.get_mut(model) else {
            return;
        };
        if !record.transition(ResponseStatus::Processing) {
            // Cancelled before dispatch
            return;
        }
        session.emit(
            EVENT_RESPONSE_UPDATE,
            ResponseUpdatePayload {
                session_id: session.id.clone(),
                record: record.clone(),
            },
        );
    }

    let outcome = invoke_raced(backend, &handle.cancel, model, prompt, hint, deadline).await;

    let mut state = handle.state.lock().unwrap();
    let RunState::Query(run) = &mut *state else {
        return;
    };
    let Some(record) = run.records.get_mut(model) else {
        return;
    };
    let applied = match outcome {
        Outcome::Completed(reply) => record.complete(reply.text, reply.elapsed.as_secs_f64()),
        Outcome::Error(message) => record.fail(message),
        Outcome::Cancelled => record.transition(ResponseStatus::Cancelled),
    };
    if applied {
        session.emit(
            EVENT_RESPONSE_UPDATE,
            ResponseUpdatePayload {
                session_id: session.id.clone(),
                record: record.clone(),
            },
        );
    } else {
        log::debug!(
            "Session '{}': discarding stale result for '{}' ({})",
            session.id,
            model,
            record.status
        );
    }
}

/// Emit the run-level completion event exactly once and mark the run finished
fn finish_query(session: &Session, handle: &RunHandle, cancelled: bool) {
    let mut state = handle.state.lock().unwrap();
    let RunState::Query(run) = &mut *state else {
        return;
    };
    if run.completed {
        return;
    }
    run.completed = true;

    let failed = run.failed();
    let payload = QueryCompletePayload {
        session_id: session.id.to_string(),
        successful_count: run.successful_count(),
        failed_count: failed.len(),
        failed_models: failed
            .iter()
            .map(|r| FailedModel {
                model: r.model.clone(),
                error: r.error.clone().unwrap_or_default(),
            })
            .collect(),
        cancelled,
    };
    session.emit(EVENT_QUERY_COMPLETE, payload);
    handle.finish();
    log::info!("Session '{}': query run complete", session.id);
}

/// Cancel the session's query run: flip every non-terminal record to
/// cancelled, emit their terminal events, then the completion event,
/// without waiting for in-flight invocations to physically stop.
pub fn cancel(session: &Session) {
    let Some(handle) = session.current_run() else {
        return;
    };

    // Flip and complete under one lock so the supervisor cannot interleave
    // its own completion event between the flips and ours.
    let mut state = handle.state.lock().unwrap();
    let RunState::Query(run) = &mut *state else {
        // Not a query run; leave it alone
        return;
    };
    handle.cancel.cancel();

    let mut flipped = 0;
    for record in run.records.values_mut() {
        if record.transition(ResponseStatus::Cancelled) {
            flipped += 1;
            session.emit(
                EVENT_RESPONSE_UPDATE,
                ResponseUpdatePayload {
                    session_id: session.id.clone(),
                    record: record.clone(),
                },
            );
        }
    }
    log::info!(
        "Session '{}': query cancelled, {} records flipped",
        session.id,
        flipped
    );

    if !run.completed {
        run.completed = true;
        let failed = run.failed();
        session.emit(
            EVENT_QUERY_COMPLETE,
            QueryCompletePayload {
                session_id: session.id.to_string(),
                successful_count: run.successful_count(),
                failed_count: failed.len(),
                failed_models: failed
                    .iter()
                    .map(|r| FailedModel {
                        model: r.model.clone(),
                        error: r.error.clone().unwrap_or_default(),
                    })
                    .collect(),
                cancelled: true,
            },
        );
        handle.finish();
    }
}
