//! Debate round-barrier state machine: strictly sequential rounds, with
//! query-style concurrent fan-out inside each round. Round r+1 is never
//! dispatched while any round-r record is non-terminal.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use super::{invoke_raced, prompts, Outcome};
use crate::backend::BackendClient;
use crate::error::ArenaError;
use crate::events::{
    debate_update_payload, DebateCompletePayload, EVENT_DEBATE_COMPLETE, EVENT_DEBATE_UPDATE,
};
use crate::models::{dedup_models, DebateRun, QuestionType, ResponseStatus};
use crate::session::{RunHandle, RunState, Session};

/// Dispatches debate runs: validates participants and round count, then
/// drives the round loop in a background task.
#[derive(Clone)]
pub struct DebateOrchestrator {
    backend: Arc<dyn BackendClient>,
    deadline: Duration,
    max_participants: usize,
    max_rounds: u32,
}

impl DebateOrchestrator {
    pub fn new(
        backend: Arc<dyn BackendClient>,
        deadline: Duration,
        max_participants: usize,
        max_rounds: u32,
    ) -> Self {
        Self {
            backend,
            deadline,
            max_participants,
            max_rounds,
        }
    }

    /// Validate and start a debate run. Rejections are synchronous; progress
    /// and completion arrive on the session's event stream.
    pub fn start(
        &self,
        session: Arc<Session>,
        topic: &str,
        selected_models: &[String],
        rounds: u32,
    ) -> Result<(), ArenaError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ArenaError::invalid("debate topic must not be empty"));
        }
        let participants = dedup_models(selected_models);
        if participants.is_empty() {
            return Err(ArenaError::invalid(
                "at least one model must be selected for the debate",
            ));
        }
        if participants.len() > self.max_participants {
            return Err(ArenaError::TooManyParticipants {
                selected: participants.len(),
                max: self.max_participants,
            });
        }
        if rounds < 1 || rounds > self.max_rounds {
            return Err(ArenaError::invalid(format!(
                "debate_rounds must be between 1 and {}",
                self.max_rounds
            )));
        }

        let run = DebateRun::new(topic, participants.clone(), rounds);
        let handle = session.begin_run(RunState::Debate(run))?;

        log::info!(
            "Session '{}': debate on '{}' with {} participants, {} rounds",
            session.id,
            topic,
            participants.len(),
            rounds
        );

        let backend = self.backend.clone();
        let deadline = self.deadline;
        tokio::spawn(async move {
            run_debate(session, handle, backend, participants, rounds, deadline).await;
        });
        Ok(())
    }
}

async fn run_debate(
    session: Arc<Session>,
    handle: RunHandle,
    backend: Arc<dyn BackendClient>,
    participants: Vec<String>,
    rounds: u32,
    deadline: Duration,
) {
    for round in 1..=rounds {
        if handle.cancel.is_cancelled() {
            break;
        }

        // Open the round and compose every prompt from the snapshot of
        // strictly-prior rounds. The barrier has already closed round r-1,
        // so the transcript is immutable here.
        let round_prompts: Vec<(String, String)> = {
            let mut state = handle.state.lock().unwrap();
            let RunState::Debate(run) = &mut *state else {
                return;
            };
            if run.completed {
                // Cancelled between rounds
                return;
            }
            run.current_round = round;
            run.rounds
                .push(crate::models::RoundRecord::new(round, &participants));

            let transcript = run.transcript_before(round);
            participants
                .iter()
                .map(|model| {
                    (
                        model.clone(),
                        prompts::debate_prompt(
                            &run.topic,
                            round,
                            run.total_rounds,
                            model,
                            &transcript,
                        ),
                    )
                })
                .collect()
        };

        log::debug!("Session '{}': round {} dispatched", session.id, round);

        let mut workers = JoinSet::new();
        for (model, prompt) in round_prompts {
            let session = session.clone();
            let handle = handle.clone();
            let backend = backend.clone();
            workers.spawn(async move {
                invoke_one(&session, &handle, &backend, round, &model, &prompt, deadline).await;
            });
        }
        // The round barrier: nothing past this point until every record of
        // this round is terminal.
        while workers.join_next().await.is_some() {}
    }

    finish_debate(&session, &handle, handle.cancel.is_cancelled());
}

/// One participant in one round; mirrors the query worker but scoped to the
/// round's RoundRecord and reported through debate_update events.
async fn invoke_one(
    session: &Session,
    handle: &RunHandle,
    backend: &Arc<dyn BackendClient>,
    round: u32,
    model: &str,
    prompt: &str,
    deadline: Duration,
) {
    {
        let mut state = handle.state.lock().unwrap();
        let RunState::Debate(run) = &mut *state else {
            return;
        };
        let Some(record) = round_record_mut(run, round, model) else {
            return;
        };
        if !record.transition(ResponseStatus::Processing) {
            return;
        }
        session.emit_value(EVENT_DEBATE_UPDATE, debate_update_payload(&session.id, run));
    }

    let outcome = invoke_raced(
        backend,
        &handle.cancel,
        model,
        prompt,
        QuestionType::General,
        deadline,
    )
    .await;

    let mut state = handle.state.lock().unwrap();
    let RunState::Debate(run) = &mut *state else {
        return;
    };
    let Some(record) = round_record_mut(run, round, model) else {
        return;
    };
    let applied = match outcome {
        Outcome::Completed(reply) => record.complete(reply.text, reply.elapsed.as_secs_f64()),
        Outcome::Error(message) => {
            log::warn!(
                "Session '{}': '{}' errored in round {}; it stays in later rounds",
                session.id,
                model,
                round
            );
            record.fail(message)
        }
        Outcome::Cancelled => record.transition(ResponseStatus::Cancelled),
    };
    if applied {
        session.emit_value(EVENT_DEBATE_UPDATE, debate_update_payload(&session.id, run));
    } else {
        log::debug!(
            "Session '{}': discarding stale round-{} result for '{}'",
            session.id,
            round,
            model
        );
    }
}

fn round_record_mut<'a>(
    run: &'a mut DebateRun,
    round: u32,
    model: &str,
) -> Option<&'a mut crate::models::ResponseRecord> {
    run.rounds
        .iter_mut()
        .find(|r| r.round == round)?
        .records
        .get_mut(model)
}

/// Emit the run-level completion event exactly once and mark the run finished
fn finish_debate(session: &Session, handle: &RunHandle, cancelled: bool) {
    let mut state = handle.state.lock().unwrap();
    let RunState::Debate(run) = &mut *state else {
        return;
    };
    if run.completed {
        return;
    }
    run.completed = true;

    session.emit(
        EVENT_DEBATE_COMPLETE,
        DebateCompletePayload {
            session_id: session.id.to_string(),
            topic: run.topic.clone(),
            participants: run.participants.clone(),
            total_rounds: run.total_rounds,
            rounds_completed: run.rounds_completed(),
            cancelled,
        },
    );
    handle.finish();
    log::info!(
        "Session '{}': debate complete ({} of {} rounds{})",
        session.id,
        run.rounds_completed(),
        run.total_rounds,
        if cancelled { ", cancelled" } else { "" }
    );
}

/// Cancel the session's debate run: flip every non-terminal record of the
/// collecting round, emit the update, and close the run so no further round
/// starts. In-flight invocations are not waited for; their late results are
/// discarded.
pub fn cancel(session: &Session) {
    let Some(handle) = session.current_run() else {
        return;
    };

    let mut state = handle.state.lock().unwrap();
    let RunState::Debate(run) = &mut *state else {
        // Not a debate run; leave it alone
        return;
    };
    handle.cancel.cancel();

    let mut flipped = 0;
    for round in run.rounds.iter_mut() {
        for record in round.records.values_mut() {
            if record.transition(ResponseStatus::Cancelled) {
                flipped += 1;
            }
        }
    }
    log::info!(
        "Session '{}': debate cancelled, {} records flipped",
        session.id,
        flipped
    );
    if flipped > 0 {
        session.emit_value(EVENT_DEBATE_UPDATE, debate_update_payload(&session.id, run));
    }

    if !run.completed {
        run.completed = true;
        session.emit(
            EVENT_DEBATE_COMPLETE,
            DebateCompletePayload {
                session_id: session.id.to_string(),
                topic: run.topic.clone(),
                participants: run.participants.clone(),
                total_rounds: run.total_rounds,
                rounds_completed: run.rounds_completed(),
                cancelled: true,
            },
        );
        handle.finish();
    }
}
