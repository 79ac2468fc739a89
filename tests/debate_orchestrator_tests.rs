// Integration tests for the debate state machine: the round barrier,
// verbatim transcripts, errored participants staying in, and cancellation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use model_arena_lib::backend::{BackendClient, BackendReply};
use model_arena_lib::error::ArenaError;
use model_arena_lib::events::SessionEvent;
use model_arena_lib::models::{QuestionType, ResponseStatus};
use model_arena_lib::orchestrator::DebateOrchestrator;
use model_arena_lib::session::{RunState, SessionRegistry};

#[derive(Clone)]
enum Script {
    Succeed { text: String, after: Duration },
    Fail { message: String, after: Duration },
    Hang,
}

#[derive(Clone)]
struct Dispatch {
    model: String,
    prompt: String,
    at: Instant,
}

struct MockBackend {
    scripts: HashMap<String, Script>,
    dispatches: Mutex<Vec<Dispatch>>,
    completions: Mutex<Vec<(String, Instant)>>,
}

impl MockBackend {
    fn new(scripts: Vec<(&str, Script)>) -> Arc<Self> {
        Arc::new(Self {
            scripts: scripts
                .into_iter()
                .map(|(m, s)| (m.to_string(), s))
                .collect(),
            dispatches: Mutex::new(Vec::new()),
            completions: Mutex::new(Vec::new()),
        })
    }

    fn dispatches(&self) -> Vec<Dispatch> {
        self.dispatches.lock().unwrap().clone()
    }

    fn completions(&self) -> Vec<(String, Instant)> {
        self.completions.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendClient for MockBackend {
    async fn invoke(
        &self,
        model: &str,
        prompt: &str,
        _hint: QuestionType,
    ) -> Result<BackendReply, ArenaError> {
        self.dispatches.lock().unwrap().push(Dispatch {
            model: model.to_string(),
            prompt: prompt.to_string(),
            at: Instant::now(),
        });
        let script = self.scripts.get(model).cloned().unwrap_or(Script::Hang);
        let started = Instant::now();
        let result = match script {
            Script::Succeed { text, after } => {
                tokio::time::sleep(after).await;
                Ok(BackendReply {
                    text,
                    elapsed: started.elapsed(),
                })
            }
            Script::Fail { message, after } => {
                tokio::time::sleep(after).await;
                Err(ArenaError::Backend(message))
            }
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                unreachable!("hung invocation should have been dropped")
            }
        };
        self.completions
            .lock()
            .unwrap()
            .push((model.to_string(), Instant::now()));
        result
    }

    async fn list_models(&self) -> Result<Vec<String>, ArenaError> {
        Ok(self.scripts.keys().cloned().collect())
    }
}

fn models(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn orchestrator(backend: Arc<MockBackend>) -> DebateOrchestrator {
    DebateOrchestrator::new(backend, Duration::from_secs(5), 4, 5)
}

async fn collect_until(
    rx: &mut tokio::sync::broadcast::Receiver<SessionEvent>,
    terminal: &str,
) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for events")
            .expect("event channel closed");
        let name = event.event.clone();
        events.push(event);
        if name == terminal {
            return events;
        }
    }
}

/// Which round a dispatched prompt belongs to, read from its framing
fn round_of(prompt: &str, total: u32) -> u32 {
    for r in 1..=total {
        if prompt.contains(&format!("ROUND {r} of {total}"))
            || prompt.contains(&format!("FINAL ROUND ({r} of {total})"))
        {
            return r;
        }
    }
    panic!("prompt does not name its round: {prompt}");
}

#[tokio::test]
async fn test_three_rounds_run_to_completion_in_order() {
    let backend = MockBackend::new(vec![
        (
            "llama3",
            Script::Succeed {
                text: "cats are independent".to_string(),
                after: Duration::from_millis(40),
            },
        ),
        (
            "mistral",
            Script::Succeed {
                text: "dogs are loyal".to_string(),
                after: Duration::from_millis(80),
            },
        ),
    ]);
    let registry = SessionRegistry::new(64);
    let session = registry.create_or_attach("d-rounds");
    let mut rx = session.subscribe();

    orchestrator(backend.clone())
        .start(
            session.clone(),
            "cats vs dogs",
            &models(&["llama3", "mistral"]),
            3,
        )
        .unwrap();

    let events = collect_until(&mut rx, "debate_complete").await;
    let summary = &events.last().unwrap().payload;
    assert_eq!(summary["rounds_completed"], 3);
    assert_eq!(summary["total_rounds"], 3);
    assert_eq!(summary["cancelled"], false);
    assert_eq!(summary["topic"], "cats vs dogs");

    // Two participants times three rounds
    let dispatches = backend.dispatches();
    assert_eq!(dispatches.len(), 6);

    // Dispatch order never goes backwards across rounds
    let rounds: Vec<u32> = dispatches.iter().map(|d| round_of(&d.prompt, 3)).collect();
    assert!(rounds.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(rounds.iter().filter(|&&r| r == 2).count(), 2);

    // Barrier: every round-2 dispatch happens after every round-1 completion
    let completions = backend.completions();
    let last_round1_done = completions[..2].iter().map(|(_, at)| *at).max().unwrap();
    let first_round2 = dispatches
        .iter()
        .zip(&rounds)
        .filter(|(_, r)| **r == 2)
        .map(|(d, _)| d.at)
        .min()
        .unwrap();
    assert!(first_round2 >= last_round1_done);

    // All three rounds are recorded terminal in order
    let handle = session.current_run().unwrap();
    let state = handle.state.lock().unwrap();
    let RunState::Debate(run) = &*state else {
        panic!("expected a debate run");
    };
    assert!(run.completed);
    let recorded: Vec<u32> = run.rounds.iter().map(|r| r.round).collect();
    assert_eq!(recorded, vec![1, 2, 3]);
    assert!(run.rounds.iter().all(|r| r.is_terminal()));
}

#[tokio::test]
async fn test_later_round_prompts_carry_prior_statements_verbatim() {
    let backend = MockBackend::new(vec![
        (
            "llama3",
            Script::Succeed {
                text: "POSITION-A: cats win on maintenance.".to_string(),
                after: Duration::from_millis(10),
            },
        ),
        (
            "mistral",
            Script::Succeed {
                text: "POSITION-B: dogs win on loyalty.".to_string(),
                after: Duration::from_millis(10),
            },
        ),
    ]);
    let registry = SessionRegistry::new(64);
    let session = registry.create_or_attach("d-transcript");
    let mut rx = session.subscribe();

    orchestrator(backend.clone())
        .start(
            session.clone(),
            "cats vs dogs",
            &models(&["llama3", "mistral"]),
            2,
        )
        .unwrap();
    collect_until(&mut rx, "debate_complete").await;

    let dispatches = backend.dispatches();
    let round2: Vec<&Dispatch> = dispatches
        .iter()
        .filter(|d| round_of(&d.prompt, 2) == 2)
        .collect();
    assert_eq!(round2.len(), 2);
    for d in round2 {
        // Every participant sees every round-1 statement, its own included
        assert!(d.prompt.contains("POSITION-A: cats win on maintenance."));
        assert!(d.prompt.contains("POSITION-B: dogs win on loyalty."));
    }

    // Round 1 prompts carry no transcript
    for d in dispatches.iter().filter(|d| round_of(&d.prompt, 2) == 1) {
        assert!(!d.prompt.contains("POSITION-A"));
        assert!(!d.prompt.contains("POSITION-B"));
    }
}

#[tokio::test]
async fn test_errored_participant_stays_in_later_rounds() {
    let backend = MockBackend::new(vec![
        (
            "solid",
            Script::Succeed {
                text: "a steady argument".to_string(),
                after: Duration::from_millis(10),
            },
        ),
        (
            "flaky",
            Script::Fail {
                message: "model not loaded".to_string(),
                after: Duration::from_millis(10),
            },
        ),
    ]);
    let registry = SessionRegistry::new(64);
    let session = registry.create_or_attach("d-flaky");
    let mut rx = session.subscribe();

    orchestrator(backend.clone())
        .start(session.clone(), "topic", &models(&["solid", "flaky"]), 2)
        .unwrap();
    let events = collect_until(&mut rx, "debate_complete").await;
    assert_eq!(events.last().unwrap().payload["rounds_completed"], 2);

    // The flaky model was still dispatched in round 2
    let dispatches = backend.dispatches();
    assert_eq!(dispatches.len(), 4);
    assert!(dispatches
        .iter()
        .any(|d| d.model == "flaky" && round_of(&d.prompt, 2) == 2));

    // Its failure is excluded from the transcript the others see
    let solid_round2 = dispatches
        .iter()
        .find(|d| d.model == "solid" && round_of(&d.prompt, 2) == 2)
        .unwrap();
    assert!(solid_round2.prompt.contains("a steady argument"));
    assert!(!solid_round2.prompt.contains("model not loaded"));
    assert!(!solid_round2.prompt.contains("**flaky**"));

    // Both rounds record the error against the flaky model
    let handle = session.current_run().unwrap();
    let state = handle.state.lock().unwrap();
    let RunState::Debate(run) = &*state else {
        panic!("expected a debate run");
    };
    for round in &run.rounds {
        assert_eq!(round.records["flaky"].status, ResponseStatus::Error);
        assert_eq!(round.records["solid"].status, ResponseStatus::Completed);
    }
}

#[tokio::test]
async fn test_validation_rejects_bad_starts() {
    let backend = MockBackend::new(vec![]);
    let orch = orchestrator(backend);
    let registry = SessionRegistry::new(64);
    let session = registry.create_or_attach("d-invalid");

    let err = orch
        .start(session.clone(), "   ", &models(&["a"]), 2)
        .unwrap_err();
    assert!(matches!(err, ArenaError::InvalidRequest(_)));

    let err = orch.start(session.clone(), "t", &[], 2).unwrap_err();
    assert!(matches!(err, ArenaError::InvalidRequest(_)));

    let err = orch
        .start(session.clone(), "t", &models(&["a", "b", "c", "d", "e"]), 2)
        .unwrap_err();
    assert!(matches!(
        err,
        ArenaError::TooManyParticipants { selected: 5, max: 4 }
    ));

    let err = orch
        .start(session.clone(), "t", &models(&["a"]), 0)
        .unwrap_err();
    assert!(matches!(err, ArenaError::InvalidRequest(_)));

    let err = orch
        .start(session.clone(), "t", &models(&["a"]), 6)
        .unwrap_err();
    assert!(matches!(err, ArenaError::InvalidRequest(_)));

    assert!(session.current_run().is_none());
}

#[tokio::test]
async fn test_duplicate_participants_are_deduped_before_the_cap() {
    let backend = MockBackend::new(vec![(
        "a",
        Script::Succeed {
            text: "x".to_string(),
            after: Duration::from_millis(5),
        },
    )]);
    let registry = SessionRegistry::new(64);
    let session = registry.create_or_attach("d-dup");
    let mut rx = session.subscribe();

    // Six names, one distinct participant: passes the cap of four
    orchestrator(backend.clone())
        .start(
            session.clone(),
            "t",
            &models(&["a", "a", "a", "a", "a", "a"]),
            1,
        )
        .unwrap();
    let events = collect_until(&mut rx, "debate_complete").await;
    assert_eq!(events.last().unwrap().payload["participants"], serde_json::json!(["a"]));
    assert_eq!(backend.dispatches().len(), 1);
}

#[tokio::test]
async fn test_cancel_mid_round_stops_further_rounds() {
    let backend = MockBackend::new(vec![("a", Script::Hang), ("b", Script::Hang)]);
    let registry = SessionRegistry::new(64);
    let session = registry.create_or_attach("d-cancel");
    let mut rx = session.subscribe();

    orchestrator(backend.clone())
        .start(session.clone(), "t", &models(&["a", "b"]), 3)
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    model_arena_lib::orchestrator::debate::cancel(&session);
    let events = collect_until(&mut rx, "debate_complete").await;
    let summary = &events.last().unwrap().payload;
    assert_eq!(summary["cancelled"], true);
    // The cancelled round is closed (every record terminal), so it counts
    assert_eq!(summary["rounds_completed"], 1);

    // Only round 1 was ever dispatched
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.dispatches().len(), 2);
    assert!(matches!(
        rx.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));

    // Every round-1 record is cancelled
    let handle = session.current_run().unwrap();
    let state = handle.state.lock().unwrap();
    let RunState::Debate(run) = &*state else {
        panic!("expected a debate run");
    };
    assert!(run
        .rounds
        .iter()
        .flat_map(|r| r.records.values())
        .all(|rec| rec.status == ResponseStatus::Cancelled));
}

#[tokio::test]
async fn test_debate_session_is_busy_while_running() {
    let backend = MockBackend::new(vec![("a", Script::Hang)]);
    let orch = orchestrator(backend);
    let registry = SessionRegistry::new(64);
    let session = registry.create_or_attach("d-busy");

    orch.start(session.clone(), "t", &models(&["a"]), 2).unwrap();
    let err = orch
        .start(session.clone(), "again", &models(&["a"]), 2)
        .unwrap_err();
    assert!(matches!(err, ArenaError::SessionBusy(_)));

    // A query cancel does not touch a debate run
    model_arena_lib::orchestrator::query::cancel(&session);
    let err = orch
        .start(session.clone(), "still busy", &models(&["a"]), 2)
        .unwrap_err();
    assert!(matches!(err, ArenaError::SessionBusy(_)));
}

#[tokio::test]
async fn test_debate_updates_report_progress_per_round() {
    let backend = MockBackend::new(vec![(
        "a",
        Script::Succeed {
            text: "said once".to_string(),
            after: Duration::from_millis(10),
        },
    )]);
    let registry = SessionRegistry::new(64);
    let session = registry.create_or_attach("d-updates");
    let mut rx = session.subscribe();

    orchestrator(backend)
        .start(session.clone(), "t", &models(&["a"]), 2)
        .unwrap();
    let events = collect_until(&mut rx, "debate_complete").await;

    let updates: Vec<&SessionEvent> = events
        .iter()
        .filter(|e| e.event == "debate_update")
        .collect();
    // Two per round: processing then terminal
    assert_eq!(updates.len(), 4);

    // The last update of round 2 carries round 1's finished statements
    let last = updates.last().unwrap();
    assert_eq!(last.payload["current_round"], 2);
    assert_eq!(last.payload["round_1"]["a"]["content"], "said once");
    assert_eq!(last.payload["records"]["a"]["status"], "completed");
}
