//! Session lifecycle: one session id maps to at most one active run, and the
//! session owns the event channel its observers subscribe to.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::{broadcast, Notify};

use crate::error::ArenaError;
use crate::events::SessionEvent;
use crate::models::{DebateRun, QueryRun};

/// Monotonic cancellation flag for one run: flips false -> true exactly once
/// and never resets. Waiters are woken through a Notify so in-flight workers
/// can race invocations against it.
#[derive(Debug)]
pub struct CancelFlag {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the flag is set; resolves immediately if already set
    pub async fn cancelled(&self) {
        while !self.is_cancelled() {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CancelFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// The mutable state of one run; owned exclusively by its session and
/// mutated only under the handle's mutex.
#[derive(Debug)]
pub enum RunState {
    Query(QueryRun),
    Debate(DebateRun),
}

/// Shared handle to one in-flight run
#[derive(Debug, Clone)]
pub struct RunHandle {
    pub state: Arc<Mutex<RunState>>,
    pub cancel: Arc<CancelFlag>,
    finished: Arc<AtomicBool>,
}

impl RunHandle {
    fn new(state: RunState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            cancel: Arc::new(CancelFlag::new()),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark the run finished; a finished run may be superseded
    pub fn finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

/// One session: identifier, at most one active run, and the event channel
pub struct Session {
    pub id: String,
    events: broadcast::Sender<SessionEvent>,
    run: Mutex<Option<RunHandle>>,
}

impl Session {
    fn new(id: &str, event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer);
        Self {
            id: id.to_string(),
            events,
            run: Mutex::new(None),
        }
    }

    /// Subscribe to this session's event stream
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Broadcast an event to every observer. Send errors (no receivers) are
    /// ignored; delivery is at-least-once for attached observers only.
    pub fn emit(&self, event: &str, payload: impl Serialize) {
        let _ = self.events.send(SessionEvent::new(event, payload));
    }

    pub fn emit_value(&self, event: &str, payload: serde_json::Value) {
        let _ = self.events.send(SessionEvent::new(event, payload));
    }

    /// Install a new run. Fails with `SessionBusy` while a run is active;
    /// a finished run is superseded (its state discarded, fresh cancel flag).
    pub fn begin_run(&self, state: RunState) -> Result<RunHandle, ArenaError> {
        let mut guard = self.run.lock().unwrap();
        if let Some(existing) = guard.as_ref() {
            if !existing.is_finished() {
                return Err(ArenaError::SessionBusy(self.id.clone()));
            }
        }
        let handle = RunHandle::new(state);
        *guard = Some(handle.clone());
        log::debug!("Session '{}': new run installed", self.id);
        Ok(handle)
    }

    /// Handle to the current run, finished or not
    pub fn current_run(&self) -> Option<RunHandle> {
        self.run.lock().unwrap().clone()
    }
}

/// Maps opaque session identifiers to sessions. Sessions live for the life
/// of the process; there is no persistence.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    event_buffer: usize,
}

impl SessionRegistry {
    pub fn new(event_buffer: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            event_buffer,
        }
    }

    /// Idempotent: returns the existing session or creates one
    pub fn create_or_attach(&self, id: &str) -> Arc<Session> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                log::info!("Session '{}' created", id);
                Arc::new(Session::new(id, self.event_buffer))
            })
            .clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.lock().unwrap().get(id).cloned()
    }
}
