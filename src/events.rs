// Event types and payload structures for real-time updates
// These are broadcast on the owning session's channel and forwarded to
// WebSocket clients verbatim.

use serde::{Deserialize, Serialize};

use crate::models::{DebateRun, ResponseRecord};

// Event name constants
pub const EVENT_RESPONSE_UPDATE: &str = "response_update";
pub const EVENT_DEBATE_UPDATE: &str = "debate_update";
pub const EVENT_QUERY_COMPLETE: &str = "query_complete";
pub const EVENT_DEBATE_COMPLETE: &str = "debate_complete";
pub const EVENT_ERROR: &str = "error";

/// A single event as delivered to observers: self-describing name plus a
/// JSON payload. Delivery is at-least-once, ordered per record, unordered
/// across records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Event name (e.g., "response_update")
    pub event: String,
    /// Event payload as JSON value
    pub payload: serde_json::Value,
    /// RFC 3339 emission time
    pub timestamp: String,
}

impl SessionEvent {
    pub fn new(event: &str, payload: impl Serialize) -> Self {
        Self {
            event: event.to_string(),
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Payload for per-backend status events in a query run. Carries the full
/// record so observers reconstruct state by merging, never by ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseUpdatePayload {
    pub session_id: String,
    #[serde(flatten)]
    pub record: ResponseRecord,
}

/// One failed backend in a completion summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedModel {
    pub model: String,
    pub error: String,
}

/// Payload for the run-level query completion event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryCompletePayload {
    pub session_id: String,
    pub successful_count: usize,
    pub failed_count: usize,
    pub failed_models: Vec<FailedModel>,
    pub cancelled: bool,
}

/// Payload for the run-level debate completion event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateCompletePayload {
    pub session_id: String,
    pub topic: String,
    pub participants: Vec<String>,
    pub total_rounds: u32,
    pub rounds_completed: u32,
    pub cancelled: bool,
}

/// Payload for synchronous-path errors surfaced on the event stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub session_id: String,
    pub message: String,
}

/// Build the `debate_update` payload: current round index, total rounds,
/// the updated round's full records, and a `round_N` map of completed
/// statements per round so far.
pub fn debate_update_payload(session_id: &str, run: &DebateRun) -> serde_json::Value {
    let mut payload = serde_json::Map::new();
    payload.insert("session_id".into(), session_id.into());
    payload.insert("current_round".into(), run.current_round.into());
    payload.insert("total_rounds".into(), run.total_rounds.into());
    payload.insert(
        "participants".into(),
        serde_json::to_value(&run.participants).unwrap_or(serde_json::Value::Null),
    );

    // Completed statements keyed round_1, round_2, ...
    for round in &run.rounds {
        let mut statements = serde_json::Map::new();
        for model in &run.participants {
            if let Some(record) = round.records.get(model) {
                if let (Some(content), Some(time)) = (&record.content, record.time) {
                    statements.insert(
                        model.clone(),
                        serde_json::json!({ "content": content, "time": time }),
                    );
                }
            }
        }
        payload.insert(
            format!("round_{}", round.round),
            serde_json::Value::Object(statements),
        );
    }

    // Full records of the round currently collecting, statuses included
    if let Some(current) = run.rounds.iter().find(|r| r.round == run.current_round) {
        payload.insert(
            "records".into(),
            serde_json::to_value(&current.records).unwrap_or(serde_json::Value::Null),
        );
    }

    serde_json::Value::Object(payload)
}
