//! HTTP handlers: catalog, query start, debate start, cancellations
//!
//! Start handlers return a synchronous ack; results always arrive as events
//! on the session's WebSocket channel. Cancels are fire-and-forget.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ServerAppState;
use crate::backend::describe_model;
use crate::events::{ErrorPayload, EVENT_ERROR};
use crate::models::QuestionType;

/// Request body for `POST /api/query`
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    /// Question type hint ("general" or "coding"); unrecognized values fall
    /// back to general
    #[serde(default, rename = "type")]
    pub question_type: Option<String>,
    #[serde(default)]
    pub selected_models: Vec<String>,
    /// Caller-supplied session id; generated when absent
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Request body for `POST /api/debate/start`
#[derive(Debug, Deserialize)]
pub struct DebateRequest {
    pub topic: String,
    #[serde(default)]
    pub selected_models: Vec<String>,
    #[serde(default = "default_rounds")]
    pub debate_rounds: u32,
    #[serde(default)]
    pub session_id: Option<String>,
}

fn default_rounds() -> u32 {
    3
}

/// Request body for the cancel endpoints
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub session_id: String,
}

/// Synchronous ack for start requests
#[derive(Debug, Serialize)]
pub struct StartAck {
    pub success: bool,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StartAck {
    fn ok(session_id: String) -> Self {
        Self {
            success: true,
            session_id,
            error: None,
        }
    }

    fn rejected(session_id: String, error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            session_id,
            error: Some(error.to_string()),
        }
    }
}

fn session_id_or_new(supplied: Option<String>) -> String {
    match supplied {
        Some(id) if !id.trim().is_empty() => id,
        _ => Uuid::new_v4().to_string(),
    }
}

/// `GET /api/models`: live backend catalog with specialty decoration
pub async fn get_models(State(state): State<ServerAppState>) -> Json<serde_json::Value> {
    match state.backend.list_models().await {
        Ok(names) => {
            let models: Vec<_> = names.iter().map(|n| describe_model(n)).collect();
            Json(serde_json::json!({
                "success": true,
                "models": models,
                "total_count": models.len(),
            }))
        }
        Err(e) => {
            log::warn!("Model catalog fetch failed: {}", e);
            Json(serde_json::json!({
                "success": false,
                "error": e.to_string(),
            }))
        }
    }
}

/// `POST /api/query`: start a Q&A fan-out
pub async fn post_query(
    State(state): State<ServerAppState>,
    Json(request): Json<QueryRequest>,
) -> Json<StartAck> {
    let session_id = session_id_or_new(request.session_id);
    let session = state.registry.create_or_attach(&session_id);
    let hint = QuestionType::from_wire(request.question_type.as_deref().unwrap_or("general"));

    match state.query.start(
        session.clone(),
        &request.question,
        hint,
        &request.selected_models,
    ) {
        Ok(()) => Json(StartAck::ok(session_id)),
        Err(e) => {
            log::warn!("Query start rejected for session '{}': {}", session_id, e);
            // Attached observers see the rejection too, not just the caller
            session.emit(
                EVENT_ERROR,
                ErrorPayload {
                    session_id: session_id.clone(),
                    message: e.to_string(),
                },
            );
            Json(StartAck::rejected(session_id, e))
        }
    }
}

/// `POST /api/debate/start`: start a round-barrier debate
pub async fn post_debate_start(
    State(state): State<ServerAppState>,
    Json(request): Json<DebateRequest>,
) -> Json<StartAck> {
    let session_id = session_id_or_new(request.session_id);
    let session = state.registry.create_or_attach(&session_id);

    match state.debate.start(
        session.clone(),
        &request.topic,
        &request.selected_models,
        request.debate_rounds,
    ) {
        Ok(()) => Json(StartAck::ok(session_id)),
        Err(e) => {
            log::warn!("Debate start rejected for session '{}': {}", session_id, e);
            session.emit(
                EVENT_ERROR,
                ErrorPayload {
                    session_id: session_id.clone(),
                    message: e.to_string(),
                },
            );
            Json(StartAck::rejected(session_id, e))
        }
    }
}

/// `POST /api/query/cancel`: fire-and-forget; effect is observed via
/// terminal events on the session channel
pub async fn post_cancel_query(
    State(state): State<ServerAppState>,
    Json(request): Json<CancelRequest>,
) -> Json<serde_json::Value> {
    if let Some(session) = state.registry.get(&request.session_id) {
        crate::orchestrator::query::cancel(&session);
    }
    Json(serde_json::json!({ "success": true }))
}

/// `POST /api/debate/cancel`: fire-and-forget
pub async fn post_cancel_debate(
    State(state): State<ServerAppState>,
    Json(request): Json<CancelRequest>,
) -> Json<serde_json::Value> {
    if let Some(session) = state.registry.get(&request.session_id) {
        crate::orchestrator::debate::cancel(&session);
    }
    Json(serde_json::json!({ "success": true }))
}
