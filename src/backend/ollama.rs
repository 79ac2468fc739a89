//! Ollama-backed BackendClient over the local HTTP API

use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;

use super::{BackendClient, BackendReply};
use crate::error::ArenaError;
use crate::models::QuestionType;

/// Client for a local Ollama server
pub struct OllamaClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TaggedModel>,
}

#[derive(Deserialize)]
struct TaggedModel {
    name: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl BackendClient for OllamaClient {
    async fn invoke(
        &self,
        model: &str,
        prompt: &str,
        _hint: QuestionType,
    ) -> Result<BackendReply, ArenaError> {
        let started = Instant::now();
        let url = format!("{}/api/generate", self.base_url);

        log::debug!("Invoking model '{}' at {}", model, url);

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "model": model,
                "prompt": prompt,
                "stream": false,
            }))
            .send()
            .await
            .map_err(ArenaError::backend)?
            .error_for_status()
            .map_err(ArenaError::backend)?;

        let body: GenerateResponse = response.json().await.map_err(ArenaError::backend)?;

        Ok(BackendReply {
            text: body.response,
            elapsed: started.elapsed(),
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, ArenaError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(ArenaError::backend)?
            .error_for_status()
            .map_err(ArenaError::backend)?;

        let body: TagsResponse = response.json().await.map_err(ArenaError::backend)?;
        Ok(body.models.into_iter().map(|m| m.name).collect())
    }
}
