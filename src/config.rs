// Server configuration: compiled-in defaults, optional TOML file, env overrides

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Runtime configuration for the arena server.
///
/// Every field has a default so a missing config file is not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Base URL of the Ollama server
    pub ollama_url: String,
    /// Per-invocation deadline in seconds; expiry is treated like an
    /// externally observed cancellation of that one invocation
    pub request_timeout_secs: u64,
    /// Maximum number of debate participants accepted at start
    pub max_debate_participants: usize,
    /// Maximum accepted round count for a debate
    pub max_debate_rounds: u32,
    /// Capacity of each session's event broadcast channel
    pub event_buffer: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            request_timeout_secs: 60,
            max_debate_participants: crate::models::DEFAULT_MAX_DEBATE_PARTICIPANTS,
            max_debate_rounds: crate::models::DEFAULT_MAX_DEBATE_ROUNDS,
            event_buffer: 256,
        }
    }
}

impl ArenaConfig {
    /// Load configuration: explicit path if given, otherwise the default
    /// location if it exists, otherwise defaults. `MODEL_ARENA_OLLAMA_URL`
    /// overrides the file in all cases.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };

        if let Ok(url) = std::env::var("MODEL_ARENA_OLLAMA_URL") {
            if !url.is_empty() {
                config.ollama_url = url;
            }
        }

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// `~/.config/model-arena/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("model-arena").join("config.toml"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
