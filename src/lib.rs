// Clippy allows for reasonable defaults
#![allow(clippy::new_without_default)] // Default not always appropriate for stateful types
#![allow(clippy::too_many_arguments)] // Orchestrator workers thread several handles

// Module declarations
pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod orchestrator;
pub mod session;
pub mod shutdown;

// Server module (HTTP/WebSocket API)
pub mod server;

// Re-export the core types for embedding the orchestrator without the server
pub use config::ArenaConfig;
pub use error::ArenaError;
pub use models::*;
pub use orchestrator::{DebateOrchestrator, QueryOrchestrator};
pub use session::{Session, SessionRegistry};
