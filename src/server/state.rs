//! Server application state shared across handlers

use std::sync::Arc;

use crate::backend::BackendClient;
use crate::config::ArenaConfig;
use crate::orchestrator::{DebateOrchestrator, QueryOrchestrator};
use crate::session::SessionRegistry;
use crate::shutdown::ShutdownState;

/// Shared state for the server: the session registry, the backend handle,
/// and the two orchestrators built from the config.
#[derive(Clone)]
pub struct ServerAppState {
    pub config: Arc<ArenaConfig>,
    pub registry: Arc<SessionRegistry>,
    pub backend: Arc<dyn BackendClient>,
    pub query: QueryOrchestrator,
    pub debate: DebateOrchestrator,
    pub shutdown_state: ShutdownState,
}

impl ServerAppState {
    pub fn new(
        config: ArenaConfig,
        backend: Arc<dyn BackendClient>,
        shutdown_state: ShutdownState,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new(config.event_buffer));
        let query = QueryOrchestrator::new(backend.clone(), config.request_timeout());
        let debate = DebateOrchestrator::new(
            backend.clone(),
            config.request_timeout(),
            config.max_debate_participants,
            config.max_debate_rounds,
        );

        Self {
            config: Arc::new(config),
            registry,
            backend,
            query,
            debate,
            shutdown_state,
        }
    }
}
