use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use model_arena_lib::backend::OllamaClient;
use model_arena_lib::config::ArenaConfig;
use model_arena_lib::server::{self, ServerAppState};
use model_arena_lib::shutdown::{self, ShutdownState};

/// Model Arena - fan questions and debates out to local LLM backends
#[derive(Parser, Debug)]
#[command(name = "model-arena")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to bind the server to
    #[arg(long, default_value = "3500", env = "MODEL_ARENA_PORT")]
    port: u16,

    /// Address to bind the server to
    #[arg(long, default_value = "0.0.0.0", env = "MODEL_ARENA_BIND")]
    bind: String,

    /// Path to a TOML config file (default: ~/.config/model-arena/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Allowed CORS origins (default: any)
    #[arg(long)]
    cors_origin: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = ArenaConfig::load(cli.config.as_deref())?;
    log::info!("Loaded configuration: ollama at {}", config.ollama_url);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let shutdown_state = ShutdownState::new();
        shutdown::listen_for_ctrl_c(shutdown_state.clone());

        let backend = Arc::new(OllamaClient::new(&config.ollama_url));
        let state = ServerAppState::new(config, backend, shutdown_state);

        let cors_origins = if cli.cors_origin.is_empty() {
            None
        } else {
            Some(cli.cors_origin.clone())
        };

        server::run_server(cli.port, &cli.bind, state, cors_origins)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    })
}
