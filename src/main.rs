use push_hook_gate::error::Result;
use push_hook_gate::logging::{FileLogger, setup_logging};
use push_hook_gate::{AppState, api, load_config};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8888";
const DEFAULT_CONFIG_PATH: &str = "push_hook_gate.toml";

async fn run() -> Result<()> {
    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());
    let config_path = PathBuf::from(
        std::env::var("GATE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
    );
    let file_logger = std::env::var("GATE_LOG_DIR")
        .ok()
        .map(|dir| FileLogger::new(PathBuf::from(dir)));

    let config = load_config(&config_path)?;
    let _log_guard = setup_logging(file_logger.as_ref())?;

    info!(
        "Loaded {} projects from {:?} (source matching: {:?})",
        config.project.len(),
        config_path,
        config.source_matching
    );

    let state = Arc::new(AppState::new(config, config_path));
    let app = api::router(state);

    info!("Listening on {}", bind_address);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    if let Err(e) = run().await {
        eprintln!("push_hook_gate failed: {}", e);
        std::process::exit(1);
    }
}
