//! Profanity classifier HTTP server.
//!
//! Loads the fine-tuned checkpoint once at startup, then serves
//! `POST /profanity`, `POST /insult`, `POST /profanity/words` and
//! `GET /health` until SIGTERM or SIGINT.

use std::path::PathBuf;
use std::sync::Arc;

use profanity_core::{ProfanityClassifier, ServerConfig};
use profanity_model::ProfanityModel;
use profanity_server::shutdown::shutdown_signal;
use profanity_server::{build_router, config, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = load_server_config()?;
    info!(
        listen_addr = %config.listen_addr,
        model_id = %config.model.model_id,
        checkpoint = %config.model.checkpoint_path.display(),
        "Starting profanity server"
    );

    let model = ProfanityModel::load(&config.model)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize classifier: {}", e))?;
    model
        .health_check()
        .await
        .map_err(|e| anyhow::anyhow!("Classifier health check failed: {}", e))?;
    let classifier = Arc::new(model) as Arc<dyn ProfanityClassifier>;

    let listen_addr = config.listen_addr.clone();
    let app = build_router(AppState::new(config, Arc::clone(&classifier)));

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!(%listen_addr, "Profanity server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match classifier.latency_summary() {
        Some(summary) => info!(classifier = classifier.name(), %summary, "Inference latency"),
        None => info!(classifier = classifier.name(), "No requests scored"),
    }
    info!("Profanity server stopped");
    Ok(())
}

/// Load the server configuration from a YAML file or fall back to defaults.
///
/// Checks (in order):
/// 1. First CLI argument as config path
/// 2. `PROFANITY_CONFIG` environment variable
/// 3. Default configuration
fn load_server_config() -> anyhow::Result<ServerConfig> {
    let config_path: Option<PathBuf> = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PROFANITY_CONFIG").ok())
        .map(PathBuf::from);

    match config_path {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration from file");
            config::load_config(&path)
        }
        None => {
            info!("No config file specified, using defaults");
            Ok(ServerConfig::default())
        }
    }
}
