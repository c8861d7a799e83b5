//! HTTP service for the profanity classifier.
//!
//! Exposes `POST /profanity` (and its `/insult` alias) returning the
//! probability that a text is offensive, `POST /profanity/words` for
//! per-word attribution, and `GET /health`.

pub mod config;
pub mod handlers;
pub mod shutdown;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use profanity_core::{ProfanityClassifier, ServerConfig};
use tower_http::cors::CorsLayer;

/// Shared application state passed to every handler via axum's `State` extractor.
pub struct AppState {
    /// Server configuration.
    pub config: ServerConfig,
    /// Loaded classifier, constructed before the server starts.
    pub classifier: Arc<dyn ProfanityClassifier>,
}

impl AppState {
    pub fn new(config: ServerConfig, classifier: Arc<dyn ProfanityClassifier>) -> Arc<Self> {
        Arc::new(Self { config, classifier })
    }
}

/// Build the axum [`Router`] with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors_enabled = state.config.cors_enabled;
    let router = Router::new()
        .route("/profanity", post(handlers::profanity_handler))
        .route("/insult", post(handlers::profanity_handler))
        .route("/profanity/words", post(handlers::words_handler))
        .route("/health", get(handlers::health_handler))
        .with_state(state);

    if cors_enabled {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
