//! Request handlers.
//!
//! Bodies are read as raw bytes and parsed here, so a malformed body gets
//! the service's plain-text 400 instead of axum's JSON rejection.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use profanity_core::{keep_last_words, score_words};
use serde_json::{json, Map, Value};
use tracing::{debug, error};

use crate::AppState;

/// Body of a 400 response.
pub const INVALID_REQUEST: &str = "Error: Invalid request. Please provide a \"text\" parameter.";

/// Body of a 400 response for a bad `window_size`.
pub const INVALID_WINDOW_SIZE: &str =
    "Error: Invalid request. \"window_size\" must be a positive integer.";

fn bad_request(message: &'static str) -> Response {
    (StatusCode::BAD_REQUEST, message).into_response()
}

fn internal_error(e: impl std::fmt::Display) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {e}")).into_response()
}

/// Parse a JSON object body.
fn parse_object(body: &[u8]) -> Option<Map<String, Value>> {
    match serde_json::from_slice(body).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// The whitespace-stripped `"text"` string of a request object.
fn request_text(obj: &Map<String, Value>) -> Option<String> {
    obj.get("text")?.as_str().map(|t| t.trim().to_string())
}

/// `POST /profanity` and `POST /insult`.
pub async fn profanity_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let Some(text) = parse_object(&body).as_ref().and_then(request_text) else {
        return bad_request(INVALID_REQUEST);
    };

    match state.classifier.score(&text).await {
        Ok(score) => {
            debug!(chars = text.len(), score, "Scored request");
            Json(json!({ "profanity_score": score })).into_response()
        }
        Err(e) => {
            error!(error = %e, classifier = state.classifier.name(), "Inference failed");
            internal_error(e)
        }
    }
}

/// `POST /profanity/words`: per-word scores from a sliding window.
///
/// Accepts an optional `"window_size"`, defaulting to the configured one.
/// With `max_words` configured, earlier words are dropped before scoring.
pub async fn words_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let Some(obj) = parse_object(&body) else {
        return bad_request(INVALID_REQUEST);
    };
    let Some(text) = request_text(&obj) else {
        return bad_request(INVALID_REQUEST);
    };
    let window_size = match obj.get("window_size") {
        None | Some(Value::Null) => state.config.window_size,
        Some(v) => match v.as_u64() {
            Some(n) if n > 0 => n as usize,
            _ => return bad_request(INVALID_WINDOW_SIZE),
        },
    };

    let text = match state.config.max_words {
        Some(n) => keep_last_words(&text, n),
        None => text,
    };

    match score_words(state.classifier.as_ref(), &text, window_size).await {
        Ok(words) => Json(json!({ "words": words })).into_response(),
        Err(e) => {
            error!(error = %e, window_size, "Word scoring failed");
            internal_error(e)
        }
    }
}

/// `GET /health`.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
