//! REST endpoints for chatting with the assistant.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::{Error, ExchangeError};
use crate::service::AssistantService;

/// Shared state for chat routes.
#[derive(Clone)]
pub struct ChatRouteState {
    pub service: Arc<AssistantService>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// POST /api/chat
///
/// Sends one message and waits for the assistant's reply.
async fn chat(State(state): State<ChatRouteState>, Json(req): Json<ChatRequest>) -> Response {
    if req.message.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Message must not be empty");
    }

    let user_id = req.user_id.as_deref().filter(|id| !id.is_empty());
    match state.service.get_response(&req.message, user_id).await {
        Ok(response) => Json(ChatResponse { response }).into_response(),
        Err(e) => {
            tracing::error!(error = %e, user_id = user_id.unwrap_or("-"), "Chat exchange failed");
            error_response(status_for(&e), &e.to_string())
        }
    }
}

/// GET /api/health
async fn health(State(state): State<ChatRouteState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "initialized": state.service.is_initialized(),
        "sessions": state.service.sessions().len(),
    }))
}

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Exchange(ExchangeError::NotInitialized) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Exchange(ExchangeError::RunTimeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
        Error::Exchange(_) | Error::Assistant(_) => StatusCode::BAD_GATEWAY,
        Error::Config(_) | Error::Secret(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({"error": message}))).into_response()
}

/// Build the chat REST routes.
pub fn chat_routes(state: ChatRouteState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/health", get(health))
        .with_state(state)
}
