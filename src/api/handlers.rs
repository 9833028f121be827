//! HTTP request handlers

use super::sse::turn_stream;
use super::types::{ChatRequest, ErrorResponse, SessionCreatedResponse, TestAiResponse};
use super::AppState;
use crate::llm::{ChatMessage, ModelRequest, Role};
use crate::store::Session;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tokio::sync::mpsc;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Turn submission; responds with an SSE stream
        .route("/api/chat", post(send_chat))
        // Session lifecycle
        .route("/api/chat/session", post(create_session).get(get_session))
        // Inference binding probe
        .route("/api/test-ai", get(test_ai))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Chat Turns
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.messages.is_empty() {
        return Err(AppError::Validation("Messages are required".to_string()));
    }

    let Some(orchestrator) = state.orchestrator.clone() else {
        return Err(AppError::Configuration(
            "AI binding is not available. Set CLOUDFLARE_ACCOUNT_ID and \
             CLOUDFLARE_API_TOKEN to enable Workers AI."
                .to_string(),
        ));
    };

    let session_id = req
        .session_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    // The turn runs detached from this request handler; events flow to the
    // client through the channel until the turn task drops the sender.
    let (event_tx, event_rx) = mpsc::channel(32);
    let turn_session = session_id.clone();
    tokio::spawn(async move {
        orchestrator
            .run_turn(&turn_session, req.messages, event_tx)
            .await;
    });

    Ok((
        AppendHeaders([("x-session-id", session_id)]),
        turn_stream(event_rx),
    ))
}

// ============================================================
// Sessions
// ============================================================

pub(crate) async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<SessionCreatedResponse>, AppError> {
    let Some(store) = &state.store else {
        return Err(AppError::Configuration(
            "Chat sessions storage not available".to_string(),
        ));
    };

    let session = store
        .create_session()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(SessionCreatedResponse {
        session_id: session.id,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionQuery {
    session_id: Option<String>,
}

pub(crate) async fn get_session(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Session>, AppError> {
    // Identifier check comes first; a missing parameter reads the same
    // whether or not a store is configured.
    let session_id = query
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("Session ID required".to_string()))?;

    let Some(store) = &state.store else {
        return Err(AppError::Configuration(
            "Chat sessions storage not available".to_string(),
        ));
    };

    let session = store
        .load_session(&session_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    Ok(Json(session))
}

// ============================================================
// Inference Probe
// ============================================================

async fn test_ai(State(state): State<AppState>) -> Result<Json<TestAiResponse>, AppError> {
    let Some(model) = state.model.clone() else {
        return Err(AppError::Configuration(
            "AI binding not available".to_string(),
        ));
    };

    let request = ModelRequest {
        messages: vec![ChatMessage::new(Role::User, "Say hello")],
        tools: Vec::new(),
        max_tokens: None,
    };

    // The probe reports only the accumulated text; deltas are discarded.
    let (delta_tx, delta_rx) = mpsc::channel(32);
    drop(delta_rx);

    let step = model
        .stream_step(&request, delta_tx)
        .await
        .map_err(|e| AppError::Upstream {
            error: "AI call failed".to_string(),
            message: e.message.clone(),
            details: Some(format!("{:?}", e.kind)),
        })?;

    Ok(Json(TestAiResponse {
        success: true,
        model_id: model.model_id().to_string(),
        response: step.text,
    }))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("parley ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

/// Request-level failures, rendered as a JSON `{error, message?, details?}`
/// body. Store failures inside a running turn never reach this type; the
/// orchestrator logs and swallows them.
pub enum AppError {
    /// Missing or malformed request field
    Validation(String),
    /// Unknown session
    NotFound(String),
    /// Required external binding absent
    Configuration(String),
    /// Inference provider failed; message preserved for the client
    Upstream {
        error: String,
        message: String,
        details: Option<String>,
    },
    /// Store or other internal failure
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::new(msg)),
            AppError::Configuration(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new(msg))
            }
            AppError::Upstream {
                error,
                message,
                details,
            } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error,
                    message: Some(message),
                    details,
                },
            ),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new(msg))
            }
        };

        (status, Json(body)).into_response()
    }
}
