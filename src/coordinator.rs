//! Coordination service
//!
//! A sibling deployable (`parley-coordinator`) that receives turn
//! notifications from the chat backend and re-derives session metadata from
//! them. It shares the session store layer and serves the same session
//! endpoints, so either service can answer session reads.

use crate::api::{create_session, get_session, AppError, AppState};
use crate::store::{SessionStore, StoreResult};
use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Create the coordinator router
pub fn create_coordinator_router(state: AppState) -> Router {
    Router::new()
        // Session lifecycle, same contract as the main API
        .route("/api/chat/session", post(create_session).get(get_session))
        // Workflow coordination
        .route("/api/chat/coordinate", post(coordinate))
        .with_state(state)
}

/// Notification that a chat turn is being processed for a session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message_count: Option<u32>,
    #[serde(default)]
    pub action: Option<String>,
}

/// Acknowledgement returned for every accepted coordinate call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateResponse {
    pub step: String,
    pub session_id: String,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub status: String,
}

async fn coordinate(
    State(state): State<AppState>,
    Json(req): Json<CoordinateRequest>,
) -> Result<Json<CoordinateResponse>, AppError> {
    let Some(session_id) = req.session_id.filter(|id| !id.is_empty()) else {
        return Err(AppError::Validation("Session ID required".to_string()));
    };

    // Metadata refresh is best-effort; the acknowledgement does not depend
    // on it.
    if let Some(store) = &state.store {
        if let Err(e) = touch_session(store, &session_id, req.message_count).await {
            tracing::warn!(
                session_id = %session_id,
                error = %e,
                "Failed to update session"
            );
        }
    }

    Ok(Json(CoordinateResponse {
        step: "chat_processing".to_string(),
        session_id,
        timestamp: Utc::now().timestamp_millis(),
        action: req.action,
        status: "coordinated".to_string(),
    }))
}

/// Refresh activity metadata for a session that processed a turn. A zero or
/// absent count keeps the stored one; sessions the store does not know are
/// left untouched.
async fn touch_session(
    store: &SessionStore,
    session_id: &str,
    message_count: Option<u32>,
) -> StoreResult<()> {
    let Some(mut session) = store.load_session(session_id).await? else {
        return Ok(());
    };

    session.last_activity = Utc::now().timestamp_millis();
    session.message_count = message_count
        .filter(|&n| n != 0)
        .unwrap_or(session.message_count);
    store.save_session(&session).await
}
