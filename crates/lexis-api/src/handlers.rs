//! Route handler functions for all API endpoints.
//!
//! Each handler extracts its JSON body via axum extractors, runs one engine
//! operation, and returns the engine's [`Response`] next to the rendered
//! [`Reply`] so callers can either draw buttons themselves or show the text.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use lexis_chat::{Reply, Response, UserId};
use lexis_source::CacheStatus;

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

/// Request body for POST /chat.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    /// Raw message text, exactly as typed or as sent by a button.
    pub text: String,
}

/// Request body for POST /refresh.
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub user_id: String,
}

// =============================================================================
// Response types
// =============================================================================

/// Response for POST /chat and POST /refresh.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: Response,
    pub reply: Reply,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub started_at: DateTime<Utc>,
    pub cache: CacheStatus,
    pub active_sessions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArticlesResponse {
    pub generation: Option<u64>,
    pub count: usize,
    pub keys: Vec<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /health - liveness plus cache and session state.
///
/// Never triggers a fetch.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        started_at: state.started_at,
        cache: state.engine.cache().status(),
        active_sessions: state.engine.sessions().len(),
    })
}

/// POST /chat - run one user turn through the engine.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(body) = payload?;
    let user = parse_user(&body.user_id)?;
    debug!(user = %user, "POST /chat");

    let response = state.engine.handle(&user, &body.text).await;
    Ok(Json(reply(&state, response)))
}

/// POST /refresh - reload the table and return the user to page one.
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(body) = payload?;
    let user = parse_user(&body.user_id)?;
    info!(user = %user, "Refresh requested over HTTP");

    let response = state.engine.refresh(&user).await;
    Ok(Json(reply(&state, response)))
}

/// GET /articles - the current table's keys in display order.
pub async fn articles(State(state): State<AppState>) -> Result<Json<ArticlesResponse>, ApiError> {
    let table = state.engine.cache().get().await?;
    let generation = state.engine.cache().peek().map(|g| g.number);
    let keys = table.keys().to_vec();

    Ok(Json(ArticlesResponse {
        generation,
        count: keys.len(),
        keys,
    }))
}

fn parse_user(raw: &str) -> Result<UserId, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(
            "'user_id' must not be empty".to_string(),
        ));
    }
    Ok(UserId::from(trimmed))
}

fn reply(state: &AppState, response: Response) -> ChatReply {
    let reply = state.renderer.render(&response);
    ChatReply { response, reply }
}
