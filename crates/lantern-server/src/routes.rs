//! HTTP handlers — pass-throughs to the state layer.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use lantern_core::{Branch, ChatId, Citation, MessageId};
use serde::Deserialize;
use tracing::instrument;

use crate::error::ApiError;
use crate::health::{self, HealthResponse};
use crate::server::AppState;

/// Body of `POST /chats/{chat_id}/branches`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBranchRequest {
    /// Fork point; omitted for a root-level branch.
    #[serde(default)]
    pub parent_message_id: Option<MessageId>,
    /// Branch name, unique per chat (case-insensitive).
    pub name: String,
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time))
}

/// GET /chats/{chat_id}/branches
#[instrument(skip_all, fields(chat_id = %chat_id))]
pub async fn list_branches(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> Result<Json<Vec<Branch>>, ApiError> {
    let branches = state
        .branches
        .list_branches(&ChatId::from(chat_id.as_str()))
        .await?;
    Ok(Json(branches))
}

/// POST /chats/{chat_id}/branches
#[instrument(skip_all, fields(chat_id = %chat_id))]
pub async fn create_branch(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
    Json(body): Json<CreateBranchRequest>,
) -> Result<(StatusCode, Json<Branch>), ApiError> {
    let branch = state
        .branches
        .create_branch(
            &ChatId::from(chat_id.as_str()),
            body.parent_message_id,
            &body.name,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(branch)))
}

/// GET /messages/{message_id}/citations
#[instrument(skip_all, fields(message_id = %message_id))]
pub async fn message_citations(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> Result<Json<Vec<Citation>>, ApiError> {
    let citations = state
        .citations
        .citations_for(&MessageId::from(message_id.as_str()))
        .await?;
    Ok(Json(citations))
}
