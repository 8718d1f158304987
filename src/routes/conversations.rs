use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::Session,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct StartConversationRequest {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct ContinueConversationRequest {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationIdRequest {
    pub id: i64,
}

fn require_prompt(prompt: &str) -> AppResult<()> {
    if prompt.trim().is_empty() {
        return Err(AppError::InvalidInput("Prompt cannot be empty".to_string()));
    }
    Ok(())
}

/// Handler for starting a conversation
pub async fn start(
    State(state): State<AppState>,
    Json(request): Json<StartConversationRequest>,
) -> AppResult<(StatusCode, Json<Session>)> {
    require_prompt(&request.prompt)?;
    let session = state.conversations.start(request.prompt).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Handler for reading a conversation's current state
pub async fn get(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> AppResult<Json<Session>> {
    let session = state.conversations.get(&session_id).await?;
    Ok(Json(session))
}

/// Handler for refining a conversation with a follow-up prompt
pub async fn continue_conversation(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ContinueConversationRequest>,
) -> AppResult<Json<Session>> {
    require_prompt(&request.prompt)?;
    let session = state
        .conversations
        .continue_session(&session_id, request.prompt)
        .await?;
    Ok(Json(session))
}

/// Handler for excluding a recommendation
pub async fn exclude(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<RecommendationIdRequest>,
) -> AppResult<Json<Session>> {
    let session = state.conversations.exclude(&session_id, request.id).await?;
    Ok(Json(session))
}

/// Handler for liking a recommendation
pub async fn like(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<RecommendationIdRequest>,
) -> AppResult<Json<Session>> {
    let session = state.conversations.like(&session_id, request.id).await?;
    Ok(Json(session))
}
