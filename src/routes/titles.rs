use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{ContentKind, TitleDetails},
    state::AppState,
};

/// Handler for full metadata details of a single title
pub async fn details(
    State(state): State<AppState>,
    Path((kind, id)): Path<(ContentKind, i64)>,
) -> AppResult<Json<TitleDetails>> {
    let details = state
        .resolver
        .details(kind, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Unknown {} id: {}", kind, id)))?;

    Ok(Json(details))
}
