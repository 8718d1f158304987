use axum::{extract::State, Json};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::Recommendation,
    state::AppState,
};

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestedContent {
    Movie,
    Series,
    Mixed,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub prompt: String,
    pub content_type: RequestedContent,
    #[serde(default)]
    pub include_movies: bool,
    #[serde(default)]
    pub include_series: bool,
}

/// Handler for one-shot recommendations outside any conversation
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<Vec<Recommendation>>> {
    if request.prompt.trim().is_empty() {
        return Err(AppError::InvalidInput("Prompt cannot be empty".to_string()));
    }

    let recommendations = match request.content_type {
        RequestedContent::Movie => state.aggregator.recommend_movies(&request.prompt).await?,
        RequestedContent::Series => state.aggregator.recommend_series(&request.prompt).await?,
        RequestedContent::Mixed => {
            state
                .aggregator
                .recommend_mixed(&request.prompt, request.include_movies, request.include_series)
                .await?
        }
    };

    Ok(Json(recommendations))
}
