use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::models::{Attraction, RecommendationResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub city: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub attraction_id: i64,
    pub is_helpful: bool,
}

/// Personalized recommendations for one user
pub async fn personalized(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<RecommendationResponse>> {
    let response = state.recommender.personalized(user_id).await?;
    Ok(Json(response))
}

/// Most popular active attractions, optionally filtered by city
pub async fn popular(
    State(state): State<AppState>,
    Query(query): Query<PopularQuery>,
) -> AppResult<Json<Vec<Attraction>>> {
    let attractions = state
        .recommender
        .popular(query.city, query.limit)
        .await?;
    Ok(Json(attractions))
}

/// Active attractions similar to the given one by tag or city
pub async fn similar(
    State(state): State<AppState>,
    Path(attraction_id): Path<i64>,
) -> AppResult<Json<Vec<Attraction>>> {
    let attractions = state.recommender.similar_attractions(attraction_id).await?;
    Ok(Json(attractions))
}

/// Records like/dislike feedback on a recommendation
pub async fn feedback(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(request): Json<FeedbackRequest>,
) -> AppResult<Json<Value>> {
    state
        .recommender
        .submit_feedback(user_id, request.attraction_id, request.is_helpful)
        .await?;
    Ok(Json(json!({ "message": "Feedback recorded" })))
}
