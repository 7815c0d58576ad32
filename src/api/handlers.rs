use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{Item, ItemId, UserId},
    services::ProfileReport,
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SimilarityQuery {
    pub a: i64,
    pub b: i64,
}

#[derive(Debug, Serialize)]
pub struct SimilarityResponse {
    pub a: ItemId,
    pub b: ItemId,
    pub score: f64,
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// GET /api/v1/users/:user_id/recommendations
pub async fn get_recommendations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(user_id): Path<i64>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Json<Vec<Item>>> {
    let limit = query.limit.unwrap_or(state.default_limit);
    if limit > state.max_limit {
        return Err(AppError::InvalidInput(format!(
            "limit must be at most {}",
            state.max_limit
        )));
    }

    let items = state
        .recommender
        .get_recommendations(UserId(user_id), limit)
        .await?;

    tracing::info!(
        request_id = %request_id,
        user_id,
        limit,
        returned = items.len(),
        "Served recommendations"
    );

    Ok(Json(items))
}

/// GET /api/v1/users/:user_id/profile
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ProfileReport>> {
    let report = state.recommender.profile_for(UserId(user_id)).await?;
    Ok(Json(report))
}

/// GET /api/v1/similarity?a=..&b=..
pub async fn get_similarity(
    State(state): State<AppState>,
    Query(query): Query<SimilarityQuery>,
) -> AppResult<Json<SimilarityResponse>> {
    let (a, b) = (ItemId(query.a), ItemId(query.b));
    let score = state.recommender.similarity_between(a, b).await?;
    Ok(Json(SimilarityResponse { a, b, score }))
}
