//! Axum route handlers for mastery statistics.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::mastery::stats::{stats_for_user, MasteryStats};
use crate::models::mastery::MasteryRow;
use crate::state::AppState;
use crate::store;

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

/// GET /api/v1/mastery/stats
pub async fn handle_stats(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<MasteryStats>, AppError> {
    Ok(Json(stats_for_user(&state.db, params.user_id).await?))
}

/// GET /api/v1/mastery
pub async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<MasteryRow>>, AppError> {
    Ok(Json(
        store::mastery::masteries_for_user(&state.db, params.user_id).await?,
    ))
}
