//! Axum route handlers for adaptive planning.

use axum::{extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::adaptive::analyzer::AdaptationAnalysis;
use crate::adaptive::apply::{analyze, apply, AdaptationResult};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AdaptationRequest {
    pub user_id: Uuid,
    pub plan_id: Uuid,
}

/// POST /api/v1/adaptive/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AdaptationRequest>,
) -> Result<Json<AdaptationAnalysis>, AppError> {
    let analysis = analyze(&state.db, &state.config, request.user_id, request.plan_id).await?;
    Ok(Json(analysis))
}

/// POST /api/v1/adaptive/apply
///
/// Mutually exclusive with plan synthesis and other applies for the same
/// plan: the plan lock is held across the whole transaction.
pub async fn handle_apply(
    State(state): State<AppState>,
    Json(request): Json<AdaptationRequest>,
) -> Result<Json<AdaptationResult>, AppError> {
    let _guard = state.locks.plan_lock(request.plan_id).await;
    let result = apply(&state.db, &state.config, request.user_id, request.plan_id).await?;
    Ok(Json(result))
}
