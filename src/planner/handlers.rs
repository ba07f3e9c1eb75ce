//! Axum route handlers for study plans.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::planner::synthesis::{load_plan_view, synthesize, PlanView, SynthesisRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GeneratePlanRequest {
    pub user_id: Uuid,
    pub weeks: i32,
    pub hours_per_week: f64,
    #[serde(default)]
    pub interview_date: Option<NaiveDate>,
}

/// POST /api/v1/plans
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GeneratePlanRequest>,
) -> Result<Json<PlanView>, AppError> {
    let view = synthesize(
        &state.db,
        &state.llm,
        &state.config,
        SynthesisRequest {
            user_id: request.user_id,
            weeks: request.weeks,
            hours_per_week: request.hours_per_week,
            interview_date: request.interview_date,
        },
    )
    .await?;
    Ok(Json(view))
}

/// GET /api/v1/plans/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<PlanView>, AppError> {
    Ok(Json(load_plan_view(&state.db, plan_id).await?))
}
