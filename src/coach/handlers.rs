//! Axum route handlers for the daily coach.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coach::briefing::{briefing, Briefing};
use crate::coach::schedule::{
    auto_reschedule_overdue, carry_over, reschedule_task, update_task_status,
    AutoRescheduleResult,
};
use crate::errors::AppError;
use crate::models::plan::{TaskRow, TaskStatus};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BriefingQuery {
    pub user_id: Uuid,
    /// Defaults to today (UTC).
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// GET /api/v1/coach/briefing
pub async fn handle_briefing(
    State(state): State<AppState>,
    Query(params): Query<BriefingQuery>,
) -> Result<Json<Briefing>, AppError> {
    let date = params.date.unwrap_or_else(|| chrono::Utc::now().date_naive());
    Ok(Json(briefing(&state, params.user_id, date).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub actual_minutes: Option<i32>,
}

/// PATCH /api/v1/coach/tasks/:id
pub async fn handle_update_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(request): Json<UpdateTaskRequest>,
) -> Result<Json<TaskRow>, AppError> {
    if request.status.is_none() && request.actual_minutes.is_none() {
        return Err(AppError::Validation(
            "Provide status and/or actual_minutes".to_string(),
        ));
    }
    let task =
        update_task_status(&state.db, task_id, request.status, request.actual_minutes).await?;
    Ok(Json(task))
}

#[derive(Debug, Deserialize)]
pub struct RescheduleRequest {
    pub new_date: NaiveDate,
    #[serde(default)]
    pub reason: Option<String>,
}

/// POST /api/v1/coach/tasks/:id/reschedule
pub async fn handle_reschedule(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<TaskRow>, AppError> {
    let task =
        reschedule_task(&state.db, task_id, request.new_date, request.reason.as_deref()).await?;
    Ok(Json(task))
}

#[derive(Debug, Deserialize)]
pub struct CarryOverRequest {
    pub user_id: Uuid,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct CarryOverResponse {
    pub moved: Vec<Uuid>,
}

/// POST /api/v1/coach/carry-over
pub async fn handle_carry_over(
    State(state): State<AppState>,
    Json(request): Json<CarryOverRequest>,
) -> Result<Json<CarryOverResponse>, AppError> {
    let moved = carry_over(
        &state.db,
        request.user_id,
        request.from_date,
        request.to_date,
    )
    .await?;
    Ok(Json(CarryOverResponse { moved }))
}

#[derive(Debug, Deserialize)]
pub struct AutoRescheduleRequest {
    pub user_id: Uuid,
}

/// POST /api/v1/coach/auto-reschedule
pub async fn handle_auto_reschedule(
    State(state): State<AppState>,
    Json(request): Json<AutoRescheduleRequest>,
) -> Result<Json<AutoRescheduleResult>, AppError> {
    let result = auto_reschedule_overdue(&state.db, &state.config, request.user_id).await?;
    Ok(Json(result))
}
