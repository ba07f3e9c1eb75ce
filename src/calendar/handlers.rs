//! Axum route handlers for calendar projection.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::calendar::projector::project;
use crate::errors::AppError;
use crate::models::calendar::CalendarEventRow;
use crate::state::AppState;

/// POST /api/v1/calendar/project/:plan_id
pub async fn handle_project(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<Vec<CalendarEventRow>>, AppError> {
    let events = project(&state.db, state.config.coach_start_hour, plan_id).await?;
    Ok(Json(events))
}
