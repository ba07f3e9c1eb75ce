//! Axum route handlers for practice generation and attempt submission.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::practice::{AttemptRow, EvaluationRow, PracticeItemRow, PracticeType};
use crate::pipeline::submit::{submit, SubmitRequest};
use crate::practice::generator::generate_for_task;
use crate::state::AppState;

const MAX_ITEMS_PER_REQUEST: usize = 10;

#[derive(Debug, Deserialize)]
pub struct GeneratePracticeRequest {
    pub task_id: Uuid,
    pub practice_type: PracticeType,
    #[serde(default = "default_count")]
    pub count: usize,
}

fn default_count() -> usize {
    1
}

/// POST /api/v1/practice/generate
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GeneratePracticeRequest>,
) -> Result<Json<Vec<PracticeItemRow>>, AppError> {
    if request.count == 0 || request.count > MAX_ITEMS_PER_REQUEST {
        return Err(AppError::Validation(format!(
            "count must be between 1 and {MAX_ITEMS_PER_REQUEST}"
        )));
    }
    let items = generate_for_task(
        &state.db,
        &state.llm,
        &state.config,
        request.task_id,
        request.practice_type,
        request.count,
    )
    .await?;
    Ok(Json(items))
}

#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    pub user_id: Uuid,
    pub practice_item_id: Uuid,
    pub answer: String,
    #[serde(default)]
    pub time_spent_seconds: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct SubmitAttemptResponse {
    pub attempt: AttemptRow,
    pub evaluation: EvaluationRow,
}

/// POST /api/v1/practice/attempts
///
/// Persists the attempt, evaluates it, updates mastery and runs the
/// adaptive analysis hook. A provider outage degrades the evaluation to the
/// neutral default rather than failing the submission.
pub async fn handle_submit_attempt(
    State(state): State<AppState>,
    Json(request): Json<SubmitAttemptRequest>,
) -> Result<Json<SubmitAttemptResponse>, AppError> {
    if request.answer.trim().is_empty() {
        return Err(AppError::Validation("answer cannot be empty".to_string()));
    }
    let outcome = submit(
        &state,
        SubmitRequest {
            user_id: request.user_id,
            practice_item_id: request.practice_item_id,
            answer: request.answer,
            time_spent_seconds: request.time_spent_seconds,
        },
    )
    .await?;
    Ok(Json(SubmitAttemptResponse {
        attempt: outcome.attempt,
        evaluation: outcome.evaluation,
    }))
}
