//! The submit-attempt pipeline.
//!
//! Order of operations after the attempt row is committed:
//! evaluate → persist evaluation + mastery updates (one transaction, under
//! the per-user lock) → adaptive analysis. Failures past the attempt
//! persistence are logged and never surface as submission errors; a failed
//! evaluation is replaced by the neutral default before persistence, so an
//! evaluation row always exists.

use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::adaptive;
use crate::errors::AppError;
use crate::evaluation::evaluator;
use crate::evaluation::rubrics::default_criteria;
use crate::models::practice::{AttemptRow, EvaluationRow};
use crate::state::AppState;
use crate::store;

pub struct SubmitRequest {
    pub user_id: Uuid,
    pub practice_item_id: Uuid,
    pub answer: String,
    pub time_spent_seconds: Option<i32>,
}

pub struct SubmitOutcome {
    pub attempt: AttemptRow,
    pub evaluation: EvaluationRow,
}

/// Persists the evaluation and the mastery updates atomically.
async fn persist_evaluation_and_mastery(
    pool: &PgPool,
    user_id: Uuid,
    skill_ids: &[Uuid],
    evaluation: &store::practice::NewEvaluation,
) -> Result<EvaluationRow, sqlx::Error> {
    store::with_conflict_retry(|| async move {
        let mut tx = pool.begin().await?;
        let row = store::practice::upsert_evaluation(&mut tx, evaluation).await?;
        crate::mastery::tracker::apply_evaluation(&mut tx, user_id, skill_ids).await?;
        tx.commit().await?;
        Ok(row)
    })
    .await
}

/// Evaluates one attempt end to end and persists the results. Used by both
/// fresh submissions and explicit re-evaluation; re-evaluating replaces the
/// prior evaluation row.
pub async fn evaluate_attempt(
    state: &AppState,
    attempt: &AttemptRow,
) -> Result<EvaluationRow, AppError> {
    let item = store::practice::get_practice_item(&state.db, attempt.practice_item_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Practice item {} not found",
                attempt.practice_item_id
            ))
        })?;
    let rubric = match store::practice::get_rubric(&state.db, item.rubric_id).await? {
        Some(rubric) => rubric,
        None => {
            store::practice::get_or_create_rubric(
                &state.db,
                item.item_type,
                &default_criteria(item.item_type),
            )
            .await?
        }
    };

    // The LLM round-trip happens outside any transaction; only the results
    // are written atomically. Evaluation never fails the submission: the
    // evaluator degrades to the neutral default internally.
    let new_evaluation = evaluator::evaluate(
        &state.llm,
        state.config.eval_temperature,
        attempt,
        &item,
        &rubric,
    )
    .await;

    // Per-user lock: evaluations for attempts submitted in order update
    // mastery in the same order.
    let _guard = state.locks.user_lock(attempt.user_id).await;
    let row = persist_evaluation_and_mastery(
        &state.db,
        attempt.user_id,
        &item.skill_ids,
        &new_evaluation,
    )
    .await
    .map_err(store::conflict_to_app)?;
    Ok(row)
}

/// Full submission pipeline. The attempt is persisted first and submission
/// succeeds from that point on, whatever the downstream stages do.
pub async fn submit(state: &AppState, request: SubmitRequest) -> Result<SubmitOutcome, AppError> {
    let item = store::practice::get_practice_item(&state.db, request.practice_item_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Practice item {} not found",
                request.practice_item_id
            ))
        })?;

    let attempt = store::practice::insert_attempt(
        &state.db,
        request.user_id,
        request.practice_item_id,
        item.task_id,
        &request.answer,
        request.time_spent_seconds,
    )
    .await?;
    info!(
        "Attempt {} submitted by user {} for item {}",
        attempt.id, request.user_id, request.practice_item_id
    );

    let evaluation = evaluate_attempt(state, &attempt).await?;

    // Post-evaluation adaptive analysis is advisory: log, never fail.
    if let Some(plan) = store::plans::active_plan_for_user(&state.db, request.user_id).await? {
        match adaptive::apply::analyze(&state.db, &state.config, request.user_id, plan.id).await {
            Ok(analysis) => {
                if !analysis.recommendations.is_empty() {
                    info!(
                        "Adaptive analysis after attempt {}: {} recommendation(s)",
                        attempt.id,
                        analysis.recommendations.len()
                    );
                }
            }
            Err(e) => error!("Adaptive analysis failed after attempt {}: {e}", attempt.id),
        }
    }

    Ok(SubmitOutcome {
        attempt,
        evaluation,
    })
}
