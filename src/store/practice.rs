use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::practice::{
    AttemptRow, EvaluationRow, PracticeContent, PracticeItemRow, PracticeType, RubricCriterion,
    RubricRow,
};

// ── Rubrics ────────────────────────────────────────────────────────────────

pub async fn get_rubric(pool: &PgPool, id: Uuid) -> Result<Option<RubricRow>, sqlx::Error> {
    sqlx::query_as::<_, RubricRow>("SELECT * FROM rubrics WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Lazily creates the default rubric for a practice type. Idempotent under
/// concurrency: the unique index on practice_type makes the insert a no-op
/// for the loser, and the follow-up select returns the surviving row.
pub async fn get_or_create_rubric(
    pool: &PgPool,
    practice_type: PracticeType,
    default_criteria: &[RubricCriterion],
) -> Result<RubricRow, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO rubrics (id, practice_type, criteria)
        VALUES ($1, $2, $3)
        ON CONFLICT (practice_type) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(practice_type)
    .bind(Json(default_criteria.to_vec()))
    .execute(pool)
    .await?;

    sqlx::query_as::<_, RubricRow>("SELECT * FROM rubrics WHERE practice_type = $1")
        .bind(practice_type)
        .fetch_one(pool)
        .await
}

// ── Practice items ─────────────────────────────────────────────────────────

pub struct NewPracticeItem {
    pub task_id: Option<Uuid>,
    pub title: String,
    pub question: String,
    pub expected_answer: Option<String>,
    pub skill_ids: Vec<Uuid>,
    pub difficulty: crate::models::practice::Difficulty,
    pub content: PracticeContent,
    pub rubric_id: Uuid,
}

pub async fn insert_practice_item(
    pool: &PgPool,
    item: &NewPracticeItem,
) -> Result<PracticeItemRow, sqlx::Error> {
    sqlx::query_as::<_, PracticeItemRow>(
        r#"
        INSERT INTO practice_items
            (id, task_id, item_type, title, question, expected_answer,
             skill_ids, difficulty, content, rubric_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(item.task_id)
    .bind(item.content.practice_type())
    .bind(&item.title)
    .bind(&item.question)
    .bind(&item.expected_answer)
    .bind(&item.skill_ids)
    .bind(item.difficulty)
    .bind(Json(item.content.clone()))
    .bind(item.rubric_id)
    .fetch_one(pool)
    .await
}

pub async fn get_practice_item(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<PracticeItemRow>, sqlx::Error> {
    sqlx::query_as::<_, PracticeItemRow>("SELECT * FROM practice_items WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

// ── Attempts ───────────────────────────────────────────────────────────────

pub async fn insert_attempt(
    pool: &PgPool,
    user_id: Uuid,
    practice_item_id: Uuid,
    task_id: Option<Uuid>,
    answer: &str,
    time_spent_seconds: Option<i32>,
) -> Result<AttemptRow, sqlx::Error> {
    sqlx::query_as::<_, AttemptRow>(
        r#"
        INSERT INTO attempts (id, user_id, practice_item_id, task_id, answer, time_spent_seconds)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(practice_item_id)
    .bind(task_id)
    .bind(answer)
    .bind(time_spent_seconds)
    .fetch_one(pool)
    .await
}

// ── Evaluations ────────────────────────────────────────────────────────────

pub struct NewEvaluation {
    pub attempt_id: Uuid,
    pub rubric_id: Uuid,
    pub overall_score: f64,
    pub criterion_scores: BTreeMap<String, f64>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub feedback: String,
}

/// Writes an evaluation, replacing any prior one for the attempt. The unique
/// index on attempt_id turns re-evaluation into an atomic swap.
pub async fn upsert_evaluation(
    tx: &mut Transaction<'_, Postgres>,
    eval: &NewEvaluation,
) -> Result<EvaluationRow, sqlx::Error> {
    sqlx::query_as::<_, EvaluationRow>(
        r#"
        INSERT INTO evaluations
            (id, attempt_id, rubric_id, overall_score, criterion_scores,
             strengths, weaknesses, feedback)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (attempt_id) DO UPDATE SET
            rubric_id = EXCLUDED.rubric_id,
            overall_score = EXCLUDED.overall_score,
            criterion_scores = EXCLUDED.criterion_scores,
            strengths = EXCLUDED.strengths,
            weaknesses = EXCLUDED.weaknesses,
            feedback = EXCLUDED.feedback,
            created_at = now()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(eval.attempt_id)
    .bind(eval.rubric_id)
    .bind(eval.overall_score)
    .bind(Json(eval.criterion_scores.clone()))
    .bind(&eval.strengths)
    .bind(&eval.weaknesses)
    .bind(&eval.feedback)
    .fetch_one(&mut **tx)
    .await
}

/// Attempts submitted by the user within the trailing week.
pub async fn recent_attempt_count<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM attempts WHERE user_id = $1 AND submitted_at >= now() - interval '7 days'",
    )
    .bind(user_id)
    .fetch_one(executor)
    .await
}
