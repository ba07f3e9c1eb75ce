use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::mastery::{MasteryRow, Trend};

pub async fn masteries_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<MasteryRow>, sqlx::Error> {
    sqlx::query_as::<_, MasteryRow>(
        "SELECT * FROM mastery WHERE user_id = $1 ORDER BY score DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn masteries_for_skills(
    pool: &PgPool,
    user_id: Uuid,
    skill_ids: &[Uuid],
) -> Result<Vec<MasteryRow>, sqlx::Error> {
    sqlx::query_as::<_, MasteryRow>(
        "SELECT * FROM mastery WHERE user_id = $1 AND skill_id = ANY($2)",
    )
    .bind(user_id)
    .bind(skill_ids)
    .fetch_all(pool)
    .await
}

/// Upserts the (user, skill) mastery row. The unique index guarantees at
/// most one row per pair regardless of interleaving.
pub async fn upsert_mastery(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    skill_id: Uuid,
    score: f64,
    trend: Trend,
) -> Result<MasteryRow, sqlx::Error> {
    sqlx::query_as::<_, MasteryRow>(
        r#"
        INSERT INTO mastery (id, user_id, skill_id, score, last_practiced, practice_count, trend, updated_at)
        VALUES ($1, $2, $3, $4, now(), 1, $5, now())
        ON CONFLICT (user_id, skill_id) DO UPDATE SET
            score = EXCLUDED.score,
            last_practiced = now(),
            practice_count = mastery.practice_count + 1,
            trend = EXCLUDED.trend,
            updated_at = now()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(skill_id)
    .bind(score)
    .bind(trend)
    .fetch_one(&mut **tx)
    .await
}

/// Evaluation scores for items touching a skill, most recent first.
/// Feeds the weighted mastery recomputation; callers inside the evaluation
/// transaction pass the transaction so the new score is visible.
pub async fn recent_scores_for_skill<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    skill_id: Uuid,
    limit: i64,
) -> Result<Vec<f64>, sqlx::Error> {
    sqlx::query_scalar::<_, f64>(
        r#"
        SELECT e.overall_score
        FROM evaluations e
        JOIN attempts a ON a.id = e.attempt_id
        JOIN practice_items pi ON pi.id = a.practice_item_id
        WHERE a.user_id = $1 AND $2 = ANY(pi.skill_ids)
        ORDER BY e.created_at DESC, e.id DESC
        LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(skill_id)
    .bind(limit)
    .fetch_all(executor)
    .await
}
