use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::skill::{Coverage, GapPriority, GapRow};

/// Input for one gap row; ids and timestamps are assigned on insert.
pub struct NewGap {
    pub skill_id: Uuid,
    pub required_confidence: f64,
    pub coverage: Coverage,
    pub priority: GapPriority,
    pub reason: String,
    pub estimated_hours: f64,
    pub evidence_refs: Vec<Uuid>,
}

/// Replaces the user's active gap set atomically.
pub async fn replace_gaps(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    gaps: &[NewGap],
) -> Result<Vec<GapRow>, sqlx::Error> {
    sqlx::query("DELETE FROM gaps WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

    let mut rows = Vec::with_capacity(gaps.len());
    for gap in gaps {
        let row = sqlx::query_as::<_, GapRow>(
            r#"
            INSERT INTO gaps
                (id, user_id, skill_id, required_confidence, coverage, priority,
                 reason, estimated_hours, evidence_refs)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(gap.skill_id)
        .bind(gap.required_confidence)
        .bind(gap.coverage)
        .bind(gap.priority)
        .bind(&gap.reason)
        .bind(gap.estimated_hours)
        .bind(&gap.evidence_refs)
        .fetch_one(&mut **tx)
        .await?;
        rows.push(row);
    }
    Ok(rows)
}

pub async fn gaps_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<GapRow>, sqlx::Error> {
    sqlx::query_as::<_, GapRow>("SELECT * FROM gaps WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(pool)
        .await
}
