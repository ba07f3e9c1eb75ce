use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::skill::{canonical_skill_name, SkillCategory, SkillEvidenceRow, SkillRow};

/// Idempotent, race-safe skill creation keyed by canonical name.
///
/// Read-then-insert loses races; the unique index plus `ON CONFLICT DO
/// UPDATE` is the required mechanism. The no-op update lets `RETURNING`
/// hand back the surviving row either way.
pub async fn upsert_skill<'e>(
    executor: impl PgExecutor<'e>,
    display_name: &str,
    category: SkillCategory,
) -> Result<SkillRow, sqlx::Error> {
    let canonical = canonical_skill_name(display_name);
    sqlx::query_as::<_, SkillRow>(
        r#"
        INSERT INTO skills (id, canonical_name, display_name, category)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (canonical_name) DO UPDATE SET canonical_name = EXCLUDED.canonical_name
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&canonical)
    .bind(display_name.trim())
    .bind(category)
    .fetch_one(executor)
    .await
}

pub async fn get_skills_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<SkillRow>, sqlx::Error> {
    sqlx::query_as::<_, SkillRow>(
        "SELECT * FROM skills WHERE id = ANY($1) ORDER BY canonical_name",
    )
    .bind(ids)
    .fetch_all(pool)
    .await
}

pub async fn insert_evidence<'e>(
    executor: impl PgExecutor<'e>,
    document_id: Uuid,
    skill_id: Uuid,
    snippet_text: &str,
    section_name: Option<&str>,
    confidence: f64,
) -> Result<SkillEvidenceRow, sqlx::Error> {
    sqlx::query_as::<_, SkillEvidenceRow>(
        r#"
        INSERT INTO skill_evidence (id, document_id, skill_id, snippet_text, section_name, confidence)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(document_id)
    .bind(skill_id)
    .bind(snippet_text)
    .bind(section_name)
    .bind(confidence)
    .fetch_one(executor)
    .await
}

pub async fn evidence_for_document(
    pool: &PgPool,
    document_id: Uuid,
) -> Result<Vec<SkillEvidenceRow>, sqlx::Error> {
    sqlx::query_as::<_, SkillEvidenceRow>(
        "SELECT * FROM skill_evidence WHERE document_id = $1 ORDER BY created_at, id",
    )
    .bind(document_id)
    .fetch_all(pool)
    .await
}

/// Re-extraction replaces the document's evidence rather than piling up rows.
pub async fn delete_evidence_for_document<'e>(
    executor: impl PgExecutor<'e>,
    document_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM skill_evidence WHERE document_id = $1")
        .bind(document_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
