use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::document::{DocumentKind, DocumentRow, DocumentSection};

pub async fn insert_document(
    pool: &PgPool,
    user_id: Uuid,
    kind: DocumentKind,
    content: &str,
    sections: Vec<DocumentSection>,
    chunks: Vec<String>,
) -> Result<DocumentRow, sqlx::Error> {
    sqlx::query_as::<_, DocumentRow>(
        r#"
        INSERT INTO documents (id, user_id, kind, content, sections, chunks)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(kind)
    .bind(content)
    .bind(Json(sections))
    .bind(Json(chunks))
    .fetch_one(pool)
    .await
}

pub async fn get_document(pool: &PgPool, id: Uuid) -> Result<Option<DocumentRow>, sqlx::Error> {
    sqlx::query_as::<_, DocumentRow>("SELECT * FROM documents WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn ensure_user(pool: &PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
    // Users are created externally; this keeps local development friction-free.
    sqlx::query(
        "INSERT INTO users (id, email) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
    )
    .bind(user_id)
    .bind(format!("{user_id}@local.invalid"))
    .execute(pool)
    .await?;
    Ok(())
}
