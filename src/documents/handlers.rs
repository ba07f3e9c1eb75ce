//! Axum route handlers for document intake.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::documents::sections::{chunk_sections, normalize_whitespace, split_sections};
use crate::errors::AppError;
use crate::models::document::{DocumentKind, DocumentRow};
use crate::state::AppState;
use crate::store;

#[derive(Debug, Deserialize)]
pub struct UploadDocumentRequest {
    pub user_id: Uuid,
    pub kind: DocumentKind,
    /// Parsed text content; binary parsing happens upstream.
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct UploadDocumentResponse {
    pub document: DocumentRow,
    pub section_count: usize,
    pub chunk_count: usize,
}

/// POST /api/v1/documents
pub async fn handle_upload(
    State(state): State<AppState>,
    Json(request): Json<UploadDocumentRequest>,
) -> Result<Json<UploadDocumentResponse>, AppError> {
    if request.content.trim().is_empty() {
        return Err(AppError::Validation(
            "Document content cannot be empty".to_string(),
        ));
    }

    let content = normalize_whitespace(&request.content);
    let sections = split_sections(&content, request.kind);
    let chunks = chunk_sections(&sections);

    store::documents::ensure_user(&state.db, request.user_id).await?;
    let document = store::documents::insert_document(
        &state.db,
        request.user_id,
        request.kind,
        &content,
        sections,
        chunks,
    )
    .await?;

    tracing::info!(
        "Stored {:?} document {} for user {} ({} sections)",
        request.kind,
        document.id,
        request.user_id,
        document.sections.0.len()
    );

    Ok(Json(UploadDocumentResponse {
        section_count: document.sections.0.len(),
        chunk_count: document.chunks.0.len(),
        document,
    }))
}
