//! Axum route handlers for skill extraction.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::extractor::extract;
use crate::models::skill::SkillEvidenceRow;
use crate::state::AppState;
use crate::store;

#[derive(Debug, Serialize)]
pub struct ExtractSkillsResponse {
    pub document_id: Uuid,
    pub evidence: Vec<SkillEvidenceRow>,
}

/// POST /api/v1/documents/:id/extract
pub async fn handle_extract(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<ExtractSkillsResponse>, AppError> {
    let document = store::documents::get_document(&state.db, document_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {document_id} not found")))?;

    // Extraction wants determinism more than flair, so it runs at the
    // evaluation temperature rather than the generation one.
    let evidence = extract(
        &state.db,
        &state.llm,
        &document,
        state.config.eval_temperature,
    )
    .await?;

    Ok(Json(ExtractSkillsResponse {
        document_id,
        evidence,
    }))
}
