//! Axum route handlers for gap analysis.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::gaps::analyzer::analyze;
use crate::models::skill::{Coverage, GapRow};
use crate::state::AppState;
use crate::store;

#[derive(Debug, Deserialize)]
pub struct AnalyzeGapsRequest {
    pub user_id: Uuid,
    pub resume_doc_id: Uuid,
    pub jd_doc_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct GapReportResponse {
    pub gaps: Vec<GapRow>,
    pub total: usize,
    pub missing: usize,
    pub partial: usize,
    pub covered: usize,
}

fn report(gaps: Vec<GapRow>) -> GapReportResponse {
    let count = |c: Coverage| gaps.iter().filter(|g| g.coverage == c).count();
    GapReportResponse {
        total: gaps.len(),
        missing: count(Coverage::Missing),
        partial: count(Coverage::Partial),
        covered: count(Coverage::Covered),
        gaps,
    }
}

/// POST /api/v1/gaps/analyze
///
/// Replaces the user's active gap set from the two documents' evidence.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeGapsRequest>,
) -> Result<Json<GapReportResponse>, AppError> {
    let gaps = analyze(
        &state.db,
        request.user_id,
        request.resume_doc_id,
        request.jd_doc_id,
    )
    .await?;
    Ok(Json(report(gaps)))
}

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

/// GET /api/v1/gaps
pub async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<GapReportResponse>, AppError> {
    let mut gaps = store::gaps::gaps_for_user(&state.db, params.user_id).await?;
    gaps.sort_by(|a, b| {
        a.priority.rank().cmp(&b.priority.rank()).then(
            b.required_confidence
                .partial_cmp(&a.required_confidence)
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });
    Ok(Json(report(gaps)))
}
