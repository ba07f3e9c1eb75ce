pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::state::AppState;
use crate::{adaptive, calendar, coach, documents, extraction, gaps, mastery, planner, practice};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // ── Documents & skill extraction ───────────────────────────────────
        .route("/api/v1/documents", post(documents::handlers::handle_upload))
        .route(
            "/api/v1/documents/:id/extract",
            post(extraction::handlers::handle_extract),
        )
        // ── Gap analysis ───────────────────────────────────────────────────
        .route("/api/v1/gaps/analyze", post(gaps::handlers::handle_analyze))
        .route("/api/v1/gaps", get(gaps::handlers::handle_list))
        // ── Study plans ────────────────────────────────────────────────────
        .route("/api/v1/plans", post(planner::handlers::handle_generate))
        .route("/api/v1/plans/:id", get(planner::handlers::handle_get))
        // ── Daily coach ────────────────────────────────────────────────────
        .route(
            "/api/v1/coach/briefing",
            get(coach::handlers::handle_briefing),
        )
        .route(
            "/api/v1/coach/tasks/:id",
            patch(coach::handlers::handle_update_task),
        )
        .route(
            "/api/v1/coach/tasks/:id/reschedule",
            post(coach::handlers::handle_reschedule),
        )
        .route(
            "/api/v1/coach/carry-over",
            post(coach::handlers::handle_carry_over),
        )
        .route(
            "/api/v1/coach/auto-reschedule",
            post(coach::handlers::handle_auto_reschedule),
        )
        // ── Practice & evaluation ──────────────────────────────────────────
        .route(
            "/api/v1/practice/generate",
            post(practice::handlers::handle_generate),
        )
        .route(
            "/api/v1/practice/attempts",
            post(practice::handlers::handle_submit_attempt),
        )
        // ── Mastery ────────────────────────────────────────────────────────
        .route(
            "/api/v1/mastery/stats",
            get(mastery::handlers::handle_stats),
        )
        .route("/api/v1/mastery", get(mastery::handlers::handle_list))
        // ── Adaptive planning ──────────────────────────────────────────────
        .route(
            "/api/v1/adaptive/analyze",
            post(adaptive::handlers::handle_analyze),
        )
        .route(
            "/api/v1/adaptive/apply",
            post(adaptive::handlers::handle_apply),
        )
        // ── Calendar projection ────────────────────────────────────────────
        .route(
            "/api/v1/calendar/project/:plan_id",
            post(calendar::handlers::handle_project),
        )
        .with_state(state)
}
