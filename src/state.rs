use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::pipeline::locks::LockRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub llm: LlmClient,
    pub config: Config,
    /// Per-user and per-plan serialization for mastery updates and adaptive applies.
    pub locks: Arc<LockRegistry>,
}
