//! Durable storage for all coach entities.
//!
//! One file per entity family, raw SQL throughout. Multi-entity writes
//! (plan synthesis, adaptive apply, evaluation) run inside a single
//! transaction opened by the calling service.

pub mod documents;
pub mod events;
pub mod gaps;
pub mod mastery;
pub mod plans;
pub mod practice;
pub mod schema;
pub mod skills;
pub mod tasks;

use std::future::Future;

use tracing::warn;

use crate::errors::AppError;

const TX_MAX_ATTEMPTS: u32 = 3;

/// Whether a database error is a transactional conflict worth retrying.
fn is_retryable(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            // 40001 = serialization_failure, 40P01 = deadlock_detected
            matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
        }
        _ => false,
    }
}

/// Runs a transactional operation, retrying serialization conflicts up to
/// 3 times with exponential backoff. Non-conflict errors propagate at once.
pub async fn with_conflict_retry<T, F, Fut>(mut op: F) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_retryable(&e) && attempt + 1 < TX_MAX_ATTEMPTS => {
                attempt += 1;
                let delay = std::time::Duration::from_millis(50 * (1 << attempt));
                warn!(
                    "Transaction conflict (attempt {attempt}), retrying after {}ms",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Converts a store error into the app error, surfacing an exhausted
/// conflict-retry budget as a storage conflict rather than a plain
/// database failure.
pub fn conflict_to_app(e: sqlx::Error) -> AppError {
    if is_retryable(&e) {
        AppError::Conflict("transaction conflict persisted after retries".to_string())
    } else {
        e.into()
    }
}
