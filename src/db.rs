use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;

/// Opens the coach's PostgreSQL connection pool. Pool sizing comes from
/// configuration; every service shares this one pool.
pub async fn create_pool(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;

    info!(
        "Database pool ready ({} max connections)",
        config.db_max_connections
    );
    Ok(pool)
}
