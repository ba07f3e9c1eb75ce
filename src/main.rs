mod adaptive;
mod calendar;
mod coach;
mod config;
mod db;
mod documents;
mod errors;
mod evaluation;
mod extraction;
mod gaps;
mod llm_client;
mod mastery;
mod models;
mod pipeline;
mod planner;
mod practice;
mod routes;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::pipeline::locks::LockRegistry;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting prepcoach v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL and the schema
    let db = create_pool(&config).await?;
    store::schema::init(&db).await?;

    // Initialize the LLM client
    let llm = LlmClient::from_config(&config);
    info!(
        "LLM client initialized (provider: {:?}, model: {})",
        config.llm_provider,
        llm.model()
    );

    // Build app state
    let state = AppState {
        db,
        llm,
        config: config.clone(),
        locks: Arc::new(LockRegistry::new()),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
