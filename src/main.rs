use std::sync::Arc;

use cinerank_api::{
    api::{create_router, AppState},
    config::Config,
    db::{create_pool, InMemoryStore, PgStore},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("cinerank_api=debug,tower_http=info")
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let engine = config.engine();

    // Initialize application state
    let state = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            tracing::info!("Connected to PostgreSQL");
            AppState::with_store(Arc::new(PgStore::new(pool, engine.liked_threshold)), engine)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            AppState::with_store(Arc::new(InMemoryStore::new(engine.liked_threshold)), engine)
        }
    };

    // Create the router with all routes
    let app = create_router(state);

    // Start the server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
