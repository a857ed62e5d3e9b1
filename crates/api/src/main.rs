//! Staffdesk API server entry point

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use staffdesk_api::{routes, store::postgres::PgTicketStore, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("staffdesk_api=debug,info")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    let pool = staffdesk_shared::db::create_pool(
        &config.database_url,
        config.database_max_connections,
    )
    .await
    .context("failed to connect to database")?;
    staffdesk_shared::db::run_migrations(&pool)
        .await
        .context("failed to run migrations")?;

    let store = Arc::new(PgTicketStore::new(pool));
    let bind_address = config.bind_address.clone();
    let state = AppState::new(config, store);

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    tracing::info!(addr = %bind_address, "Staffdesk API listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
