mod config;
mod error;
mod routes;
mod telemetry;

use anyhow::Context;
use haulbook_finance::FinanceEngine;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load()?;
    telemetry::init(config.log_format)?;

    let pool = haulbook_storage::create_db(&config.database_path)
        .await
        .with_context(|| format!("opening database at {}", config.database_path.display()))?;
    let engine = FinanceEngine::new(pool, config.engine);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, db = %config.database_path.display(), "haulbook server listening");

    axum::serve(listener, routes::router(AppState { engine })).await?;
    Ok(())
}
