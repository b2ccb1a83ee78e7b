//! Pledge payment service — entry point.
//!
//! Serves the Postfinance checkout form for pledges and receives the
//! processor's instant payment notifications, persisting payment records
//! and pledge status transitions to SQLite.

use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pledgepay::api::{self, AppState};
use pledgepay::config::Config;
use pledgepay::db;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    // Load config from environment.  Missing secrets abort startup.
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    let addr = format!("0.0.0.0:{}", config.api_port);

    let state = Arc::new(AppState { pool, config });
    let app = api::router(state).layer(TraceLayer::new_for_http());

    info!("Payment service listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
