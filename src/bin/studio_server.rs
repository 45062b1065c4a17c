//! studio-server - REST backend for Golem Studio.
//!
//! Configuration is read from the environment (see `golem_studio::config`).
//! Missing ledger settings abort startup.

use std::sync::Arc;

use anyhow::Context;
use golem_studio::api::{build_router, AppState};
use golem_studio::config::StudioConfig;
use golem_studio::database::DatabaseManager;
use golem_studio::ledger::{LedgerClient, RpcLedgerClient};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "golem_studio=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = StudioConfig::from_env().context("invalid configuration")?;

    let db = DatabaseManager::connect(&config.database)
        .await
        .context("failed to open collection store")?;
    tracing::info!("Collection store ready");

    let ledger: Arc<dyn LedgerClient> =
        Arc::new(RpcLedgerClient::new(&config.ledger).context("failed to build ledger client")?);

    let app = build_router(AppState::new(db.collections(), ledger));

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("Golem Studio listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
