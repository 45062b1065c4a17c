//! studio-seed - populate the collection store and the ledger with demo data.
//!
//! Usage:
//!   studio-seed                      # presets + 80 entities
//!   studio-seed --count 120
//!   studio-seed --collections-only   # store only, no ledger settings needed
//!   studio-seed --entities-only      # use existing collections
//!   studio-seed --wipe-collections   # clear the store first

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use golem_studio::config::{database_from_lookup, StudioConfig};
use golem_studio::database::DatabaseManager;
use golem_studio::gateway::EntityGateway;
use golem_studio::ledger::RpcLedgerClient;
use golem_studio::seed::{run_seed, SeedOptions, DEFAULT_SEED_COUNT};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Parser, Debug)]
#[command(name = "studio-seed", about = "Seed Golem Studio collections and entities")]
struct Args {
    /// Only (up)sert collections in the local store
    #[arg(long)]
    collections_only: bool,

    /// Only create entities; do not touch collections
    #[arg(long)]
    entities_only: bool,

    /// Delete all collections first
    #[arg(long)]
    wipe_collections: bool,

    /// Total entities to create
    #[arg(long, default_value_t = DEFAULT_SEED_COUNT)]
    count: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "golem_studio=info".into()),
        )
        .init();

    let args = Args::parse();
    let options = SeedOptions {
        collections_only: args.collections_only,
        entities_only: args.entities_only,
        wipe_collections: args.wipe_collections,
        count: args.count,
    };
    tracing::info!("Seeding…");

    // Ledger settings are only required when entities are written
    let (database, gateway) = if options.collections_only {
        dotenvy::dotenv().ok();
        let database = database_from_lookup(&|name: &str| std::env::var(name).ok())
            .context("invalid store configuration")?;
        (database, None)
    } else {
        let config = StudioConfig::from_env().context("invalid configuration")?;
        let ledger = RpcLedgerClient::new(&config.ledger).context("failed to build ledger client")?;
        (config.database, Some(EntityGateway::new(Arc::new(ledger))))
    };

    let db = DatabaseManager::connect(&database)
        .await
        .context("failed to open collection store")?;
    let mut rng = StdRng::from_entropy();

    let report = run_seed(&options, &db.collections(), gateway.as_ref(), &mut rng).await?;
    tracing::info!(
        "Collections: {}, entities created: {} ({} expiring soon)",
        report.collections.len(),
        report.entities_created,
        report.soon_expiring
    );

    db.close().await;
    Ok(())
}
