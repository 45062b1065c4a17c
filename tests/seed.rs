//! End-to-end seeding: presets into SQLite, entities into the in-memory ledger,
//! then a dashboard summary over both.

use std::collections::HashSet;
use std::sync::Arc;

use golem_studio::analytics::dashboard_summary;
use golem_studio::database::{DatabaseConfig, DatabaseManager};
use golem_studio::gateway::EntityGateway;
use golem_studio::ledger::{InMemoryLedger, LedgerClient};
use golem_studio::seed::{run_seed, SeedOptions, PRESET_COLLECTIONS, SOON_BTL};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[tokio::test]
async fn seed_then_summarize() {
    let dir = tempfile::tempdir().unwrap();
    let db = DatabaseManager::connect(&DatabaseConfig::for_path(dir.path().join("app.db")))
        .await
        .unwrap();
    let repo = db.collections();
    repo.create("leftover", None).await.unwrap();

    let ledger = Arc::new(InMemoryLedger::with_head(1000));
    let gateway = EntityGateway::new(ledger.clone() as Arc<dyn LedgerClient>);
    let mut rng = StdRng::seed_from_u64(2024);

    let options = SeedOptions {
        wipe_collections: true,
        count: 10,
        ..SeedOptions::default()
    };
    let report = run_seed(&options, &repo, Some(&gateway), &mut rng)
        .await
        .unwrap();
    assert_eq!(report.collections.len(), PRESET_COLLECTIONS.len());
    assert_eq!(report.entities_created, 10);
    // 10 over 5 collections is 2 each; a quarter of 2 rounds down to 0
    assert_eq!(report.soon_expiring, 0);
    assert_eq!(ledger.len().await, 10);

    let summary = dashboard_summary(&repo, &gateway).await.unwrap();
    assert_eq!(summary.totals.total_collections, 5);
    assert!(summary.totals.total_entities <= 10);
    let keys: HashSet<&str> = summary
        .recent
        .iter()
        .map(|r| r.entity_key.as_str())
        .collect();
    assert_eq!(keys.len(), summary.recent.len());
    assert!(repo.find_by_name("leftover").await.unwrap().is_none());
}

#[tokio::test]
async fn soon_expiring_share_lands_in_the_dashboard() {
    let dir = tempfile::tempdir().unwrap();
    let db = DatabaseManager::connect(&DatabaseConfig::for_path(dir.path().join("app.db")))
        .await
        .unwrap();
    let repo = db.collections();
    let ledger = Arc::new(InMemoryLedger::with_head(1000));
    let gateway = EntityGateway::new(ledger.clone() as Arc<dyn LedgerClient>);
    let mut rng = StdRng::seed_from_u64(9);

    let options = SeedOptions {
        count: 40,
        ..SeedOptions::default()
    };
    let report = run_seed(&options, &repo, Some(&gateway), &mut rng)
        .await
        .unwrap();
    // 8 per collection, 2 of each short-lived
    assert_eq!(report.soon_expiring, 10);

    let summary = dashboard_summary(&repo, &gateway).await.unwrap();
    assert_eq!(summary.totals.total_entities, 40);
    for entry in &summary.recent {
        let remaining = entry.expires_at_block.unwrap() - summary.head_block;
        let short = SOON_BTL.contains(&remaining);
        assert!(short || remaining >= 2000);
    }
    assert_eq!(
        summary.totals.expiring_soon,
        summary
            .recent
            .iter()
            .filter(|r| r.expires_at_block.unwrap() - summary.head_block <= 300)
            .count()
    );
}

#[tokio::test]
async fn collections_only_needs_no_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let db = DatabaseManager::connect(&DatabaseConfig::for_path(dir.path().join("app.db")))
        .await
        .unwrap();
    let repo = db.collections();
    let mut rng = StdRng::seed_from_u64(1);

    let options = SeedOptions {
        collections_only: true,
        ..SeedOptions::default()
    };
    let report = run_seed(&options, &repo, None, &mut rng).await.unwrap();
    assert_eq!(report.entities_created, 0);

    let names: HashSet<String> = repo.list().await.unwrap().into_iter().map(|c| c.name).collect();
    let presets: HashSet<String> = PRESET_COLLECTIONS
        .iter()
        .map(|(name, _)| name.to_string())
        .collect();
    assert_eq!(names, presets);

    // running again keeps one row per preset
    run_seed(&options, &repo, None, &mut rng).await.unwrap();
    assert_eq!(repo.list().await.unwrap().len(), 5);

    let entities = SeedOptions::default();
    assert!(run_seed(&entities, &repo, None, &mut rng).await.is_err());
}

#[tokio::test]
async fn entities_only_uses_existing_collections() {
    let dir = tempfile::tempdir().unwrap();
    let db = DatabaseManager::connect(&DatabaseConfig::for_path(dir.path().join("app.db")))
        .await
        .unwrap();
    let repo = db.collections();
    repo.create("custom", Some("#123456")).await.unwrap();

    let ledger = Arc::new(InMemoryLedger::new());
    let gateway = EntityGateway::new(ledger.clone() as Arc<dyn LedgerClient>);
    let mut rng = StdRng::seed_from_u64(3);

    let options = SeedOptions {
        entities_only: true,
        count: 6,
        ..SeedOptions::default()
    };
    let report = run_seed(&options, &repo, Some(&gateway), &mut rng)
        .await
        .unwrap();
    assert_eq!(report.collections.len(), 1);
    assert_eq!(report.entities_created, 6);
    assert_eq!(repo.list().await.unwrap().len(), 1);
}
