//! Integration tests for the SQLite collection store.

use std::time::Duration;

use golem_studio::database::{DatabaseConfig, DatabaseManager, DEFAULT_COLLECTION_COLOR};
use tempfile::TempDir;

async fn open_store() -> (TempDir, DatabaseManager) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = DatabaseConfig::for_path(dir.path().join("data").join("app.db"));
    let db = DatabaseManager::connect(&config)
        .await
        .expect("failed to open store");
    (dir, db)
}

#[tokio::test]
async fn duplicate_name_fails_and_leaves_one_entry() {
    let (_dir, db) = open_store().await;
    let repo = db.collections();

    repo.create("notes", Some("#3b82f6")).await.unwrap();
    let second = repo.create("notes", Some("#ef4444")).await;
    assert!(second.is_err());

    let all = repo.list().await.unwrap();
    let notes: Vec<_> = all.iter().filter(|c| c.name == "notes").collect();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].color, "#3b82f6");
}

#[tokio::test]
async fn deleting_unknown_id_succeeds() {
    let (_dir, db) = open_store().await;
    let repo = db.collections();

    repo.delete("does-not-exist").await.unwrap();

    let created = repo.create("tickets", None).await.unwrap();
    repo.delete(&created.id).await.unwrap();
    repo.delete(&created.id).await.unwrap();
    assert!(repo.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn list_is_newest_first() {
    let (_dir, db) = open_store().await;
    let repo = db.collections();

    for name in ["first", "second", "third"] {
        repo.create(name, None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let names: Vec<String> = repo
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn default_color_applies() {
    let (_dir, db) = open_store().await;
    let created = db.collections().create("posts", None).await.unwrap();
    assert_eq!(created.color, DEFAULT_COLLECTION_COLOR);
    assert!(created.created_at > 0);
}

#[tokio::test]
async fn upsert_preset_keeps_identity_and_refreshes_color() {
    let (_dir, db) = open_store().await;
    let repo = db.collections();

    let original = repo.create("alerts", Some("#000000")).await.unwrap();
    let refreshed = repo.upsert_preset("alerts", "#ef4444").await.unwrap();
    assert_eq!(refreshed.id, original.id);
    assert_eq!(refreshed.created_at, original.created_at);
    assert_eq!(refreshed.color, "#ef4444");

    let stored = repo.find_by_name("alerts").await.unwrap().unwrap();
    assert_eq!(stored.color, "#ef4444");

    let inserted = repo.upsert_preset("events", "#f97316").await.unwrap();
    assert_eq!(repo.list().await.unwrap().len(), 2);
    assert_eq!(inserted.color, "#f97316");
}

#[tokio::test]
async fn wipe_clears_everything_and_reopen_keeps_schema() {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig::for_path(dir.path().join("app.db"));

    let db = DatabaseManager::connect(&config).await.unwrap();
    db.collections().create("a", None).await.unwrap();
    db.collections().create("b", None).await.unwrap();
    db.close().await;

    // migrations are idempotent
    let db = DatabaseManager::connect(&config).await.unwrap();
    let repo = db.collections();
    assert_eq!(repo.list().await.unwrap().len(), 2);
    assert_eq!(repo.wipe().await.unwrap(), 2);
    assert!(repo.list().await.unwrap().is_empty());
}
