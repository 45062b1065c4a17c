//! Collection repository
//!
//! Collections are a purely local grouping (name + display color) used to tag
//! and filter ledger entities. Deleting one never touches entities already
//! written under its name.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::error::StudioResult;

pub const DEFAULT_COLLECTION_COLOR: &str = "#3b82f6";

/// A collection row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub color: String,
    /// Epoch milliseconds
    pub created_at: i64,
}

/// Repository for the `collections` table
#[derive(Clone)]
pub struct CollectionRepository {
    pool: SqlitePool,
}

impl CollectionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All collections, newest first
    pub async fn list(&self) -> StudioResult<Vec<Collection>> {
        let rows = sqlx::query_as::<_, Collection>(
            r#"
            SELECT id, name, color, created_at
            FROM collections
            ORDER BY created_at DESC, name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Insert a new collection. Fails if the name is taken.
    pub async fn create(&self, name: &str, color: Option<&str>) -> StudioResult<Collection> {
        let collection = Collection {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            color: color.unwrap_or(DEFAULT_COLLECTION_COLOR).to_string(),
            created_at: Utc::now().timestamp_millis(),
        };

        sqlx::query(
            r#"
            INSERT INTO collections (id, name, color, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&collection.id)
        .bind(&collection.name)
        .bind(&collection.color)
        .bind(collection.created_at)
        .execute(&self.pool)
        .await?;

        info!("Created collection: {} ({})", collection.name, collection.id);
        Ok(collection)
    }

    /// Delete by id. Deleting an unknown id is not an error.
    pub async fn delete(&self, id: &str) -> StudioResult<()> {
        let result = sqlx::query("DELETE FROM collections WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            info!("Deleted collection {}", id);
        }
        Ok(())
    }

    pub async fn find_by_name(&self, name: &str) -> StudioResult<Option<Collection>> {
        let row = sqlx::query_as::<_, Collection>(
            r#"
            SELECT id, name, color, created_at
            FROM collections
            WHERE name = ?
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Insert `name`, or refresh the color of the existing row while keeping
    /// its id and creation time
    pub async fn upsert_preset(&self, name: &str, color: &str) -> StudioResult<Collection> {
        match self.find_by_name(name).await? {
            Some(existing) if existing.color == color => Ok(existing),
            Some(existing) => {
                sqlx::query("UPDATE collections SET color = ? WHERE id = ?")
                    .bind(color)
                    .bind(&existing.id)
                    .execute(&self.pool)
                    .await?;
                Ok(Collection {
                    color: color.to_string(),
                    ..existing
                })
            }
            None => self.create(name, Some(color)).await,
        }
    }

    /// Remove every collection. Returns the number of rows deleted.
    pub async fn wipe(&self) -> StudioResult<u64> {
        let result = sqlx::query("DELETE FROM collections")
            .execute(&self.pool)
            .await?;
        info!("Wiped {} collections", result.rows_affected());
        Ok(result.rows_affected())
    }
}
