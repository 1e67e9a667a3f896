//! Slot stored as a row in a SQLite database

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::path::Path;

use super::backend::{StorageBackend, StorageError};

/// Open (creating if needed) the RoadIt database file
pub async fn connect(db_path: &Path) -> Result<SqlitePool, StorageError> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    Ok(SqlitePool::connect(&db_url).await?)
}

/// Create the slots table if it doesn't exist
pub async fn create_slots_table(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS slots (
            name TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// One row of the `slots` table
#[derive(Debug, Clone)]
pub struct SqliteSlotBackend {
    pool: SqlitePool,
    slot: String,
}

impl SqliteSlotBackend {
    /// Bind to `slot`, creating the table on first use
    pub async fn new(pool: SqlitePool, slot: impl Into<String>) -> Result<Self, StorageError> {
        create_slots_table(&pool).await?;
        Ok(Self {
            pool,
            slot: slot.into(),
        })
    }
}

#[async_trait]
impl StorageBackend for SqliteSlotBackend {
    fn describe(&self) -> String {
        format!("sqlite slot '{}'", self.slot)
    }

    async fn load(&self) -> Result<Option<String>, StorageError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT payload FROM slots WHERE name = ?")
            .bind(&self.slot)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(payload,)| payload))
    }

    async fn save(&self, payload: &str) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO slots (name, payload, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at",
        )
        .bind(&self.slot)
        .bind(payload)
        .bind(crate::time::iso_millis::format(&crate::time::now()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    /// Single connection so every query sees the same in-memory database
    async fn setup_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_slot_loads_none() {
        let backend = SqliteSlotBackend::new(setup_test_db().await, "roadit_issues")
            .await
            .unwrap();
        assert!(backend.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_upserts() {
        let backend = SqliteSlotBackend::new(setup_test_db().await, "roadit_issues")
            .await
            .unwrap();

        backend.save("[]").await.unwrap();
        backend.save("[{\"id\":\"7\"}]").await.unwrap();

        assert_eq!(backend.load().await.unwrap().as_deref(), Some("[{\"id\":\"7\"}]"));
    }

    #[tokio::test]
    async fn test_slots_are_independent() {
        let pool = setup_test_db().await;
        let a = SqliteSlotBackend::new(pool.clone(), "a").await.unwrap();
        let b = SqliteSlotBackend::new(pool, "b").await.unwrap();

        a.save("[\"a\"]").await.unwrap();

        assert!(b.load().await.unwrap().is_none());
        assert_eq!(a.load().await.unwrap().as_deref(), Some("[\"a\"]"));
    }

    #[tokio::test]
    async fn test_connect_creates_database_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let db_path = dir.path().join("nested").join("roadit.db");

        let pool = connect(&db_path).await.unwrap();
        let backend = SqliteSlotBackend::new(pool, "roadit_issues").await.unwrap();
        backend.save("[]").await.unwrap();

        assert!(db_path.exists());
    }
}
