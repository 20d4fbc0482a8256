//! libSQL draft backend.
//!
//! Supports local file and in-memory databases. Each row is one
//! `(scope, key) -> value` entry.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::DraftBackend;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(path = %path.display(), "Draft database opened");
        Ok(backend)
    }

    /// Create an in-memory database.
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Delete entries not touched since `days` ago. Returns rows removed.
    pub async fn prune_stale(&self, days: u32) -> Result<u64, DatabaseError> {
        let cutoff = (Utc::now() - chrono::Duration::days(i64::from(days))).to_rfc3339();
        self.conn()
            .execute(
                "DELETE FROM draft_entries WHERE updated_at < ?1",
                params![cutoff],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("prune_stale: {e}")))
    }
}

#[async_trait]
impl DraftBackend for LibSqlBackend {
    async fn get(&self, scope: &str, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT value FROM draft_entries WHERE scope = ?1 AND key = ?2",
                params![scope, key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_draft_entry: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<String>(0)
                .map(Some)
                .map_err(|e| DatabaseError::Query(format!("get_draft_entry: {e}"))),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_draft_entry: {e}"))),
        }
    }

    async fn set(&self, scope: &str, key: &str, value: &str) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT INTO draft_entries (scope, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (scope, key) DO UPDATE SET value = ?3, updated_at = ?4",
                params![scope, key, value, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_draft_entry: {e}")))?;
        Ok(())
    }

    async fn remove(&self, scope: &str, key: &str) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute(
                "DELETE FROM draft_entries WHERE scope = ?1 AND key = ?2",
                params![scope, key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_draft_entry: {e}")))?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::{Draft, MealPreference, Stage};
    use crate::store::{DraftStore, PersistedDraft, ScopedDraftStore};

    #[tokio::test]
    async fn set_get_remove() {
        let db = LibSqlBackend::new_memory().await.unwrap();

        assert!(db.get("s1", "eventStep").await.unwrap().is_none());
        db.set("s1", "eventStep", "3").await.unwrap();
        assert_eq!(db.get("s1", "eventStep").await.unwrap().as_deref(), Some("3"));

        db.set("s1", "eventStep", "4").await.unwrap();
        assert_eq!(db.get("s1", "eventStep").await.unwrap().as_deref(), Some("4"));

        assert!(db.remove("s1", "eventStep").await.unwrap());
        assert!(!db.remove("s1", "eventStep").await.unwrap());
        assert!(db.get("s1", "eventStep").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn prune_keeps_fresh_entries() {
        let db = LibSqlBackend::new_memory().await.unwrap();
        db.set("s1", "eventForm", "{}").await.unwrap();
        assert_eq!(db.prune_stale(30).await.unwrap(), 0);
        assert!(db.get("s1", "eventForm").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn draft_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafts.db");

        let mut draft = Draft {
            contact_name: "Asha".into(),
            guest_count: Some(80),
            ..Default::default()
        };
        draft.meal_preferences.insert(MealPreference::Vegan);
        let persisted = PersistedDraft {
            draft,
            stage: Stage::MealPreferences,
        };

        {
            let backend: Arc<dyn DraftBackend> =
                Arc::new(LibSqlBackend::new_local(&path).await.unwrap());
            ScopedDraftStore::new(backend, "s1")
                .save(&persisted)
                .await
                .unwrap();
        }

        let backend: Arc<dyn DraftBackend> =
            Arc::new(LibSqlBackend::new_local(&path).await.unwrap());
        let loaded = ScopedDraftStore::new(backend, "s1")
            .load()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, persisted);
    }
}
