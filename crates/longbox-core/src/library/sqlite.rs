//! SQLite-backed volume store.
//!
//! Thread-safe via an internal mutex on the connection. The volume body is
//! stored as one JSON document per volume next to a thin index row, plus a
//! per-issue status table for injection outcomes.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::types::{IssueStatus, Volume};
use super::VolumeStore;
use crate::{LongboxError, Result};

pub struct SqliteVolumeStore {
    conn: Mutex<Connection>,
}

impl SqliteVolumeStore {
    /// Open (and create if needed) the store at the given database path.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| LongboxError::io_with_path(e, parent))?;
        }

        let conn = Connection::open(db_path).map_err(|e| LongboxError::Database {
            message: format!("Failed to open volume database: {e}"),
            source: Some(e),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| LongboxError::Database {
                message: format!("Failed to set pragmas: {e}"),
                source: Some(e),
            })?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory store, used by tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| LongboxError::Database {
            message: format!("Failed to open in-memory database: {e}"),
            source: Some(e),
        })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().expect("volume store lock poisoned");
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS volumes (
                id INTEGER PRIMARY KEY,
                folder TEXT NOT NULL,
                total_issues INTEGER NOT NULL DEFAULT 0,
                last_updated TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS volume_details (
                volume_id INTEGER PRIMARY KEY,
                details_json TEXT NOT NULL,
                last_updated TEXT NOT NULL,
                FOREIGN KEY (volume_id) REFERENCES volumes (id)
            );

            CREATE TABLE IF NOT EXISTS issue_status (
                volume_id INTEGER NOT NULL,
                issue_index INTEGER NOT NULL,
                status TEXT NOT NULL,
                last_updated TEXT NOT NULL,
                PRIMARY KEY (volume_id, issue_index)
            );
            "#,
        )?;
        Ok(())
    }

    /// Insert or replace a volume listing.
    pub fn store_volume(&self, volume: &Volume) -> Result<()> {
        let details = serde_json::to_string(volume)?;
        let now = Utc::now().to_rfc3339();

        let conn = self.conn.lock().expect("volume store lock poisoned");
        conn.execute(
            "INSERT OR REPLACE INTO volumes (id, folder, total_issues, last_updated)
             VALUES (?1, ?2, ?3, ?4)",
            params![volume.id, volume.folder, volume.issues.len() as i64, now],
        )?;
        conn.execute(
            "INSERT OR REPLACE INTO volume_details (volume_id, details_json, last_updated)
             VALUES (?1, ?2, ?3)",
            params![volume.id, details, now],
        )?;

        debug!("Stored volume {} ({} issues)", volume.id, volume.issues.len());
        Ok(())
    }

    /// Look up the recorded status for one issue, if any.
    pub fn issue_status(&self, volume_id: i64, issue_index: usize) -> Result<Option<String>> {
        let conn = self.conn.lock().expect("volume store lock poisoned");
        let status = conn
            .query_row(
                "SELECT status FROM issue_status WHERE volume_id = ?1 AND issue_index = ?2",
                params![volume_id, issue_index as i64],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(status)
    }
}

#[async_trait]
impl VolumeStore for SqliteVolumeStore {
    async fn get_volume(&self, volume_id: i64) -> Result<Volume> {
        let details: Option<String> = {
            let conn = self.conn.lock().expect("volume store lock poisoned");
            conn.query_row(
                "SELECT details_json FROM volume_details WHERE volume_id = ?1",
                params![volume_id],
                |row| row.get(0),
            )
            .optional()?
        };

        let details = details.ok_or(LongboxError::VolumeNotFound { volume_id })?;
        let volume: Volume = serde_json::from_str(&details)?;
        Ok(volume)
    }

    async fn mark_issue_status(
        &self,
        volume_id: i64,
        issue_index: usize,
        status: IssueStatus,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().expect("volume store lock poisoned");
        conn.execute(
            "INSERT OR REPLACE INTO issue_status (volume_id, issue_index, status, last_updated)
             VALUES (?1, ?2, ?3, ?4)",
            params![volume_id, issue_index as i64, status.as_str(), now],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::types::Issue;

    fn sample_volume() -> Volume {
        Volume {
            id: 7,
            folder: "DC Comics/Batgirl (2019)".into(),
            issues: vec![
                Issue {
                    index: 0,
                    number: "1".into(),
                    files: vec!["DC Comics/Batgirl (2019)/Batgirl 001.cbz".into()],
                },
                Issue {
                    index: 1,
                    number: "Annual 1".into(),
                    files: vec!["DC Comics/Batgirl (2019)/Batgirl Annual 1.cbz".into()],
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_round_trip() {
        let store = SqliteVolumeStore::in_memory().unwrap();
        let volume = sample_volume();
        store.store_volume(&volume).unwrap();

        let loaded = store.get_volume(7).await.unwrap();
        assert_eq!(loaded, volume);
    }

    #[tokio::test]
    async fn test_missing_volume() {
        let store = SqliteVolumeStore::in_memory().unwrap();
        let err = store.get_volume(99).await.unwrap_err();
        assert!(matches!(err, LongboxError::VolumeNotFound { volume_id: 99 }));
    }

    #[tokio::test]
    async fn test_issue_status_upsert() {
        let store = SqliteVolumeStore::in_memory().unwrap();
        store.store_volume(&sample_volume()).unwrap();

        store.mark_issue_status(7, 0, IssueStatus::Failed).await.unwrap();
        store.mark_issue_status(7, 0, IssueStatus::Injected).await.unwrap();

        assert_eq!(store.issue_status(7, 0).unwrap().as_deref(), Some("injected"));
        assert_eq!(store.issue_status(7, 1).unwrap(), None);
    }
}
