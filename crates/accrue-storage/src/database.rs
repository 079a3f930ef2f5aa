// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes: the leases and
//! conditional version transitions rely on every statement going through
//! this one connection.

use std::path::Path;

use accrue_core::AccrueError;
use tracing::debug;

use crate::migrations;

/// Convert a tokio-rusqlite error into [`AccrueError::Storage`].
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> AccrueError {
    AccrueError::Storage {
        source: Box::new(e),
    }
}

fn sqlite_err(e: rusqlite::Error) -> AccrueError {
    AccrueError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the single-writer SQLite connection.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path`, applies pending
    /// migrations, and configures connection PRAGMAs.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, AccrueError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| AccrueError::Storage {
                source: Box::new(e),
            })?;
        }

        // Migrations need a plain connection; refinery drives it synchronously.
        let migrate_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), AccrueError> {
            let mut conn = rusqlite::Connection::open(&migrate_path).map_err(sqlite_err)?;
            if wal_mode {
                let mode: String = conn
                    .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
                    .map_err(sqlite_err)?;
                debug!(mode, "journal mode set");
            }
            migrations::run_migrations(&mut conn)?;
            Ok(())
        })
        .await
        .map_err(|e| AccrueError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| AccrueError::Storage {
                source: Box::new(e),
            })?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA synchronous = NORMAL;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying async connection. Query modules call through this.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL so the database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), AccrueError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                // The pragma reports (busy, log, checkpointed); only success matters.
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            })
            .await
            .map_err(map_tr_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_schema_and_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/accrue.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();

        for table in [
            "context_items",
            "deliverable_versions",
            "deliverables",
            "feedback_observations",
            "leases",
            "resources",
            "users",
            "work_records",
        ] {
            assert!(tables.iter().any(|t| t == table), "missing table {table}");
        }
    }

    #[tokio::test]
    async fn reopening_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accrue.db");
        let path = path.to_str().unwrap();
        drop(Database::open(path, true).await.unwrap());
        let db = Database::open(path, true).await.unwrap();
        db.checkpoint().await.unwrap();
    }
}
