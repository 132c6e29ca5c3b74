// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes: the
//! queue claim and enqueue paths rely on the single-writer model plus
//! per-statement atomicity for their race-freedom.

use tokio_rusqlite::Connection;
use tracing::debug;

use keepr_core::KeeprError;

use crate::migrations;

/// Handle to the WAL-mode SQLite database.
///
/// Wraps a single `tokio_rusqlite::Connection`; query modules accept
/// `&Database` and call through `connection().call()`.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path`, apply PRAGMAs,
    /// and run embedded migrations.
    pub async fn open(path: &str) -> Result<Self, KeeprError> {
        Self::open_with_options(path, true).await
    }

    /// Open with explicit WAL-mode control (`wal_mode = false` is only
    /// useful on filesystems that cannot support WAL).
    pub async fn open_with_options(path: &str, wal_mode: bool) -> Result<Self, KeeprError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| KeeprError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = Connection::open(path).await.map_err(|e| KeeprError::Storage {
            source: Box::new(e),
        })?;

        let pragmas = if wal_mode {
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA busy_timeout=5000;
             PRAGMA foreign_keys=ON;"
        } else {
            "PRAGMA busy_timeout=5000;
             PRAGMA foreign_keys=ON;"
        };

        conn.call(move |conn| {
            conn.execute_batch(pragmas)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| migrations::run_migrations(conn))
            .await
            .map_err(|e: tokio_rusqlite::Error<KeeprError>| KeeprError::Storage {
                source: Box::new(e),
            })?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// Returns the underlying connection handle.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), KeeprError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into the crate error type.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> KeeprError {
    KeeprError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_parent_dirs() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("keepr.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        assert!(db_path.exists(), "database file should be created");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn migrations_create_schema() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("schema.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let tables: Vec<String> = db
            .connection()
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok::<_, rusqlite::Error>(names)
            })
            .await
            .unwrap();

        for table in ["actions", "join_requests", "vaults"] {
            assert!(tables.iter().any(|t| t == table), "missing table {table}");
        }

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_failure_surfaces_a_storage_error() {
        let dir = tempdir().unwrap();
        // A directory is not a valid database file.
        let err = Database::open(dir.path().to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, KeeprError::Storage { .. }));
    }

    #[tokio::test]
    async fn open_twice_is_idempotent_for_migrations() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
        // Second open must not re-apply V1.
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
    }
}
