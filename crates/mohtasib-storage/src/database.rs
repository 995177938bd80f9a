// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and migrations.
//!
//! Async tiers write through a single `tokio_rusqlite::Connection`, which
//! serializes every closure on one background thread. Do NOT create
//! additional async connections to the same file for writes.

use std::path::{Path, PathBuf};

use mohtasib_core::MohtasibError;
use tracing::debug;

use crate::migrations::{Schema, run_migrations};

/// Map a tokio-rusqlite error into the crate error type.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> MohtasibError {
    MohtasibError::storage(e)
}

/// Apply the connection PRAGMAs shared by every tier.
fn apply_pragmas(conn: &rusqlite::Connection, wal_mode: bool) -> Result<(), rusqlite::Error> {
    if wal_mode {
        // journal_mode returns a row, so it cannot go through execute_batch.
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
        debug!(%mode, "journal mode set");
    }
    conn.execute_batch(
        "PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;
         PRAGMA temp_store = MEMORY;",
    )?;
    Ok(())
}

/// Open a synchronous connection, creating parent directories and applying
/// pending migrations of `schema`.
pub fn open_connection(
    path: &Path,
    schema: Schema,
    wal_mode: bool,
) -> Result<rusqlite::Connection, MohtasibError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(MohtasibError::storage)?;
    }

    let mut conn = rusqlite::Connection::open(path).map_err(MohtasibError::storage)?;
    apply_pragmas(&conn, wal_mode).map_err(MohtasibError::storage)?;
    run_migrations(&mut conn, schema)?;
    Ok(conn)
}

/// An async database handle owning the single writer connection of a tier.
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: PathBuf,
}

impl Database {
    /// Open (or create) the database at `path` and bring `schema` up to date.
    ///
    /// Migrations run on a short-lived synchronous connection before the
    /// async writer is started.
    pub async fn open(path: &Path, schema: Schema, wal_mode: bool) -> Result<Self, MohtasibError> {
        let migrated = path.to_path_buf();
        tokio::task::spawn_blocking(move || open_connection(&migrated, schema, wal_mode).map(drop))
            .await
            .map_err(|e| MohtasibError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(MohtasibError::storage)?;
        conn.call(move |conn| -> Result<(), rusqlite::Error> { apply_pragmas(conn, wal_mode) })
            .await
            .map_err(map_tr_err)?;

        debug!(path = %path.display(), ?schema, "database opened");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// The single writer connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the database file in bytes (`page_count * page_size`).
    pub async fn size_bytes(&self) -> Result<u64, MohtasibError> {
        self.conn
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .map(|bytes| bytes.max(0) as u64)
            .map_err(map_tr_err)
    }
}
