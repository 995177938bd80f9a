// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent key/value tier backed by SQLite (the local store).
//!
//! The interface is synchronous, so the store holds a plain
//! `rusqlite::Connection` behind a mutex rather than the async writer.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use mohtasib_config::model::StorageConfig;
use mohtasib_core::{KeyValueStore, MohtasibError, StoreScope};
use rusqlite::{OptionalExtension, params};
use tracing::debug;

use super::entry_size;
use crate::database::open_connection;
use crate::migrations::Schema;

/// Byte accounting of all rows except `?1`.
const USED_EXCLUDING_SQL: &str = "SELECT COALESCE(SUM(length(CAST(key AS BLOB)) + length(CAST(value AS BLOB))), 0)
     FROM kv_entries WHERE key <> ?1";

pub struct SqliteKvStore {
    conn: Mutex<rusqlite::Connection>,
    quota_bytes: u64,
}

impl SqliteKvStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path, quota_bytes: u64, wal_mode: bool) -> Result<Self, MohtasibError> {
        let conn = open_connection(path, Schema::LocalKeyValue, wal_mode)?;
        debug!(path = %path.display(), quota_bytes, "local store opened");
        Ok(Self {
            conn: Mutex::new(conn),
            quota_bytes,
        })
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, MohtasibError> {
        Self::open(
            &config.local_db_path(),
            config.local_quota_bytes,
            config.wal_mode,
        )
    }

    fn lock(&self) -> Result<MutexGuard<'_, rusqlite::Connection>, MohtasibError> {
        self.conn
            .lock()
            .map_err(|_| MohtasibError::Internal("local store connection lock poisoned".to_string()))
    }
}

impl KeyValueStore for SqliteKvStore {
    fn scope(&self) -> StoreScope {
        StoreScope::Local
    }

    fn get(&self, key: &str) -> Result<Option<String>, MohtasibError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM kv_entries WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(MohtasibError::storage)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), MohtasibError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(MohtasibError::storage)?;

        let used: i64 = tx
            .query_row(USED_EXCLUDING_SQL, params![key], |row| row.get(0))
            .map_err(MohtasibError::storage)?;
        let needed = entry_size(key, value);
        let available = self.quota_bytes.saturating_sub(used.max(0) as u64);
        if needed > available {
            // Dropping the transaction rolls it back.
            return Err(MohtasibError::QuotaExceeded {
                key: key.to_string(),
                needed,
                available,
            });
        }

        tx.execute(
            "INSERT INTO kv_entries (key, value, updated_at)
             VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )
        .map_err(MohtasibError::storage)?;
        tx.commit().map_err(MohtasibError::storage)
    }

    fn remove(&self, key: &str) -> Result<(), MohtasibError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])
            .map_err(MohtasibError::storage)?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, MohtasibError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT key FROM kv_entries ORDER BY key")
            .map_err(MohtasibError::storage)?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(MohtasibError::storage)?;
        rows.collect::<Result<Vec<String>, _>>()
            .map_err(MohtasibError::storage)
    }

    fn used_bytes(&self) -> Result<u64, MohtasibError> {
        let conn = self.lock()?;
        let used: i64 = conn
            .query_row(
                "SELECT COALESCE(SUM(length(CAST(key AS BLOB)) + length(CAST(value AS BLOB))), 0)
                 FROM kv_entries",
                [],
                |row| row.get(0),
            )
            .map_err(MohtasibError::storage)?;
        Ok(used.max(0) as u64)
    }

    fn quota_bytes(&self) -> u64 {
        self.quota_bytes
    }
}
