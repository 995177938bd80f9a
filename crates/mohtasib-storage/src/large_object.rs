// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chunked large-object store on SQLite.
//!
//! Each entry is a header row (`large_objects`) plus its content split into
//! fixed-size chunks (`large_object_chunks`). All writes go through the single
//! tokio-rusqlite writer. Trait methods never fail: errors are logged and
//! reported as `false`, `None`, or zero.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use mohtasib_config::model::StorageConfig;
use mohtasib_core::{LargeObjectStore, LargeObjectUsage, MohtasibError};
use rusqlite::{OptionalExtension, params};
use tracing::{debug, error, info, warn};

use crate::database::{Database, map_tr_err};
use crate::migrations::Schema;

pub struct SqliteLargeObjectStore {
    db: Database,
    quota_bytes: u64,
    chunk_size: usize,
}

/// Split `payload` into pieces of at most `chunk_size` bytes, never cutting a
/// UTF-8 sequence. A piece may exceed `chunk_size` only when a single
/// character is wider than it.
pub fn split_chunks(payload: &str, chunk_size: usize) -> Vec<&str> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::with_capacity(payload.len() / chunk_size + 1);
    let mut start = 0;
    while start < payload.len() {
        let mut end = (start + chunk_size).min(payload.len());
        while !payload.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            end = start + 1;
            while !payload.is_char_boundary(end) {
                end += 1;
            }
        }
        chunks.push(&payload[start..end]);
        start = end;
    }
    chunks
}

impl SqliteLargeObjectStore {
    pub async fn open(
        path: &Path,
        quota_bytes: u64,
        chunk_size: u64,
        wal_mode: bool,
    ) -> Result<Self, MohtasibError> {
        let db = Database::open(path, Schema::LargeObjects, wal_mode).await?;
        Ok(Self {
            db,
            quota_bytes,
            chunk_size: usize::try_from(chunk_size).unwrap_or(usize::MAX),
        })
    }

    pub async fn from_config(config: &StorageConfig) -> Result<Self, MohtasibError> {
        Self::open(
            &config.large_object_db_path(),
            config.large_object_quota_bytes,
            config.chunk_size_bytes,
            config.wal_mode,
        )
        .await
    }

    /// Store `payload` under `id`, replacing any previous entry.
    ///
    /// Returns `Ok(false)` when the quota would be exceeded.
    pub async fn try_put(&self, id: &str, payload: &str) -> Result<bool, MohtasibError> {
        let id = id.to_string();
        let payload = payload.to_string();
        let chunk_size = self.chunk_size;
        let quota = i64::try_from(self.quota_bytes).unwrap_or(i64::MAX);
        let created_at = chrono::Utc::now().timestamp_millis();

        self.db
            .connection()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let size = payload.len() as i64;
                let tx = conn.transaction()?;

                let used: i64 = tx.query_row(
                    "SELECT COALESCE(SUM(size), 0) FROM large_objects WHERE id <> ?1",
                    params![id],
                    |row| row.get(0),
                )?;
                if used.saturating_add(size) > quota {
                    return Ok(false);
                }

                let chunks = split_chunks(&payload, chunk_size);
                tx.execute(
                    "DELETE FROM large_object_chunks WHERE object_id = ?1",
                    params![id],
                )?;
                tx.execute(
                    "INSERT INTO large_objects (id, size, chunk_count, created_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(id) DO UPDATE SET
                         size = excluded.size,
                         chunk_count = excluded.chunk_count,
                         created_at = excluded.created_at",
                    params![id, size, chunks.len() as i64, created_at],
                )?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO large_object_chunks (object_id, seq, data) VALUES (?1, ?2, ?3)",
                    )?;
                    for (seq, chunk) in chunks.iter().enumerate() {
                        stmt.execute(params![id, seq as i64, chunk])?;
                    }
                }
                tx.commit()?;
                Ok(true)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Reassemble the entry stored under `id`.
    ///
    /// An entry whose chunk count does not match its header is treated as
    /// missing.
    pub async fn try_get(&self, id: &str) -> Result<Option<String>, MohtasibError> {
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
                let header: Option<(i64, i64)> = conn
                    .query_row(
                        "SELECT size, chunk_count FROM large_objects WHERE id = ?1",
                        params![id],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                let Some((size, chunk_count)) = header else {
                    return Ok(None);
                };

                let mut stmt = conn.prepare(
                    "SELECT data FROM large_object_chunks WHERE object_id = ?1 ORDER BY seq",
                )?;
                let mut payload = String::with_capacity(size.max(0) as usize);
                let mut seen = 0_i64;
                let mut rows = stmt.query(params![id])?;
                while let Some(row) = rows.next()? {
                    let chunk: String = row.get(0)?;
                    payload.push_str(&chunk);
                    seen += 1;
                }

                if seen != chunk_count || payload.len() as i64 != size {
                    warn!(%id, expected_chunks = chunk_count, found_chunks = seen, "large object is incomplete");
                    return Ok(None);
                }
                Ok(Some(payload))
            })
            .await
            .map_err(map_tr_err)
    }

    pub async fn try_contains(&self, id: &str) -> Result<bool, MohtasibError> {
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM large_objects WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(map_tr_err)
    }

    pub async fn try_ids(&self, prefix: &str) -> Result<Vec<String>, MohtasibError> {
        let prefix = prefix.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT id FROM large_objects WHERE substr(id, 1, length(?1)) = ?1 ORDER BY id",
                )?;
                let rows = stmt.query_map(params![prefix], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)
    }

    pub async fn try_remove(&self, id: &str) -> Result<bool, MohtasibError> {
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "DELETE FROM large_object_chunks WHERE object_id = ?1",
                    params![id],
                )?;
                let removed = tx.execute("DELETE FROM large_objects WHERE id = ?1", params![id])?;
                tx.commit()?;
                Ok(removed > 0)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Delete every entry created more than `max_age` ago.
    pub async fn try_sweep(&self, max_age: Duration) -> Result<usize, MohtasibError> {
        let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
        let cutoff = chrono::Utc::now()
            .timestamp_millis()
            .saturating_sub(max_age_ms);
        self.db
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "DELETE FROM large_object_chunks WHERE object_id IN
                         (SELECT id FROM large_objects WHERE created_at < ?1)",
                    params![cutoff],
                )?;
                let removed = tx.execute(
                    "DELETE FROM large_objects WHERE created_at < ?1",
                    params![cutoff],
                )?;
                tx.commit()?;
                Ok(removed)
            })
            .await
            .map_err(map_tr_err)
    }

    pub async fn try_usage(&self) -> Result<LargeObjectUsage, MohtasibError> {
        let (entries, payload_bytes) = self
            .db
            .connection()
            .call(|conn| -> Result<(i64, i64), rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(size), 0) FROM large_objects",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
            })
            .await
            .map_err(map_tr_err)?;
        Ok(LargeObjectUsage {
            entries: entries.max(0) as u64,
            payload_bytes: payload_bytes.max(0) as u64,
            database_bytes: self.db.size_bytes().await?,
            quota_bytes: self.quota_bytes,
        })
    }
}

#[async_trait]
impl LargeObjectStore for SqliteLargeObjectStore {
    async fn put(&self, id: &str, payload: &str) -> bool {
        match self.try_put(id, payload).await {
            Ok(true) => {
                debug!(id, bytes = payload.len(), "large object stored");
                true
            }
            Ok(false) => {
                warn!(
                    id,
                    bytes = payload.len(),
                    quota_bytes = self.quota_bytes,
                    "large-object quota exceeded"
                );
                false
            }
            Err(e) => {
                error!(id, error = %e, "large-object write failed");
                false
            }
        }
    }

    async fn get(&self, id: &str) -> Option<String> {
        self.try_get(id).await.unwrap_or_else(|e| {
            error!(id, error = %e, "large-object read failed");
            None
        })
    }

    async fn contains(&self, id: &str) -> bool {
        self.try_contains(id).await.unwrap_or_else(|e| {
            error!(id, error = %e, "large-object lookup failed");
            false
        })
    }

    async fn ids(&self, prefix: &str) -> Vec<String> {
        self.try_ids(prefix).await.unwrap_or_else(|e| {
            error!(prefix, error = %e, "large-object listing failed");
            Vec::new()
        })
    }

    async fn remove(&self, id: &str) {
        match self.try_remove(id).await {
            Ok(true) => debug!(id, "large object removed"),
            Ok(false) => {}
            Err(e) => error!(id, error = %e, "large-object delete failed"),
        }
    }

    async fn sweep(&self, max_age: Duration) -> usize {
        match self.try_sweep(max_age).await {
            Ok(removed) => {
                info!(removed, max_age_secs = max_age.as_secs(), "large-object sweep complete");
                removed
            }
            Err(e) => {
                error!(error = %e, "large-object sweep failed");
                0
            }
        }
    }

    async fn usage(&self) -> LargeObjectUsage {
        self.try_usage().await.unwrap_or_else(|e| {
            error!(error = %e, "large-object usage query failed");
            LargeObjectUsage {
                quota_bytes: self.quota_bytes,
                ..LargeObjectUsage::default()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn open_store(dir: &tempfile::TempDir, quota: u64, chunk: u64) -> SqliteLargeObjectStore {
        SqliteLargeObjectStore::open(&dir.path().join("objects.db"), quota, chunk, true)
            .await
            .unwrap()
    }

    #[test]
    fn split_chunks_respects_char_boundaries() {
        let chunks = split_chunks("aéb", 2);
        assert_eq!(chunks, vec!["a", "é", "b"]);
        assert_eq!(split_chunks("abcdef", 4), vec!["abcd", "ef"]);
        assert!(split_chunks("", 4).is_empty());
    }

    #[test]
    fn split_chunks_makes_progress_on_wide_chars() {
        assert_eq!(split_chunks("€€", 1), vec!["€", "€"]);
    }

    #[tokio::test]
    async fn put_get_multi_chunk() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir, 1 << 20, 7).await;
        let payload = "data:image/png;base64,".to_string() + &"QUJD".repeat(100);

        assert!(store.put("media-items/media-1", &payload).await);
        assert_eq!(store.get("media-items/media-1").await.as_deref(), Some(payload.as_str()));
        assert!(store.contains("media-items/media-1").await);
    }

    #[tokio::test]
    async fn put_replaces_existing_entry() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir, 1 << 20, 4).await;
        assert!(store.put("a", "first value").await);
        assert!(store.put("a", "second").await);
        assert_eq!(store.get("a").await.as_deref(), Some("second"));
        assert_eq!(store.usage().await.entries, 1);
    }

    #[tokio::test]
    async fn put_over_quota_returns_false() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir, 10, 4).await;
        assert!(store.put("a", "12345678").await);
        assert!(!store.put("b", "12345").await);
        assert!(store.get("b").await.is_none());
        // Replacing an entry only counts its new size.
        assert!(store.put("a", "1234567890").await);
    }

    #[tokio::test]
    async fn missing_and_removed_entries_read_as_none() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir, 1024, 4).await;
        assert!(store.get("nope").await.is_none());
        assert!(store.put("x", "payload").await);
        store.remove("x").await;
        store.remove("x").await;
        assert!(store.get("x").await.is_none());
        assert!(!store.contains("x").await);
    }

    #[tokio::test]
    async fn ids_filters_by_prefix() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir, 1024, 16).await;
        store.put("media-items/b", "1").await;
        store.put("media-items/a", "2").await;
        store.put("notifications/c", "3").await;
        assert_eq!(
            store.ids("media-items/").await,
            vec!["media-items/a".to_string(), "media-items/b".to_string()]
        );
    }

    #[tokio::test]
    async fn sweep_removes_only_old_entries() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir, 1024, 16).await;
        store.put("old", "1").await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(store.sweep(Duration::from_secs(3600)).await, 0);
        assert_eq!(store.sweep(Duration::ZERO).await, 1);
        assert!(store.get("old").await.is_none());
    }

    #[tokio::test]
    async fn usage_reports_entries_and_quota() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir, 4096, 16).await;
        store.put("a", "12345").await;
        store.put("b", "123").await;
        let usage = store.usage().await;
        assert_eq!(usage.entries, 2);
        assert_eq!(usage.payload_bytes, 8);
        assert_eq!(usage.quota_bytes, 4096);
        assert!(usage.database_bytes > 0);
    }
}
