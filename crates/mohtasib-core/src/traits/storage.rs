// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage traits: the size-limited key/value tier and the large-object tier.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::MohtasibError;
use crate::types::{KeyValueUsage, LargeObjectUsage, StoreScope};

/// A small-quota, synchronous key/value store holding text values.
///
/// Implementations must reject a `set` that would push usage over the
/// quota with [`MohtasibError::QuotaExceeded`], leaving the previous value
/// untouched. Usage counts key bytes plus value bytes.
pub trait KeyValueStore: Send + Sync {
    /// Which tier this store represents.
    fn scope(&self) -> StoreScope;

    fn get(&self, key: &str) -> Result<Option<String>, MohtasibError>;

    fn set(&self, key: &str, value: &str) -> Result<(), MohtasibError>;

    /// Removes `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), MohtasibError>;

    /// All keys currently stored, in no particular order.
    fn keys(&self) -> Result<Vec<String>, MohtasibError>;

    fn used_bytes(&self) -> Result<u64, MohtasibError>;

    fn quota_bytes(&self) -> u64;

    fn contains(&self, key: &str) -> Result<bool, MohtasibError> {
        Ok(self.get(key)?.is_some())
    }

    fn usage(&self) -> Result<KeyValueUsage, MohtasibError> {
        Ok(KeyValueUsage {
            scope: self.scope(),
            keys: self.keys()?.len() as u64,
            used_bytes: self.used_bytes()?,
            quota_bytes: self.quota_bytes(),
        })
    }
}

/// An asynchronous, higher-quota store for large encoded payloads.
///
/// No method returns an error: failures are logged by the implementation
/// and reported as "not stored" / "not found".
#[async_trait]
pub trait LargeObjectStore: Send + Sync {
    /// Inserts or replaces the payload stored under `id`. Returns whether it was stored.
    async fn put(&self, id: &str, payload: &str) -> bool;

    async fn get(&self, id: &str) -> Option<String>;

    async fn contains(&self, id: &str) -> bool;

    /// Ids of all entries whose id starts with `prefix`.
    async fn ids(&self, prefix: &str) -> Vec<String>;

    /// Deletes `id`; idempotent.
    async fn remove(&self, id: &str);

    /// Deletes every entry created more than `max_age` ago. Returns how many were removed.
    async fn sweep(&self, max_age: Duration) -> usize;

    async fn usage(&self) -> LargeObjectUsage;
}
