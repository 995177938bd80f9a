// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-lifetime key/value tier (the session store).

use std::collections::BTreeMap;
use std::sync::RwLock;

use mohtasib_core::{KeyValueStore, MohtasibError, StoreScope};

use super::entry_size;

/// In-memory store with a byte quota. Contents vanish with the process.
pub struct MemoryKvStore {
    scope: StoreScope,
    quota_bytes: u64,
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new(scope: StoreScope, quota_bytes: u64) -> Self {
        Self {
            scope,
            quota_bytes,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// A session-scoped store.
    pub fn session(quota_bytes: u64) -> Self {
        Self::new(StoreScope::Session, quota_bytes)
    }

    fn poisoned() -> MohtasibError {
        MohtasibError::Internal("memory store lock poisoned".to_string())
    }
}

impl KeyValueStore for MemoryKvStore {
    fn scope(&self) -> StoreScope {
        self.scope
    }

    fn get(&self, key: &str) -> Result<Option<String>, MohtasibError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), MohtasibError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        let used: u64 = entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| entry_size(k, v))
            .sum();
        let needed = entry_size(key, value);
        let available = self.quota_bytes.saturating_sub(used);
        if needed > available {
            return Err(MohtasibError::QuotaExceeded {
                key: key.to_string(),
                needed,
                available,
            });
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), MohtasibError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, MohtasibError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries.keys().cloned().collect())
    }

    fn used_bytes(&self) -> Result<u64, MohtasibError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries.iter().map(|(k, v)| entry_size(k, v)).sum())
    }

    fn quota_bytes(&self) -> u64 {
        self.quota_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let store = MemoryKvStore::session(1024);
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert!(store.contains("a").unwrap());
        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        store.remove("a").unwrap();
    }

    #[test]
    fn rejects_write_over_quota() {
        let store = MemoryKvStore::session(10);
        store.set("k", "12345").unwrap();
        let err = store.set("other", "123456").unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(store.keys().unwrap(), vec!["k".to_string()]);
    }

    #[test]
    fn overwrite_does_not_count_the_old_value() {
        let store = MemoryKvStore::session(10);
        store.set("k", "123456789").unwrap();
        store.set("k", "987654321").unwrap();
        assert_eq!(store.used_bytes().unwrap(), 10);
    }

    #[test]
    fn usage_reports_scope_and_totals() {
        let store = MemoryKvStore::new(StoreScope::Local, 100);
        store.set("ab", "cd").unwrap();
        let usage = store.usage().unwrap();
        assert_eq!(usage.scope, StoreScope::Local);
        assert_eq!(usage.keys, 1);
        assert_eq!(usage.used_bytes, 4);
        assert_eq!(usage.quota_bytes, 100);
    }
}
