// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory large-object store double with an optional quota and a
//! switch that makes every `put` fail.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use mohtasib_core::{LargeObjectStore, LargeObjectUsage};

#[derive(Default)]
pub struct MemoryLargeObjectStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
    quota_bytes: Option<u64>,
    failing: AtomicBool,
    put_calls: AtomicUsize,
}

impl MemoryLargeObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, (String, Instant)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every subsequent `put` fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Synchronous peek for assertions.
    pub fn peek(&self, id: &str) -> Option<String> {
        self.entries().get(id).map(|(payload, _)| payload.clone())
    }
}

#[async_trait]
impl LargeObjectStore for MemoryLargeObjectStore {
    async fn put(&self, id: &str, payload: &str) -> bool {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            tracing::debug!(id, "put rejected by failure switch");
            return false;
        }
        let mut entries = self.entries();
        if let Some(quota) = self.quota_bytes {
            let used: u64 = entries
                .iter()
                .filter(|(k, _)| k.as_str() != id)
                .map(|(_, (p, _))| p.len() as u64)
                .sum();
            if used + payload.len() as u64 > quota {
                return false;
            }
        }
        entries.insert(id.to_string(), (payload.to_string(), Instant::now()));
        true
    }

    async fn get(&self, id: &str) -> Option<String> {
        self.peek(id)
    }

    async fn contains(&self, id: &str) -> bool {
        self.entries().contains_key(id)
    }

    async fn ids(&self, prefix: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entries()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    async fn remove(&self, id: &str) {
        self.entries().remove(id);
    }

    async fn sweep(&self, max_age: Duration) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, (_, created)| created.elapsed() <= max_age);
        before - entries.len()
    }

    async fn usage(&self) -> LargeObjectUsage {
        let entries = self.entries();
        LargeObjectUsage {
            entries: entries.len() as u64,
            payload_bytes: entries.values().map(|(p, _)| p.len() as u64).sum(),
            database_bytes: 0,
            quota_bytes: self.quota_bytes.unwrap_or(u64::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failure_switch_and_quota() {
        let store = MemoryLargeObjectStore::with_quota(10);
        assert!(store.put("a", "12345").await);
        assert!(!store.put("b", "1234567").await);

        store.set_failing(true);
        assert!(!store.put("c", "1").await);
        assert_eq!(store.put_calls(), 3);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn ids_are_sorted_by_prefix() {
        let store = MemoryLargeObjectStore::new();
        store.put("x/2", "b").await;
        store.put("x/1", "a").await;
        store.put("y/1", "c").await;
        assert_eq!(store.ids("x/").await, vec!["x/1", "x/2"]);
    }
}
