// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fault-injecting key/value store double.
//!
//! `MockKvStore` enforces a byte quota like the real tiers and can be told
//! to reject every write to chosen keys with a quota error. It records how
//! often each key was written and the largest value any write attempted.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use mohtasib_core::{KeyValueStore, MohtasibError, StoreScope};

#[derive(Default)]
struct State {
    entries: BTreeMap<String, String>,
    failing_keys: HashSet<String>,
    set_calls: HashMap<String, usize>,
    largest_write: usize,
}

pub struct MockKvStore {
    scope: StoreScope,
    quota_bytes: u64,
    state: Mutex<State>,
}

impl MockKvStore {
    pub fn new(scope: StoreScope, quota_bytes: u64) -> Self {
        Self {
            scope,
            quota_bytes,
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reject every future write to `key` with a quota error.
    pub fn fail_writes_to(&self, key: &str) {
        self.state().failing_keys.insert(key.to_string());
    }

    /// Accept writes to `key` again.
    pub fn heal(&self, key: &str) {
        self.state().failing_keys.remove(key);
    }

    /// Number of `set` calls for `key`, failed ones included.
    pub fn set_calls(&self, key: &str) -> usize {
        self.state().set_calls.get(key).copied().unwrap_or(0)
    }

    /// Length of the largest value any `set` call attempted to write.
    pub fn largest_write(&self) -> usize {
        self.state().largest_write
    }
}

impl KeyValueStore for MockKvStore {
    fn scope(&self) -> StoreScope {
        self.scope
    }

    fn get(&self, key: &str) -> Result<Option<String>, MohtasibError> {
        Ok(self.state().entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), MohtasibError> {
        let mut state = self.state();
        *state.set_calls.entry(key.to_string()).or_default() += 1;
        state.largest_write = state.largest_write.max(value.len());

        let used: u64 = state
            .entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum();
        let needed = (key.len() + value.len()) as u64;
        let available = self.quota_bytes.saturating_sub(used);

        if state.failing_keys.contains(key) || needed > available {
            return Err(MohtasibError::QuotaExceeded {
                key: key.to_string(),
                needed,
                available,
            });
        }
        state.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), MohtasibError> {
        self.state().entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, MohtasibError> {
        Ok(self.state().entries.keys().cloned().collect())
    }

    fn used_bytes(&self) -> Result<u64, MohtasibError> {
        Ok(self
            .state()
            .entries
            .iter()
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum())
    }

    fn quota_bytes(&self) -> u64 {
        self.quota_bytes
    }
}
