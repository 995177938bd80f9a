// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Snapshot shim: mirrors a record list into the local key/value store and
//! keeps doing so when the list no longer fits.
//!
//! A snapshot is the JSON array of a collection written under the
//! collection key. Payloads that do not belong in it are moved to the
//! large-object store (or to a small-store fallback entry) and replaced by
//! indirection tokens. Nothing here returns an error: every path ends in a
//! [`PersistOutcome`] and a log line.
//!
//! There is no atomicity across the three locations. A crash between an
//! offload and the snapshot write leaves an orphan entry, never a dangling
//! token, and [`SnapshotShim::sweep_orphans`] collects orphans. Copies an
//! offload supersedes are removed only after the snapshot that stops naming
//! them has been written, and eviction spares every entry the stored
//! snapshot still names.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use mohtasib_config::model::MohtasibConfig;
use mohtasib_core::{
    KeyValueStore, LargeObjectStore, MohtasibError, PayloadRef, Record, StoreScope,
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::kv::{MemoryKvStore, SqliteKvStore, entry_size};
use crate::large_object::SqliteLargeObjectStore;
use crate::policy::{DegradationPolicy, EvictionCandidate, ThresholdPolicy};

/// Entry id of a record's payload slot. The main `payload` slot uses the
/// record id itself; other slots append `.<slot>`.
pub fn entry_id(record_id: &str, slot: &str) -> String {
    if slot == "payload" {
        record_id.to_string()
    } else {
        format!("{record_id}.{slot}")
    }
}

/// Small-store key of a fallback entry: `<collection>-image-<entry>`.
pub fn fallback_key(collection: &str, entry: &str) -> String {
    format!("{collection}-image-{entry}")
}

/// Large-object id of an offloaded payload: `<collection>/<entry>`.
pub fn large_object_id(collection: &str, entry: &str) -> String {
    format!("{collection}/{entry}")
}

pub(crate) fn fallback_prefix(collection: &str) -> String {
    format!("{collection}-image-")
}

fn large_object_prefix(collection: &str) -> String {
    format!("{collection}/")
}

fn token_for(scope: StoreScope, entry: &str) -> PayloadRef {
    match scope {
        StoreScope::Local => PayloadRef::Local(entry.to_string()),
        StoreScope::Session => PayloadRef::Session(entry.to_string()),
    }
}

fn fingerprint(data: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    hasher.finish()
}

/// `io::Write` sink that only counts bytes.
struct ByteCounter(u64);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Serialized JSON size of `value` without allocating the string.
pub fn serialized_len<T: Serialize + ?Sized>(value: &T) -> Result<u64, MohtasibError> {
    let mut counter = ByteCounter(0);
    serde_json::to_writer(&mut counter, value)?;
    Ok(counter.0)
}

/// Counters describing what a persist did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistStats {
    /// Size of the unreduced snapshot.
    pub naive_bytes: u64,
    /// Size of the snapshot actually written (0 if nothing was written).
    pub written_bytes: u64,
    /// Payloads newly moved out of the snapshot.
    pub offloaded: usize,
    /// Payloads replaced by a token to an entry that already existed.
    pub reused: usize,
    /// Records left out by the per-category caps.
    pub capped: usize,
    /// Payloads removed from the snapshot with no copy anywhere.
    pub dropped: usize,
    /// Unreferenced entries evicted by the emergency pass.
    pub evicted: usize,
    /// Temporary keys cleared from the small stores.
    pub temp_keys_cleared: usize,
    /// Whether the write was retried after a quota failure.
    pub retried: bool,
}

/// Result of mirroring a record list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The full list was written unchanged.
    Written(PersistStats),
    /// A reduced snapshot was written.
    Degraded(PersistStats),
    /// Nothing was written; the list lives in memory only.
    MemoryOnly(PersistStats),
}

impl PersistOutcome {
    pub fn stats(&self) -> &PersistStats {
        match self {
            Self::Written(stats) | Self::Degraded(stats) | Self::MemoryOnly(stats) => stats,
        }
    }

    /// Whether a snapshot reached the local store.
    pub fn is_persisted(&self) -> bool {
        !matches!(self, Self::MemoryOnly(_))
    }
}

impl fmt::Display for PersistOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        match self {
            Self::Written(_) => write!(f, "saved ({} bytes)", stats.written_bytes),
            Self::Degraded(_) => write!(
                f,
                "saved reduced snapshot ({} of {} bytes; {} offloaded, {} reused, {} capped, {} dropped, {} evicted)",
                stats.written_bytes,
                stats.naive_bytes,
                stats.offloaded,
                stats.reused,
                stats.capped,
                stats.dropped,
                stats.evicted
            ),
            Self::MemoryOnly(_) => write!(
                f,
                "not saved: storage is full ({} bytes kept in memory only)",
                stats.naive_bytes
            ),
        }
    }
}

/// Persistence shim over the small stores and the large-object store.
pub struct SnapshotShim {
    local: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
    large: Arc<dyn LargeObjectStore>,
    policy: Arc<dyn DegradationPolicy>,
    /// Fingerprints of payloads already copied to the large-object store.
    mirrored: Mutex<HashMap<String, u64>>,
}

impl SnapshotShim {
    pub fn new(
        local: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
        large: Arc<dyn LargeObjectStore>,
        policy: Arc<dyn DegradationPolicy>,
    ) -> Self {
        Self {
            local,
            session,
            large,
            policy,
            mirrored: Mutex::new(HashMap::new()),
        }
    }

    /// Open the on-disk tiers described by `config`.
    pub async fn open(config: &MohtasibConfig) -> Result<Self, MohtasibError> {
        let local = SqliteKvStore::from_config(&config.storage)?;
        let session = MemoryKvStore::session(config.storage.session_quota_bytes);
        let large = SqliteLargeObjectStore::from_config(&config.storage).await?;
        let policy = ThresholdPolicy::from_config(&config.degradation);
        Ok(Self::new(
            Arc::new(local),
            Arc::new(session),
            Arc::new(large),
            Arc::new(policy),
        ))
    }

    pub fn local(&self) -> &dyn KeyValueStore {
        self.local.as_ref()
    }

    pub fn session(&self) -> &dyn KeyValueStore {
        self.session.as_ref()
    }

    pub fn large_objects(&self) -> &dyn LargeObjectStore {
        self.large.as_ref()
    }

    pub fn policy(&self) -> &dyn DegradationPolicy {
        self.policy.as_ref()
    }

    fn small_stores(&self) -> [&dyn KeyValueStore; 2] {
        [self.local.as_ref(), self.session.as_ref()]
    }

    /// Read the persisted snapshot of `R`'s collection.
    ///
    /// A missing, unreadable, or corrupt snapshot yields an empty list.
    pub fn load<R: Record>(&self) -> Vec<R> {
        let collection = R::COLLECTION;
        match self.local.get(collection) {
            Ok(Some(json)) => match serde_json::from_str::<Vec<R>>(&json) {
                Ok(records) => {
                    debug!(collection, count = records.len(), "snapshot loaded");
                    records
                }
                Err(e) => {
                    warn!(collection, error = %e, "stored snapshot is corrupt, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => {
                debug!(collection, "no stored snapshot");
                Vec::new()
            }
            Err(e) => {
                error!(collection, error = %e, "snapshot read failed, starting empty");
                Vec::new()
            }
        }
    }

    /// Mirror `records` into the local store, degrading as needed.
    pub async fn persist<R: Record>(&self, records: &[R]) -> PersistOutcome {
        let collection = R::COLLECTION;
        let mut stats = PersistStats::default();

        stats.naive_bytes = match serialized_len(records) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(collection, error = %e, "snapshot serialization failed");
                return PersistOutcome::MemoryOnly(stats);
            }
        };

        let inline_limit = self.policy.inline_item_limit();
        let oversized = records
            .iter()
            .flat_map(|r| r.payloads())
            .any(|(_, payload)| payload.inline_len() as u64 > inline_limit);

        let reduce = oversized || self.policy.should_offload(stats.naive_bytes);
        let mut superseded = Vec::new();
        let snapshot: Cow<'_, [R]> = if reduce {
            debug!(
                collection,
                naive_bytes = stats.naive_bytes,
                oversized,
                "running size-reduction pass"
            );
            Cow::Owned(self.reduce(records, &mut stats, &mut superseded).await)
        } else {
            Cow::Borrowed(records)
        };

        match self.write_snapshot(collection, &snapshot, &mut stats) {
            Ok(()) if reduce => {
                self.remove_superseded(&superseded);
                return PersistOutcome::Degraded(stats);
            }
            Ok(()) => return PersistOutcome::Written(stats),
            Err(e) if e.is_quota_exceeded() => {
                warn!(collection, error = %e, "snapshot exceeds local quota, running emergency pass");
            }
            Err(e) => {
                error!(collection, error = %e, "snapshot write failed, keeping records in memory only");
                return PersistOutcome::MemoryOnly(stats);
            }
        }

        stats.evicted += self.evict_unreferenced(collection, records).await;
        let mut snapshot = if reduce {
            snapshot.into_owned()
        } else {
            self.reduce(records, &mut stats, &mut superseded).await
        };
        stats.dropped += self.drop_inline_to_fit(collection, &mut snapshot);

        stats.retried = true;
        match self.write_snapshot(collection, &snapshot, &mut stats) {
            Ok(()) => {
                self.remove_superseded(&superseded);
                PersistOutcome::Degraded(stats)
            }
            Err(e) => {
                warn!(
                    collection,
                    error = %e,
                    "snapshot still does not fit after emergency pass, keeping records in memory only"
                );
                PersistOutcome::MemoryOnly(stats)
            }
        }
    }

    fn write_snapshot<R: Record>(
        &self,
        collection: &str,
        snapshot: &[R],
        stats: &mut PersistStats,
    ) -> Result<(), MohtasibError> {
        let json = serde_json::to_string(snapshot)?;
        self.local.set(collection, &json)?;
        stats.written_bytes = json.len() as u64;
        debug!(collection, bytes = json.len(), "snapshot written");
        Ok(())
    }

    /// The size-reduction pass: clear temporary keys, apply category caps,
    /// and rewrite inline payloads to tokens.
    ///
    /// Fallback keys whose content moved to the large-object store are
    /// pushed to `superseded`; the caller removes them once the snapshot is
    /// written.
    async fn reduce<R: Record>(
        &self,
        records: &[R],
        stats: &mut PersistStats,
        superseded: &mut Vec<String>,
    ) -> Vec<R> {
        let collection = R::COLLECTION;
        stats.temp_keys_cleared += self.clear_temporary_keys();

        let inline_limit = self.policy.inline_item_limit();
        let mut kept_per_category: HashMap<&'static str, usize> = HashMap::new();
        let mut snapshot = Vec::with_capacity(records.len());

        for record in records {
            if let Some(category) = record.category() {
                let kept = kept_per_category.entry(category).or_default();
                if self
                    .policy
                    .category_cap(category)
                    .is_some_and(|cap| *kept >= cap)
                {
                    stats.capped += 1;
                    continue;
                }
                *kept += 1;
            }

            let mut record = record.clone();
            let record_id = record.id().to_string();
            for (slot, payload) in record.payloads_mut() {
                if !payload.is_inline() {
                    continue;
                }
                let PayloadRef::Inline(data) = std::mem::take(payload) else {
                    continue;
                };
                let entry = entry_id(&record_id, slot);
                match self.offload(collection, &entry, &data, superseded).await {
                    Some((token, reused)) => {
                        *payload = token;
                        if reused {
                            stats.reused += 1;
                        } else {
                            stats.offloaded += 1;
                        }
                    }
                    None if data.len() as u64 > inline_limit => {
                        stats.dropped += 1;
                        warn!(
                            collection,
                            record = %record_id,
                            slot,
                            bytes = data.len(),
                            "payload could not be offloaded and was left out of the snapshot"
                        );
                    }
                    None => *payload = PayloadRef::Inline(data),
                }
            }
            snapshot.push(record);
        }

        if stats.capped > 0 {
            debug!(collection, capped = stats.capped, "category caps applied");
        }
        snapshot
    }

    /// Move one payload out of the snapshot. Returns the token and whether
    /// an existing entry was reused.
    async fn offload(
        &self,
        collection: &str,
        entry: &str,
        data: &str,
        superseded: &mut Vec<String>,
    ) -> Option<(PayloadRef, bool)> {
        let key = fallback_key(collection, entry);
        let mut stale_copy = false;
        for store in self.small_stores() {
            match store.get(&key) {
                Ok(Some(existing)) if existing == data => {
                    return Some((token_for(store.scope(), entry), true));
                }
                Ok(Some(_)) => stale_copy = true,
                Ok(None) => {}
                Err(e) => debug!(%key, scope = %store.scope(), error = %e, "fallback lookup failed"),
            }
        }

        let object_id = large_object_id(collection, entry);
        let print = fingerprint(data);
        let reused = self.is_mirrored(&object_id, print) && self.large.contains(&object_id).await;
        if !reused {
            if !self.large.put(&object_id, data).await {
                self.forget_mirror(&object_id);
                return self.write_fallback(&key, entry, data);
            }
            self.remember_mirror(object_id, print);
        }
        // The stored snapshot may still name the old copy.
        if stale_copy {
            superseded.push(key);
        }
        Some((PayloadRef::LargeObject(entry.to_string()), reused))
    }

    fn write_fallback(&self, key: &str, entry: &str, data: &str) -> Option<(PayloadRef, bool)> {
        if data.len() as u64 <= self.policy.fallback_item_limit() {
            for store in self.small_stores() {
                match store.set(key, data) {
                    Ok(()) => {
                        debug!(%key, scope = %store.scope(), bytes = data.len(), "payload written to fallback entry");
                        return Some((token_for(store.scope(), entry), false));
                    }
                    Err(e) => debug!(%key, scope = %store.scope(), error = %e, "fallback write failed"),
                }
            }
        }
        None
    }

    fn remove_superseded(&self, keys: &[String]) {
        for key in keys {
            for store in self.small_stores() {
                if let Err(e) = store.remove(key) {
                    debug!(%key, scope = %store.scope(), error = %e, "superseded fallback removal failed");
                }
            }
        }
        if !keys.is_empty() {
            debug!(removed = keys.len(), "superseded fallback entries removed");
        }
    }

    fn is_mirrored(&self, object_id: &str, print: u64) -> bool {
        let mirrored = self.mirrored.lock().unwrap_or_else(PoisonError::into_inner);
        mirrored.get(object_id) == Some(&print)
    }

    fn remember_mirror(&self, object_id: String, print: u64) {
        let mut mirrored = self.mirrored.lock().unwrap_or_else(PoisonError::into_inner);
        mirrored.insert(object_id, print);
    }

    fn forget_mirror(&self, object_id: &str) {
        let mut mirrored = self.mirrored.lock().unwrap_or_else(PoisonError::into_inner);
        mirrored.remove(object_id);
    }

    /// Remove keys the policy marks temporary from both small stores.
    pub fn clear_temporary_keys(&self) -> usize {
        let mut cleared = 0;
        for store in self.small_stores() {
            let keys = match store.keys() {
                Ok(keys) => keys,
                Err(e) => {
                    debug!(scope = %store.scope(), error = %e, "key listing failed");
                    continue;
                }
            };
            for key in keys.into_iter().filter(|k| self.policy.is_temporary_key(k)) {
                match store.remove(&key) {
                    Ok(()) => cleared += 1,
                    Err(e) => debug!(%key, error = %e, "temporary key removal failed"),
                }
            }
        }
        if cleared > 0 {
            debug!(cleared, "temporary keys cleared");
        }
        cleared
    }

    /// Drop inline payloads in eviction order until the snapshot should fit
    /// the room left in the local store.
    fn drop_inline_to_fit<R: Record>(&self, collection: &str, snapshot: &mut [R]) -> usize {
        let size = serialized_len(snapshot).unwrap_or(u64::MAX);
        let mut excess = size.saturating_sub(self.snapshot_room(collection));
        if excess == 0 {
            return 0;
        }

        let candidates: Vec<EvictionCandidate> = snapshot
            .iter()
            .enumerate()
            .flat_map(|(position, record)| {
                record
                    .payloads()
                    .into_iter()
                    .filter(|(_, payload)| payload.is_inline())
                    .map(move |(slot, payload)| EvictionCandidate {
                        position,
                        slot,
                        size: payload.inline_len() as u64,
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut dropped = 0;
        for candidate in self.policy.eviction_order(candidates) {
            if excess == 0 {
                break;
            }
            let Some(record) = snapshot.get_mut(candidate.position) else {
                continue;
            };
            let record_id = record.id().to_string();
            for (slot, payload) in record.payloads_mut() {
                if slot == candidate.slot && payload.is_inline() {
                    *payload = PayloadRef::Empty;
                    dropped += 1;
                    excess = excess.saturating_sub(candidate.size);
                    warn!(
                        collection,
                        record = %record_id,
                        slot,
                        bytes = candidate.size,
                        "inline payload dropped to fit the local store"
                    );
                }
            }
        }
        dropped
    }

    /// Bytes available for `collection`'s snapshot value, counting the space
    /// its current value would free.
    fn snapshot_room(&self, collection: &str) -> u64 {
        let quota = self.local.quota_bytes();
        let used = self.local.used_bytes().unwrap_or(quota);
        let current = match self.local.get(collection) {
            Ok(Some(value)) => entry_size(collection, &value),
            _ => 0,
        };
        quota
            .saturating_sub(used.saturating_sub(current))
            .saturating_sub(collection.len() as u64)
    }

    /// Resolve a payload reference to its content.
    ///
    /// Tokens whose entry is gone resolve to `None`.
    pub async fn resolve(&self, collection: &str, payload: &PayloadRef) -> Option<String> {
        match payload {
            PayloadRef::Empty => None,
            PayloadRef::Inline(data) => Some(data.clone()),
            PayloadRef::Local(entry) => self.read_fallback(self.local.as_ref(), collection, entry),
            PayloadRef::Session(entry) => {
                self.read_fallback(self.session.as_ref(), collection, entry)
            }
            PayloadRef::LargeObject(entry) => {
                let found = self.large.get(&large_object_id(collection, entry)).await;
                if found.is_none() {
                    debug!(collection, entry, "large-object token is dangling");
                }
                found
            }
        }
    }

    fn read_fallback(&self, store: &dyn KeyValueStore, collection: &str, entry: &str) -> Option<String> {
        let key = fallback_key(collection, entry);
        match store.get(&key) {
            Ok(Some(data)) => Some(data),
            Ok(None) => {
                debug!(%key, scope = %store.scope(), "fallback token is dangling");
                None
            }
            Err(e) => {
                error!(%key, scope = %store.scope(), error = %e, "fallback read failed");
                None
            }
        }
    }

    /// Remove every entry that holds a copy of one of `record`'s payloads.
    pub async fn release<R: Record>(&self, record: &R) -> usize {
        let collection = R::COLLECTION;
        let mut released = 0;
        for (slot, _) in record.payloads() {
            let entry = entry_id(record.id(), slot);
            let key = fallback_key(collection, &entry);
            for store in self.small_stores() {
                if matches!(store.contains(&key), Ok(true)) {
                    match store.remove(&key) {
                        Ok(()) => released += 1,
                        Err(e) => debug!(%key, error = %e, "fallback removal failed"),
                    }
                }
            }
            let object_id = large_object_id(collection, &entry);
            if self.large.contains(&object_id).await {
                self.large.remove(&object_id).await;
                released += 1;
            }
            self.forget_mirror(&object_id);
        }
        if released > 0 {
            debug!(collection, record = record.id(), released, "payload entries released");
        }
        released
    }

    /// Remove `R`'s entries that no record in `records` refers to.
    pub async fn sweep_orphans<R: Record>(&self, records: &[R]) -> usize {
        self.evict_unreferenced(R::COLLECTION, records).await
    }

    /// Remove `collection`'s entries named neither by `records` nor by the
    /// snapshot currently stored.
    async fn evict_unreferenced<R: Record>(&self, collection: &str, records: &[R]) -> usize {
        let mut referenced = referenced_entries(records);
        referenced.extend(referenced_entries(&self.load::<R>()));
        let mut evicted = 0;

        let object_prefix = large_object_prefix(collection);
        for object_id in self.large.ids(&object_prefix).await {
            let Some(entry) = object_id.strip_prefix(&object_prefix) else {
                continue;
            };
            if !referenced.contains(entry) {
                self.large.remove(&object_id).await;
                self.forget_mirror(&object_id);
                evicted += 1;
            }
        }

        let key_prefix = fallback_prefix(collection);
        for store in self.small_stores() {
            let keys = match store.keys() {
                Ok(keys) => keys,
                Err(e) => {
                    debug!(scope = %store.scope(), error = %e, "key listing failed");
                    continue;
                }
            };
            for key in keys {
                let Some(entry) = key.strip_prefix(&key_prefix) else {
                    continue;
                };
                if !referenced.contains(entry) {
                    match store.remove(&key) {
                        Ok(()) => evicted += 1,
                        Err(e) => debug!(%key, error = %e, "orphan removal failed"),
                    }
                }
            }
        }

        if evicted > 0 {
            debug!(collection, evicted, "unreferenced entries removed");
        }
        evicted
    }

    /// Bytes of `collection`'s stored snapshot, if any.
    pub fn snapshot_bytes(&self, collection: &str) -> Option<u64> {
        match self.local.get(collection) {
            Ok(value) => value.map(|v| v.len() as u64),
            Err(e) => {
                error!(collection, error = %e, "snapshot read failed");
                None
            }
        }
    }
}

/// Entry ids a list may still need: every payload slot of every record,
/// plus whatever entry a token names.
fn referenced_entries<R: Record>(records: &[R]) -> HashSet<String> {
    let mut referenced = HashSet::new();
    for record in records {
        for (slot, payload) in record.payloads() {
            referenced.insert(entry_id(record.id(), slot));
            if let PayloadRef::Local(entry) | PayloadRef::Session(entry) | PayloadRef::LargeObject(entry) =
                payload
            {
                referenced.insert(entry.clone());
            }
        }
    }
    referenced
}
