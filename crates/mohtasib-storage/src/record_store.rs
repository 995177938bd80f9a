// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory record list mirrored through the snapshot shim.
//!
//! Mutations take effect in memory first and are visible to readers and
//! subscribers before the mirror write completes. Mirror writes are
//! serialized by one async mutex, so snapshots land in mutation order.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use mohtasib_core::{MohtasibError, Record};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::shim::{PersistOutcome, SnapshotShim};

/// The authoritative list of one record type.
pub struct RecordStore<R: Record> {
    records: RwLock<Vec<R>>,
    shim: Arc<SnapshotShim>,
    writer: Mutex<()>,
    changes: watch::Sender<Arc<Vec<R>>>,
}

impl<R: Record> RecordStore<R> {
    /// A store holding `records`, without reading any snapshot.
    pub fn new(shim: Arc<SnapshotShim>, records: Vec<R>) -> Self {
        let (changes, _) = watch::channel(Arc::new(records.clone()));
        Self {
            records: RwLock::new(records),
            shim,
            writer: Mutex::new(()),
            changes,
        }
    }

    /// A store initialised from the persisted snapshot.
    pub fn hydrate(shim: Arc<SnapshotShim>) -> Self {
        let records = shim.load::<R>();
        debug!(collection = R::COLLECTION, count = records.len(), "record store hydrated");
        Self::new(shim, records)
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<R>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<R>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn shim(&self) -> &SnapshotShim {
        &self.shim
    }

    /// Current list, newest first.
    pub fn records(&self) -> Vec<R> {
        self.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<R> {
        self.read().iter().find(|r| r.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Receiver observing every new list.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<R>>> {
        self.changes.subscribe()
    }

    /// Prepend `item`. Ids are not checked for uniqueness.
    pub async fn add(&self, item: R) -> PersistOutcome {
        let _writer = self.writer.lock().await;
        let snapshot = {
            let mut records = self.write();
            if records.iter().any(|r| r.id() == item.id()) {
                warn!(collection = R::COLLECTION, id = item.id(), "adding a record with a duplicate id");
            }
            debug!(collection = R::COLLECTION, id = item.id(), "record added");
            records.insert(0, item);
            Arc::new(records.clone())
        };
        self.mirror(snapshot).await
    }

    /// Apply `patch` to the record with `id`.
    ///
    /// An invalid patch is rejected before anything changes. An unknown id
    /// is a no-op and returns `Ok(None)`.
    pub async fn update(&self, id: &str, patch: R::Patch) -> Result<Option<PersistOutcome>, MohtasibError> {
        R::validate_patch(&patch)?;

        let _writer = self.writer.lock().await;
        let snapshot = {
            let mut records = self.write();
            let Some(record) = records.iter_mut().find(|r| r.id() == id) else {
                debug!(collection = R::COLLECTION, id, "update of unknown record ignored");
                return Ok(None);
            };
            record.apply_patch(patch);
            debug!(collection = R::COLLECTION, id, "record updated");
            Arc::new(records.clone())
        };
        Ok(Some(self.mirror(snapshot).await))
    }

    /// Remove the newest record with `id` and release its offloaded payloads.
    ///
    /// Deleting an absent id is a no-op and returns `None`. Entries are kept
    /// while another record with the same id remains, since they share keys.
    pub async fn delete(&self, id: &str) -> Option<PersistOutcome> {
        let _writer = self.writer.lock().await;
        let (removed, snapshot) = {
            let mut records = self.write();
            let Some(position) = records.iter().position(|r| r.id() == id) else {
                debug!(collection = R::COLLECTION, id, "delete of unknown record ignored");
                return None;
            };
            let removed = records.remove(position);
            (removed, Arc::new(records.clone()))
        };
        debug!(collection = R::COLLECTION, id, "record deleted");
        let shared = snapshot.iter().any(|r| r.id() == id);

        let outcome = self.mirror(snapshot).await;
        // Entries go only after the snapshot stops referencing them.
        if !outcome.is_persisted() {
            debug!(collection = R::COLLECTION, id, "entries kept until a snapshot is written");
        } else if shared {
            debug!(collection = R::COLLECTION, id, "entries kept for a remaining record with the same id");
        } else {
            self.shim.release(&removed).await;
        }
        Some(outcome)
    }

    /// Resolve a payload slot of a record to its content.
    pub async fn payload(&self, id: &str, slot: &str) -> Option<String> {
        let payload = {
            let records = self.read();
            let record = records.iter().find(|r| r.id() == id)?;
            record
                .payloads()
                .into_iter()
                .find(|(name, _)| *name == slot)
                .map(|(_, payload)| payload.clone())?
        };
        self.shim.resolve(R::COLLECTION, &payload).await
    }

    /// Remove this collection's entries that no current record refers to.
    pub async fn sweep_orphans(&self) -> usize {
        let _writer = self.writer.lock().await;
        let records = self.records();
        let removed = self.shim.sweep_orphans(&records).await;
        info!(collection = R::COLLECTION, removed, "orphan sweep complete");
        removed
    }

    /// Write the current list again.
    pub async fn flush(&self) -> PersistOutcome {
        let _writer = self.writer.lock().await;
        let snapshot = Arc::new(self.records());
        self.mirror(snapshot).await
    }

    async fn mirror(&self, snapshot: Arc<Vec<R>>) -> PersistOutcome {
        self.changes.send_replace(snapshot.clone());
        let outcome = self.shim.persist(snapshot.as_slice()).await;
        match &outcome {
            PersistOutcome::Written(_) => debug!(collection = R::COLLECTION, %outcome, "mirrored"),
            PersistOutcome::Degraded(_) => info!(collection = R::COLLECTION, %outcome, "mirrored with degradation"),
            PersistOutcome::MemoryOnly(_) => warn!(collection = R::COLLECTION, %outcome, "mirror failed"),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ThresholdPolicy;
    use mohtasib_core::{MediaItem, MediaUpdate, PayloadRef, StoreScope};
    use mohtasib_test_utils::{MemoryLargeObjectStore, MockKvStore, fixtures};
    use tracing_test::traced_test;

    fn shim() -> Arc<SnapshotShim> {
        Arc::new(SnapshotShim::new(
            Arc::new(MockKvStore::new(StoreScope::Local, 1 << 20)),
            Arc::new(MockKvStore::new(StoreScope::Session, 1 << 20)),
            Arc::new(MemoryLargeObjectStore::new()),
            Arc::new(ThresholdPolicy::default()),
        ))
    }

    fn ids(store: &RecordStore<MediaItem>) -> Vec<String> {
        store.records().into_iter().map(|r| r.id).collect()
    }

    #[tokio::test]
    async fn add_prepends() {
        let store = RecordStore::<MediaItem>::new(shim(), vec![]);
        store.add(fixtures::photo("media-1", 8)).await;
        store.add(fixtures::photo("media-2", 8)).await;
        assert_eq!(ids(&store), vec!["media-2", "media-1"]);
    }

    #[tokio::test]
    #[traced_test]
    async fn duplicate_ids_are_prepended() {
        let store = RecordStore::<MediaItem>::new(shim(), vec![]);
        store.add(fixtures::photo("media-1", 8)).await;
        store.add(fixtures::photo("media-1", 8)).await;
        assert_eq!(store.len(), 2);
        assert!(logs_contain("adding a record with a duplicate id"));
    }

    #[tokio::test]
    async fn update_changes_only_named_fields() {
        let store = RecordStore::<MediaItem>::new(shim(), vec![fixtures::photo("media-1", 8)]);
        let before = store.get("media-1").unwrap();

        let outcome = store
            .update("media-1", vec![MediaUpdate::Title("Renamed".into())])
            .await
            .unwrap();
        assert!(outcome.is_some());

        let after = store.get("media-1").unwrap();
        assert_eq!(after.title, "Renamed");
        assert_eq!(after.description, before.description);
        assert_eq!(after.payload, before.payload);
        assert_eq!(after.date, before.date);
    }

    #[tokio::test]
    async fn invalid_patch_changes_nothing() {
        let store = RecordStore::<MediaItem>::new(shim(), vec![fixtures::photo("media-1", 8)]);
        let err = store
            .update("media-1", vec![MediaUpdate::Title(String::new())])
            .await
            .unwrap_err();
        assert!(matches!(err, MohtasibError::Validation { .. }));
        assert_eq!(store.get("media-1").unwrap().title, "Photo media-1");
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_noop() {
        let store = RecordStore::<MediaItem>::new(shim(), vec![fixtures::photo("media-1", 8)]);
        let outcome = store
            .update("missing", vec![MediaUpdate::Title("x".into())])
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(ids(&store), vec!["media-1"]);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = RecordStore::<MediaItem>::new(
            shim(),
            vec![fixtures::photo("media-2", 8), fixtures::photo("media-1", 8)],
        );
        assert!(store.delete("media-2").await.is_some());
        assert!(store.delete("media-2").await.is_none());
        assert_eq!(ids(&store), vec!["media-1"]);
    }

    #[tokio::test]
    async fn subscribers_see_every_list() {
        let store = RecordStore::<MediaItem>::new(shim(), vec![]);
        let mut rx = store.subscribe();
        store.add(fixtures::photo("media-1", 8)).await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
        store.delete("media-1").await;
        assert!(rx.borrow_and_update().is_empty());
    }

    #[tokio::test]
    async fn hydrate_restores_persisted_list() {
        let shim = shim();
        let store = RecordStore::<MediaItem>::new(shim.clone(), vec![]);
        let mut item = fixtures::photo("media-1", 8);
        item.is_loading = true;
        store.add(item).await;

        let reloaded = RecordStore::<MediaItem>::hydrate(shim);
        let restored = reloaded.get("media-1").unwrap();
        assert!(!restored.is_loading);
        assert_eq!(restored.payload, store.get("media-1").unwrap().payload);
    }

    #[tokio::test]
    async fn payload_resolves_inline_content() {
        let store = RecordStore::<MediaItem>::new(shim(), vec![fixtures::photo("media-1", 8)]);
        let data = store.payload("media-1", "payload").await.unwrap();
        assert!(matches!(PayloadRef::parse(&data), PayloadRef::Inline(_)));
        assert!(store.payload("media-1", "thumbnail").await.is_none());
        assert!(store.payload("missing", "payload").await.is_none());
    }
}
