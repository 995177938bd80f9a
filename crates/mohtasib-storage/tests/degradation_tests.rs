// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Degradation pipeline behavior against store doubles.

use std::sync::Arc;

use mohtasib_config::model::DegradationConfig;
use mohtasib_core::{KeyValueStore, LargeObjectStore, MediaItem, MediaUpdate, PayloadRef, StoreScope};
use mohtasib_storage::{PersistOutcome, RecordStore, SnapshotShim, ThresholdPolicy};
use mohtasib_test_utils::{MemoryLargeObjectStore, MockKvStore, fixtures};
use proptest::prelude::*;

struct Stores {
    local: Arc<MockKvStore>,
    session: Arc<MockKvStore>,
    large: Arc<MemoryLargeObjectStore>,
    shim: Arc<SnapshotShim>,
}

fn stores(local_quota: u64, degradation: DegradationConfig) -> Stores {
    let local = Arc::new(MockKvStore::new(StoreScope::Local, local_quota));
    let session = Arc::new(MockKvStore::new(StoreScope::Session, local_quota));
    let large = Arc::new(MemoryLargeObjectStore::new());
    let shim = Arc::new(SnapshotShim::new(
        local.clone(),
        session.clone(),
        large.clone(),
        Arc::new(ThresholdPolicy::from_config(&degradation)),
    ));
    Stores {
        local,
        session,
        large,
        shim,
    }
}

fn low_threshold() -> DegradationConfig {
    DegradationConfig {
        offload_threshold_bytes: 1000,
        inline_item_limit_bytes: 100_000,
        ..DegradationConfig::default()
    }
}

fn stored_items(local: &MockKvStore) -> Vec<MediaItem> {
    serde_json::from_str(&local.get("media-items").unwrap().expect("snapshot written")).unwrap()
}

#[tokio::test]
async fn reduced_snapshot_is_smaller_and_uses_tokens_for_fallback_backed_items() {
    let s = stores(1 << 20, low_threshold());
    let items = vec![
        fixtures::photo("media-3", 600),
        fixtures::photo("media-2", 600),
        fixtures::photo("media-1", 600),
    ];
    let PayloadRef::Inline(data) = &items[2].payload else {
        unreachable!()
    };
    s.local.set("media-items-image-media-1", data).unwrap();

    let outcome = s.shim.persist(&items).await;
    let PersistOutcome::Degraded(stats) = outcome else {
        panic!("expected degraded outcome, got {outcome:?}");
    };
    assert!(stats.written_bytes < stats.naive_bytes);
    assert_eq!(stats.dropped, 0);
    assert_eq!(stats.reused, 1);
    assert_eq!(stats.offloaded, 2);

    let stored = stored_items(&s.local);
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[2].payload, PayloadRef::Local("media-1".into()));
    assert_eq!(stored[0].payload, PayloadRef::LargeObject("media-3".into()));
    assert_eq!(stored[1].payload, PayloadRef::LargeObject("media-2".into()));
    for item in &stored {
        assert!(item.payload.is_token(), "{} kept an inline payload", item.id);
    }
}

#[tokio::test]
async fn quota_failure_retries_once_and_keeps_data_in_memory() {
    let s = stores(1 << 20, DegradationConfig::default());
    s.local.fail_writes_to("media-items");
    let store = RecordStore::<MediaItem>::new(s.shim.clone(), vec![]);

    let outcome = store.add(fixtures::photo("media-1", 64)).await;

    assert!(matches!(outcome, PersistOutcome::MemoryOnly(ref stats) if stats.retried));
    assert_eq!(s.local.set_calls("media-items"), 2);
    assert_eq!(store.len(), 1);
    assert!(s.local.get("media-items").unwrap().is_none());
}

#[tokio::test]
async fn ninety_megabyte_video_goes_to_large_object_store() {
    let s = stores(5 * 1024 * 1024, DegradationConfig::default());
    let items = vec![fixtures::video("media-1", 90 * 1024 * 1024)];
    let original_len = items[0].payload.inline_len();

    let outcome = s.shim.persist(&items).await;
    assert!(matches!(outcome, PersistOutcome::Degraded(_)), "got {outcome:?}");

    assert!(s.local.largest_write() < 1024 * 1024, "raw payload reached the small store");
    assert!(s.session.largest_write() < 1024 * 1024);
    let stored = stored_items(&s.local);
    assert_eq!(stored[0].payload, PayloadRef::LargeObject("media-1".into()));
    assert_eq!(stored[0].title, "Video media-1");
    assert_eq!(
        s.large.peek("media-items/media-1").map(|p| p.len()),
        Some(original_len)
    );
}

#[tokio::test]
async fn category_caps_keep_most_recent_records() {
    let mut degradation = low_threshold();
    degradation.max_videos = 10;
    let s = stores(1 << 20, degradation);
    let items: Vec<MediaItem> = (0..12)
        .rev()
        .map(|n| fixtures::video(&format!("media-{n}"), 10))
        .collect();

    let outcome = s.shim.persist(&items).await;
    assert_eq!(outcome.stats().capped, 2);

    let stored = stored_items(&s.local);
    let ids: Vec<&str> = stored.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids.len(), 10);
    assert_eq!(ids[0], "media-11");
    assert!(!ids.contains(&"media-0"));
    assert!(!ids.contains(&"media-1"));
}

#[tokio::test]
async fn emergency_pass_drops_largest_oldest_inline_payload() {
    let degradation = DegradationConfig {
        offload_threshold_bytes: 1_000_000,
        inline_item_limit_bytes: 1_000_000,
        fallback_item_limit_bytes: 0,
        ..DegradationConfig::default()
    };
    let s = stores(3000, degradation);
    s.large.set_failing(true);
    let items = vec![
        fixtures::photo("media-3", 1200),
        fixtures::photo("media-2", 1200),
        fixtures::photo("media-1", 1200),
    ];

    let outcome = s.shim.persist(&items).await;
    let PersistOutcome::Degraded(stats) = outcome else {
        panic!("expected degraded outcome, got {outcome:?}");
    };
    assert!(stats.retried);
    assert_eq!(stats.dropped, 1);

    let stored = stored_items(&s.local);
    assert!(stored[0].payload.is_inline());
    assert!(stored[1].payload.is_inline());
    assert_eq!(stored[2].payload, PayloadRef::Empty);
    assert_eq!(stored[2].title, "Photo media-1");
}

#[tokio::test]
async fn emergency_pass_evicts_unreferenced_entries() {
    let s = stores(2000, DegradationConfig::default());
    s.local
        .set("media-items-image-orphan", &"x".repeat(1900))
        .unwrap();
    s.large.put("media-items/orphan", "old payload").await;
    s.large.put("notifications/other", "not ours").await;

    let outcome = s.shim.persist(&[fixtures::photo("media-1", 300)]).await;
    assert!(outcome.is_persisted(), "got {outcome:?}");
    assert!(outcome.stats().evicted >= 2);

    assert!(s.local.get("media-items-image-orphan").unwrap().is_none());
    assert!(!s.large.contains("media-items/orphan").await);
    assert!(s.large.contains("notifications/other").await);
}

#[tokio::test]
async fn fallback_store_used_when_large_object_store_fails() {
    let degradation = DegradationConfig {
        offload_threshold_bytes: 500,
        ..DegradationConfig::default()
    };
    let s = stores(1 << 20, degradation);
    s.large.set_failing(true);

    s.shim
        .persist(&[fixtures::photo("media-2", 400), fixtures::photo("media-1", 400)])
        .await;

    let stored = stored_items(&s.local);
    assert_eq!(stored[0].payload, PayloadRef::Local("media-2".into()));
    assert!(s.local.get("media-items-image-media-2").unwrap().is_some());
}

#[tokio::test]
async fn unchanged_payloads_are_not_copied_twice() {
    let s = stores(1 << 20, low_threshold());
    let items = vec![fixtures::photo("media-2", 800), fixtures::photo("media-1", 800)];

    s.shim.persist(&items).await;
    let first_puts = s.large.put_calls();
    let outcome = s.shim.persist(&items).await;

    assert_eq!(s.large.put_calls(), first_puts);
    assert_eq!(outcome.stats().reused, 2);
}

#[tokio::test]
async fn delete_releases_offloaded_payload() {
    let s = stores(5 * 1024 * 1024, DegradationConfig::default());
    let store = RecordStore::<MediaItem>::new(s.shim.clone(), vec![]);
    store.add(fixtures::video("media-1", 300 * 1024)).await;
    assert!(s.large.contains("media-items/media-1").await);

    store.delete("media-1").await;
    assert!(s.large.is_empty());
    assert!(stored_items(&s.local).is_empty());
}

#[tokio::test]
async fn hydrated_store_resolves_tokens() {
    let s = stores(5 * 1024 * 1024, DegradationConfig::default());
    let store = RecordStore::<MediaItem>::new(s.shim.clone(), vec![]);
    let video = fixtures::video("media-1", 300 * 1024);
    let PayloadRef::Inline(original) = video.payload.clone() else {
        unreachable!()
    };
    store.add(video).await;

    let reloaded = RecordStore::<MediaItem>::hydrate(s.shim.clone());
    let item = reloaded.get("media-1").unwrap();
    assert_eq!(item.payload, PayloadRef::LargeObject("media-1".into()));
    assert_eq!(reloaded.payload("media-1", "payload").await, Some(original));
}

#[tokio::test]
async fn sweep_orphans_keeps_referenced_entries() {
    let s = stores(5 * 1024 * 1024, DegradationConfig::default());
    let store = RecordStore::<MediaItem>::new(s.shim.clone(), vec![]);
    store.add(fixtures::video("media-1", 300 * 1024)).await;
    s.large.put("media-items/leaked", "x").await;
    s.session.set("media-items-image-leaked", "y").unwrap();

    assert_eq!(store.sweep_orphans().await, 2);
    assert!(s.large.contains("media-items/media-1").await);
}

#[tokio::test]
async fn concurrent_adds_all_land_in_the_snapshot() {
    let s = stores(1 << 20, DegradationConfig::default());
    let store = Arc::new(RecordStore::<MediaItem>::new(s.shim.clone(), vec![]));

    let handles: Vec<_> = (0..16)
        .map(|n| {
            let store = store.clone();
            tokio::spawn(async move { store.add(fixtures::photo(&format!("media-{n}"), 16)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.len(), 16);
    assert_eq!(stored_items(&s.local).len(), 16);
}

#[tokio::test]
async fn failed_write_keeps_the_fallback_entry_the_stored_snapshot_names() {
    let degradation = DegradationConfig {
        offload_threshold_bytes: 500,
        ..DegradationConfig::default()
    };
    let s = stores(1 << 20, degradation);
    let first = fixtures::photo("media-1", 600);
    s.large.set_failing(true);
    s.shim.persist(std::slice::from_ref(&first)).await;
    assert_eq!(stored_items(&s.local)[0].payload, PayloadRef::Local("media-1".into()));

    s.large.set_failing(false);
    s.local.fail_writes_to("media-items");
    let outcome = s.shim.persist(&[fixtures::photo("media-1", 700)]).await;
    assert!(!outcome.is_persisted(), "got {outcome:?}");

    let stored = stored_items(&s.local);
    assert_eq!(stored[0].payload, PayloadRef::Local("media-1".into()));
    let resolved = s.shim.resolve("media-items", &stored[0].payload).await;
    assert_eq!(resolved, Some(first.payload.to_string()));

    s.local.heal("media-items");
    let outcome = s.shim.persist(&[fixtures::photo("media-1", 700)]).await;
    assert!(outcome.is_persisted(), "got {outcome:?}");
    assert_eq!(stored_items(&s.local)[0].payload, PayloadRef::LargeObject("media-1".into()));
    assert!(s.local.get("media-items-image-media-1").unwrap().is_none());
}

#[tokio::test]
async fn failed_update_keeps_the_previous_payload_resolvable() {
    let degradation = DegradationConfig {
        offload_threshold_bytes: 500,
        ..DegradationConfig::default()
    };
    let s = stores(1 << 20, degradation);
    let store = RecordStore::<MediaItem>::new(s.shim.clone(), vec![]);
    let photo = fixtures::photo("media-1", 600);
    let original = photo.payload.to_string();
    s.large.set_failing(true);
    store.add(photo).await;

    s.large.set_failing(false);
    s.local.fail_writes_to("media-items");
    let outcome = store
        .update("media-1", vec![MediaUpdate::Payload(fixtures::inline_payload(700))])
        .await
        .unwrap()
        .unwrap();
    assert!(!outcome.is_persisted());

    let reloaded = RecordStore::<MediaItem>::hydrate(s.shim.clone());
    assert_eq!(reloaded.get("media-1").unwrap().payload, PayloadRef::Local("media-1".into()));
    assert_eq!(reloaded.payload("media-1", "payload").await, Some(original));
}

#[tokio::test]
async fn failed_delete_keeps_offloaded_entries() {
    let s = stores(5 * 1024 * 1024, DegradationConfig::default());
    let store = RecordStore::<MediaItem>::new(s.shim.clone(), vec![]);
    store.add(fixtures::video("media-1", 300 * 1024)).await;

    s.local.fail_writes_to("media-items");
    let outcome = store.delete("media-1").await.unwrap();
    assert!(!outcome.is_persisted());
    assert!(store.is_empty());
    assert!(s.large.contains("media-items/media-1").await);

    let stored = stored_items(&s.local);
    assert_eq!(stored[0].payload, PayloadRef::LargeObject("media-1".into()));
    assert!(s.shim.resolve("media-items", &stored[0].payload).await.is_some());
}

#[tokio::test]
async fn deleting_one_of_two_duplicates_keeps_shared_entries() {
    let s = stores(5 * 1024 * 1024, DegradationConfig::default());
    let store = RecordStore::<MediaItem>::new(s.shim.clone(), vec![]);
    let video = fixtures::video("media-1", 300 * 1024);
    let PayloadRef::Inline(original) = video.payload.clone() else {
        unreachable!()
    };
    store.add(video.clone()).await;
    store.add(video).await;

    assert!(store.delete("media-1").await.unwrap().is_persisted());
    assert_eq!(store.len(), 1);

    let reloaded = RecordStore::<MediaItem>::hydrate(s.shim.clone());
    assert_eq!(reloaded.get("media-1").unwrap().payload, PayloadRef::LargeObject("media-1".into()));
    assert_eq!(reloaded.payload("media-1", "payload").await, Some(original));

    assert!(store.delete("media-1").await.unwrap().is_persisted());
    assert!(s.large.is_empty());
}

proptest! {
    #[test]
    fn small_lists_round_trip_exactly(titles in proptest::collection::vec("[A-Za-z ]{1,40}", 0..8)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let s = stores(1 << 20, DegradationConfig::default());
        let items: Vec<MediaItem> = titles
            .iter()
            .enumerate()
            .map(|(n, title)| {
                let mut item = fixtures::photo(&format!("media-{n}"), 32);
                item.title = title.clone();
                item
            })
            .collect();

        let outcome = runtime.block_on(s.shim.persist(&items));
        prop_assert!(matches!(outcome, PersistOutcome::Written(_)));
        prop_assert_eq!(s.shim.load::<MediaItem>(), items);
    }
}
