// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests over the full stack: configuration, SQLite tiers,
//! record stores and form actions.
//!
//! Each test uses its own temporary data directory.

use std::sync::Arc;

use mohtasib_config::MohtasibConfig;
use mohtasib_core::{MediaItem, MediaUpdate, Notification, PayloadRef, Record};
use mohtasib_forms::{SubmissionStatus, submit_complaint};
use mohtasib_storage::recovery::clear_recoverable_keys;
use mohtasib_storage::{PersistOutcome, RecordStore, SnapshotShim, StorageReport};
use mohtasib_test_utils::fixtures;
use tempfile::TempDir;

fn config(dir: &TempDir, extra: &str) -> MohtasibConfig {
    let toml = format!(
        "[storage]\ndata_dir = \"{}\"\n{extra}",
        dir.path().display().to_string().replace('\\', "/")
    );
    mohtasib_config::load_and_validate_str(&toml).expect("valid config")
}

async fn open(config: &MohtasibConfig) -> Arc<SnapshotShim> {
    Arc::new(SnapshotShim::open(config).await.expect("storage opens"))
}

#[tokio::test]
async fn gallery_survives_restart_with_offloaded_video() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir, "");

    let video = fixtures::video("media-video", 400 * 1024);
    let PayloadRef::Inline(original) = video.payload.clone() else {
        unreachable!()
    };
    {
        let store = RecordStore::<MediaItem>::hydrate(open(&config).await);
        store.add(fixtures::photo("media-photo", 64)).await;
        let outcome = store.add(video).await;
        assert!(outcome.is_persisted(), "{outcome}");
        store
            .update("media-photo", vec![MediaUpdate::Title("Public hearing".into())])
            .await
            .unwrap();
    }

    let store = RecordStore::<MediaItem>::hydrate(open(&config).await);
    let records = store.records();
    assert_eq!(records[0].id, "media-video");
    assert_eq!(records[1].title, "Public hearing");
    assert!(records[0].payload.is_token());
    assert_eq!(store.payload("media-video", "payload").await, Some(original));
}

#[tokio::test]
async fn tight_quota_degrades_instead_of_failing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(
        &dir,
        "[degradation]\noffload_threshold_bytes = 4096\ninline_item_limit_bytes = 1024\n",
    );
    let shim = open(&config).await;
    let store = RecordStore::<MediaItem>::hydrate(shim.clone());

    let mut last = None;
    for n in 0..5 {
        last = Some(store.add(fixtures::photo(&format!("media-{n}"), 3000)).await);
    }
    let outcome = last.unwrap();
    assert!(matches!(outcome, PersistOutcome::Degraded(_)), "{outcome}");
    assert_eq!(store.len(), 5);

    let reloaded = RecordStore::<MediaItem>::hydrate(shim);
    for item in reloaded.records() {
        assert!(!item.payload.is_inline(), "{} stayed inline", item.id);
        assert!(reloaded.payload(&item.id, "payload").await.is_some());
    }
}

#[tokio::test]
async fn delete_then_maintenance_leaves_no_residue() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir, "");
    let shim = open(&config).await;
    let media = RecordStore::<MediaItem>::hydrate(shim.clone());
    let notices = RecordStore::<Notification>::hydrate(shim.clone());

    media.add(fixtures::video("media-1", 300 * 1024)).await;
    notices.add(fixtures::notification("notification-1")).await;
    media.delete("media-1").await;
    assert!(media.delete("media-1").await.is_none());

    assert_eq!(media.sweep_orphans().await, 0);
    let collections = [MediaItem::COLLECTION, Notification::COLLECTION];
    let recovered = clear_recoverable_keys(&shim, &collections);
    assert_eq!(recovered.fallback_entries_cleared, 0);

    let report = StorageReport::collect(&shim, &collections).await;
    assert_eq!(report.large_objects.entries, 0);
    assert!(report.collections[1].snapshot_bytes.is_some());
}

#[tokio::test]
async fn complaint_uses_configured_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir, "[forms]\ntracking_prefix = \"FOS\"\n");
    let input = serde_json::json!({
        "fullName": "Ayesha Khan",
        "cnic": "12345-1234567-1",
        "mobile": "0300-1234567",
        "address": "House 12, Street 4, Islamabad",
        "agency": "Sui Northern Gas",
        "complaintDetails": "Gas bills for three months were charged twice to the same account.",
        "declaration": true
    });

    let result = submit_complaint(&input, &config.forms);
    assert_eq!(result.status, SubmissionStatus::Success);
    assert!(result.tracking_id.unwrap().starts_with("FOS-"));
}
