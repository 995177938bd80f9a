// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage usage report for the diagnostics display. Read-only.

use mohtasib_core::{KeyValueUsage, LargeObjectUsage, MohtasibError, StoreScope};
use serde::Serialize;
use tracing::error;

use crate::shim::SnapshotShim;

/// Size of one collection's stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionUsage {
    pub collection: String,
    pub snapshot_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageReport {
    pub local: KeyValueUsage,
    pub session: KeyValueUsage,
    pub large_objects: LargeObjectUsage,
    pub collections: Vec<CollectionUsage>,
}

fn kv_usage(
    usage: Result<KeyValueUsage, MohtasibError>,
    scope: StoreScope,
    quota: u64,
) -> KeyValueUsage {
    usage.unwrap_or_else(|e| {
        error!(%scope, error = %e, "usage query failed");
        KeyValueUsage {
            scope,
            keys: 0,
            used_bytes: 0,
            quota_bytes: quota,
        }
    })
}

impl StorageReport {
    /// Gather usage of every tier and of each of `collections`.
    pub async fn collect(shim: &SnapshotShim, collections: &[&str]) -> Self {
        let local = kv_usage(shim.local().usage(), StoreScope::Local, shim.local().quota_bytes());
        let session = kv_usage(
            shim.session().usage(),
            StoreScope::Session,
            shim.session().quota_bytes(),
        );
        let large_objects = shim.large_objects().usage().await;
        let collections = collections
            .iter()
            .map(|&collection| CollectionUsage {
                collection: collection.to_string(),
                snapshot_bytes: shim.snapshot_bytes(collection),
            })
            .collect();

        Self {
            local,
            session,
            large_objects,
            collections,
        }
    }
}

/// Percentage of `quota` used, 0 for a zero quota.
pub fn percent_used(used: u64, quota: u64) -> f64 {
    if quota == 0 {
        0.0
    } else {
        used as f64 * 100.0 / quota as f64
    }
}

/// Human-readable byte count (`1.5 MiB`).
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
