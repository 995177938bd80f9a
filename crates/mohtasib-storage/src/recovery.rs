// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recovery helpers for the top-level error boundary.
//!
//! When a command fails with a quota-shaped error, the boundary clears the
//! small-store keys that can be lost without losing records and asks the
//! user to retry.

use std::sync::LazyLock;

use mohtasib_core::MohtasibError;
use mohtasib_core::types::{LOCAL_PREFIX, SESSION_PREFIX};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::shim::{SnapshotShim, fallback_prefix};

/// Messages produced by quota exhaustion in any tier.
static QUOTA_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bquota\b|storage (?:is )?full|database or disk is full|no space left on device")
        .unwrap()
});

/// Whether an error message describes quota exhaustion.
pub fn is_quota_error_message(message: &str) -> bool {
    QUOTA_PATTERN.is_match(message)
}

/// Whether an error is, or reads like, quota exhaustion.
pub fn is_quota_error(err: &MohtasibError) -> bool {
    err.is_quota_exceeded() || is_quota_error_message(&err.to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    pub temp_keys_cleared: usize,
    pub fallback_entries_cleared: usize,
}

impl RecoveryReport {
    pub fn total(&self) -> usize {
        self.temp_keys_cleared + self.fallback_entries_cleared
    }
}

/// Clear temporary keys, and fallback entries of `collections` that the
/// stored snapshots no longer reference.
pub fn clear_recoverable_keys(shim: &SnapshotShim, collections: &[&str]) -> RecoveryReport {
    let mut report = RecoveryReport {
        temp_keys_cleared: shim.clear_temporary_keys(),
        ..RecoveryReport::default()
    };

    for &collection in collections {
        let prefix = fallback_prefix(collection);
        let snapshot = shim.local().get(collection).ok().flatten().unwrap_or_default();

        for store in [shim.local(), shim.session()] {
            let Ok(keys) = store.keys() else {
                continue;
            };
            for key in keys {
                let Some(entry) = key.strip_prefix(&prefix) else {
                    continue;
                };
                let referenced = snapshot.contains(&format!("\"{LOCAL_PREFIX}{entry}\""))
                    || snapshot.contains(&format!("\"{SESSION_PREFIX}{entry}\""));
                if referenced {
                    continue;
                }
                match store.remove(&key) {
                    Ok(()) => report.fallback_entries_cleared += 1,
                    Err(e) => debug!(%key, error = %e, "fallback removal failed"),
                }
            }
        }
    }

    info!(
        temp_keys = report.temp_keys_cleared,
        fallback_entries = report.fallback_entries_cleared,
        "recoverable keys cleared"
    );
    report
}
