// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks the constraints serde cannot express: non-empty paths, quota and
//! threshold ordering, and non-zero caps.

use mohtasib_core::{MediaItem, Notification, Record};

use crate::diagnostic::ConfigError;
use crate::model::MohtasibConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Collections whose snapshot and fallback keys share the small stores.
const COLLECTIONS: &[&str] = &[MediaItem::COLLECTION, Notification::COLLECTION];

/// The collection whose keys `prefix` would match, if any.
///
/// A collection owns its snapshot key and every `<collection>-image-` key.
fn collection_matched_by(prefix: &str) -> Option<&'static str> {
    COLLECTIONS.iter().copied().find(|collection| {
        let fallback = format!("{collection}-image-");
        fallback.starts_with(prefix) || prefix.starts_with(&fallback)
    })
}

/// Validate a deserialized configuration.
///
/// Collects every violation instead of failing fast.
pub fn validate_config(config: &MohtasibConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let level = config.app.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        fail(format!(
            "app.log_level `{}` is not one of {}",
            config.app.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    let storage = &config.storage;
    if storage.data_dir.trim().is_empty() {
        fail("storage.data_dir must not be empty".to_string());
    }
    if storage.local_quota_bytes == 0 {
        fail("storage.local_quota_bytes must be greater than 0".to_string());
    }
    if storage.session_quota_bytes == 0 {
        fail("storage.session_quota_bytes must be greater than 0".to_string());
    }
    if storage.chunk_size_bytes == 0 {
        fail("storage.chunk_size_bytes must be greater than 0".to_string());
    }
    if storage.large_object_quota_bytes < storage.local_quota_bytes {
        fail(format!(
            "storage.large_object_quota_bytes ({}) must be at least storage.local_quota_bytes ({})",
            storage.large_object_quota_bytes, storage.local_quota_bytes
        ));
    }

    let degradation = &config.degradation;
    if degradation.offload_threshold_bytes == 0 {
        fail("degradation.offload_threshold_bytes must be greater than 0".to_string());
    }
    if degradation.offload_threshold_bytes > storage.local_quota_bytes {
        fail(format!(
            "degradation.offload_threshold_bytes ({}) must not exceed storage.local_quota_bytes ({})",
            degradation.offload_threshold_bytes, storage.local_quota_bytes
        ));
    }
    if degradation.inline_item_limit_bytes > degradation.offload_threshold_bytes {
        fail(format!(
            "degradation.inline_item_limit_bytes ({}) must not exceed degradation.offload_threshold_bytes ({})",
            degradation.inline_item_limit_bytes, degradation.offload_threshold_bytes
        ));
    }
    if degradation.max_videos == 0 {
        fail("degradation.max_videos must be at least 1".to_string());
    }
    if degradation.max_photos == 0 {
        fail("degradation.max_photos must be at least 1".to_string());
    }
    for (i, prefix) in degradation.temp_key_prefixes.iter().enumerate() {
        if prefix.is_empty() {
            fail(format!(
                "degradation.temp_key_prefixes[{i}] must not be empty (it would match every key)"
            ));
        } else if let Some(collection) = collection_matched_by(prefix) {
            fail(format!(
                "degradation.temp_key_prefixes[{i}] `{prefix}` would match the `{collection}` snapshot or its fallback entries"
            ));
        }
    }

    if config.maintenance.report_interval_secs == 0 {
        fail("maintenance.report_interval_secs must be at least 1".to_string());
    }

    let prefix = &config.forms.tracking_prefix;
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_uppercase()) {
        fail(format!(
            "forms.tracking_prefix `{prefix}` must be non-empty uppercase ASCII letters"
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
