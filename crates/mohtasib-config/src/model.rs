// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at startup instead of silently falling back to a default.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

/// Top-level configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MohtasibConfig {
    /// Process-wide settings (logging).
    #[serde(default)]
    pub app: AppConfig,

    /// Locations and quotas of the storage tiers.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Thresholds driving the snapshot degradation pipeline.
    #[serde(default)]
    pub degradation: DegradationConfig,

    /// Manual maintenance and diagnostics.
    #[serde(default)]
    pub maintenance: MaintenanceConfig,

    /// Complaint and feedback form settings.
    #[serde(default)]
    pub forms: FormsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage tier configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding the local key/value database and the large-object database.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Capacity of the persistent small store.
    #[serde(default = "default_small_quota")]
    pub local_quota_bytes: u64,

    /// Capacity of the session-scoped small store.
    #[serde(default = "default_small_quota")]
    pub session_quota_bytes: u64,

    /// Capacity of the large-object store.
    #[serde(default = "default_large_object_quota")]
    pub large_object_quota_bytes: u64,

    /// Large payloads are split into chunks of this size.
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: u64,

    /// Enable WAL journaling for the SQLite-backed tiers.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            local_quota_bytes: default_small_quota(),
            session_quota_bytes: default_small_quota(),
            large_object_quota_bytes: default_large_object_quota(),
            chunk_size_bytes: default_chunk_size(),
            wal_mode: default_wal_mode(),
        }
    }
}

impl StorageConfig {
    pub fn local_db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("local.db")
    }

    pub fn large_object_db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("objects.db")
    }
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("mohtasib"))
        .unwrap_or_else(|| PathBuf::from(".mohtasib"))
        .to_string_lossy()
        .to_string()
}

fn default_small_quota() -> u64 {
    5 * MIB
}

fn default_large_object_quota() -> u64 {
    512 * MIB
}

fn default_chunk_size() -> u64 {
    MIB
}

fn default_wal_mode() -> bool {
    true
}

/// Degradation pipeline thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DegradationConfig {
    /// Snapshots larger than this trigger the size-reduction pass before writing.
    #[serde(default = "default_offload_threshold")]
    pub offload_threshold_bytes: u64,

    /// Inline payloads larger than this are always moved out of the snapshot.
    #[serde(default = "default_inline_item_limit")]
    pub inline_item_limit_bytes: u64,

    /// Largest payload accepted as a single fallback entry in a small store.
    #[serde(default = "default_fallback_item_limit")]
    pub fallback_item_limit_bytes: u64,

    /// Most recent video records kept in a reduced snapshot.
    #[serde(default = "default_max_videos")]
    pub max_videos: usize,

    /// Most recent photo records kept in a reduced snapshot.
    #[serde(default = "default_max_photos")]
    pub max_photos: usize,

    /// Small-store keys with these prefixes are disposable and cleared under pressure.
    #[serde(default = "default_temp_key_prefixes")]
    pub temp_key_prefixes: Vec<String>,
}

impl Default for DegradationConfig {
    fn default() -> Self {
        Self {
            offload_threshold_bytes: default_offload_threshold(),
            inline_item_limit_bytes: default_inline_item_limit(),
            fallback_item_limit_bytes: default_fallback_item_limit(),
            max_videos: default_max_videos(),
            max_photos: default_max_photos(),
            temp_key_prefixes: default_temp_key_prefixes(),
        }
    }
}

fn default_offload_threshold() -> u64 {
    2 * MIB
}

fn default_inline_item_limit() -> u64 {
    256 * KIB
}

fn default_fallback_item_limit() -> u64 {
    MIB
}

fn default_max_videos() -> usize {
    10
}

fn default_max_photos() -> usize {
    50
}

fn default_temp_key_prefixes() -> Vec<String> {
    vec!["temp-".to_string(), "cache-".to_string(), "debug-".to_string()]
}

/// Maintenance and diagnostics.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MaintenanceConfig {
    /// Default age for `storage sweep`.
    #[serde(default = "default_sweep_max_age_days")]
    pub sweep_max_age_days: u64,

    /// Polling interval of `storage report --watch`.
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            sweep_max_age_days: default_sweep_max_age_days(),
            report_interval_secs: default_report_interval_secs(),
        }
    }
}

fn default_sweep_max_age_days() -> u64 {
    30
}

fn default_report_interval_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FormsConfig {
    /// Prefix of complaint tracking ids (`<prefix>-YYYYMMDD-NNNNN`).
    #[serde(default = "default_tracking_prefix")]
    pub tracking_prefix: String,
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            tracking_prefix: default_tracking_prefix(),
        }
    }
}

fn default_tracking_prefix() -> String {
    "WM".to_string()
}
