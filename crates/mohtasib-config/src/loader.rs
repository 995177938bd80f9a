// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./mohtasib.toml` > `~/.config/mohtasib/mohtasib.toml` >
//! `/etc/mohtasib/mohtasib.toml`, with `MOHTASIB_*` environment overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::MohtasibConfig;

/// Sections that env keys are split on (`MOHTASIB_STORAGE_DATA_DIR` -> `storage.data_dir`).
const SECTIONS: &[&str] = &["app", "storage", "degradation", "maintenance", "forms"];

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/mohtasib/mohtasib.toml`
/// 3. `~/.config/mohtasib/mohtasib.toml`
/// 4. `./mohtasib.toml`
/// 5. `MOHTASIB_*` environment variables
pub fn load_config() -> Result<MohtasibConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<MohtasibConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MohtasibConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MohtasibConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MohtasibConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(MohtasibConfig::default()))
        .merge(Toml::file("/etc/mohtasib/mohtasib.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("mohtasib/mohtasib.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("mohtasib.toml"))
        .merge(env_provider())
}

/// Env provider mapping the first `_` after a known section name to a dot.
///
/// Uses `Env::map()` rather than `Env::split("_")`, since keys such as
/// `local_quota_bytes` contain underscores themselves.
fn env_provider() -> Env {
    Env::prefixed("MOHTASIB_").map(|key| {
        let key_str = key.as_str();
        for section in SECTIONS {
            if let Some(rest) = key_str.strip_prefix(section)
                && let Some(field) = rest.strip_prefix('_')
            {
                return format!("{section}.{field}").into();
            }
        }
        key_str.to_string().into()
    })
}
