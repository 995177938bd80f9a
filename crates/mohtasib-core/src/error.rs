// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Mohtasib portal.

use thiserror::Error;

/// The primary error type used across the storage traits, record stores and forms.
#[derive(Debug, Error)]
pub enum MohtasibError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A key/value store rejected a write because its quota would be exceeded.
    ///
    /// Kept distinct from [`MohtasibError::Storage`] so callers can run the
    /// degradation pipeline instead of failing.
    #[error("quota exceeded writing `{key}`: needed {needed} bytes, {available} available")]
    QuotaExceeded {
        key: String,
        needed: u64,
        available: u64,
    },

    /// Snapshot (de)serialization failures.
    #[error("serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// A field-level validation failure (typed patches, form input).
    #[error("invalid {path}: {message}")]
    Validation { path: String, message: String },

    /// A record or entry was not found.
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MohtasibError {
    /// Shorthand for a validation error on `path`.
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wraps any error as a storage error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }

    /// Whether this error is the quota-exceeded condition.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}
