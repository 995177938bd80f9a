// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Size-limited key/value tiers.
//!
//! Both tiers account usage as the UTF-8 byte length of key plus value and
//! refuse writes that would exceed their quota with
//! [`MohtasibError::QuotaExceeded`](mohtasib_core::MohtasibError::QuotaExceeded).

pub mod memory;
pub mod sqlite;

pub use memory::MemoryKvStore;
pub use sqlite::SqliteKvStore;

/// Bytes an entry occupies against a quota.
pub(crate) fn entry_size(key: &str, value: &str) -> u64 {
    (key.len() + value.len()) as u64
}
