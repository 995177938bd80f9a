// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions at the seams between records and their storage.
//!
//! Stores are injected explicitly (usually as `Arc<dyn ...>`) so every
//! component can be exercised against a test double.

pub mod record;
pub mod storage;

pub use record::Record;
pub use storage::{KeyValueStore, LargeObjectStore};
