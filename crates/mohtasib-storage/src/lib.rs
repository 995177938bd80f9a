// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tiered persistence for the Mohtasib portal.
//!
//! Provides the SQLite-backed local key/value store, the in-memory session
//! store, a chunked large-object store on `tokio-rusqlite`, and the snapshot
//! shim that mirrors record lists into them, degrading gracefully when the
//! local store runs out of quota.

pub mod database;
pub mod kv;
pub mod large_object;
pub mod migrations;
pub mod policy;
pub mod record_store;
pub mod recovery;
pub mod report;
pub mod shim;

pub use database::Database;
pub use kv::{MemoryKvStore, SqliteKvStore};
pub use large_object::SqliteLargeObjectStore;
pub use policy::{DegradationPolicy, EvictionCandidate, ThresholdPolicy};
pub use record_store::RecordStore;
pub use report::StorageReport;
pub use shim::{PersistOutcome, PersistStats, SnapshotShim};
