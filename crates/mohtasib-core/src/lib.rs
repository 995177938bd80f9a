// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Mohtasib portal data layer.
//!
//! This crate provides the error type, the domain records curated through the
//! admin panel, the payload indirection tokens, and the storage traits that
//! the persistence crates implement.

pub mod error;
pub mod records;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::MohtasibError;
pub use records::{MediaItem, MediaKind, MediaUpdate, Notification, NotificationCategory, NotificationUpdate};
pub use traits::{KeyValueStore, LargeObjectStore, Record};
pub use types::{KeyValueUsage, LargeObjectUsage, PayloadRef, StoreScope, generate_record_id};
