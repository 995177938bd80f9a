// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The contract every persisted domain record implements.

use std::fmt::Debug;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::MohtasibError;
use crate::types::PayloadRef;

/// A domain entity held in a record list and mirrored to a snapshot.
///
/// Partial updates go through a typed [`Record::Patch`] so only known fields
/// can change, and each patch is validated before it is merged.
pub trait Record: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Field-level updates accepted by [`Record::apply_patch`].
    type Patch: Clone + Debug + Send + Sync;

    /// Snapshot key of this record type's collection.
    const COLLECTION: &'static str;

    /// Prefix used by [`crate::types::generate_record_id`].
    const ID_PREFIX: &'static str;

    fn id(&self) -> &str;

    /// Category used for per-category snapshot caps (`None` means uncapped).
    fn category(&self) -> Option<&'static str> {
        None
    }

    /// Named payload slots of this record.
    fn payloads(&self) -> Vec<(&'static str, &PayloadRef)> {
        Vec::new()
    }

    fn payloads_mut(&mut self) -> Vec<(&'static str, &mut PayloadRef)> {
        Vec::new()
    }

    /// Rejects patches that would leave the record invalid.
    fn validate_patch(patch: &Self::Patch) -> Result<(), MohtasibError>;

    /// Merges `patch` into `self`; fields it does not name are left untouched.
    fn apply_patch(&mut self, patch: Self::Patch);
}
