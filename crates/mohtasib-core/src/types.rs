// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the storage traits and the domain records.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use strum::{Display, EnumString};

/// Token prefix for payloads held in the persistent small store.
pub const LOCAL_PREFIX: &str = "local:";
/// Token prefix for payloads held in the session-scoped small store.
pub const SESSION_PREFIX: &str = "session:";
/// Token prefix for payloads held in the large-object store.
pub const LARGE_OBJECT_PREFIX: &str = "indexeddb:";

/// Where a small key/value store lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StoreScope {
    /// Survives restarts (the "local storage" tier).
    Local,
    /// Lives as long as the process (the "session storage" tier).
    Session,
}

/// A payload field of a record: either the encoded content itself or an
/// indirection token naming the store that holds it.
///
/// Serialized as a plain string so snapshots keep the `local:<id>`,
/// `session:<id>` and `indexeddb:<id>` token grammar.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum PayloadRef {
    #[default]
    Empty,
    Inline(String),
    Local(String),
    Session(String),
    LargeObject(String),
}

impl PayloadRef {
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::Empty;
        }
        if let Some(id) = raw.strip_prefix(LOCAL_PREFIX) {
            return Self::Local(id.to_string());
        }
        if let Some(id) = raw.strip_prefix(SESSION_PREFIX) {
            return Self::Session(id.to_string());
        }
        if let Some(id) = raw.strip_prefix(LARGE_OBJECT_PREFIX) {
            return Self::LargeObject(id.to_string());
        }
        Self::Inline(raw.to_string())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline(_))
    }

    /// True for the three token variants.
    pub fn is_token(&self) -> bool {
        matches!(
            self,
            Self::Local(_) | Self::Session(_) | Self::LargeObject(_)
        )
    }

    /// Byte length of the inline content, zero for tokens.
    pub fn inline_len(&self) -> usize {
        match self {
            Self::Inline(data) => data.len(),
            _ => 0,
        }
    }
}

impl From<String> for PayloadRef {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

// Written through `Display` so inline content is never copied first.
impl Serialize for PayloadRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Inline(data) => serializer.serialize_str(data),
            _ => serializer.collect_str(self),
        }
    }
}

impl fmt::Display for PayloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Inline(data) => f.write_str(data),
            Self::Local(id) => write!(f, "{LOCAL_PREFIX}{id}"),
            Self::Session(id) => write!(f, "{SESSION_PREFIX}{id}"),
            Self::LargeObject(id) => write!(f, "{LARGE_OBJECT_PREFIX}{id}"),
        }
    }
}

/// Generates a client-side record id: `<prefix>-<unix millis>`.
pub fn generate_record_id(prefix: &str) -> String {
    format!("{prefix}-{}", chrono::Utc::now().timestamp_millis())
}

/// Aggregate usage of the large-object store, for diagnostic display only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargeObjectUsage {
    /// Number of stored entries.
    pub entries: u64,
    /// Sum of the payload sizes of all entries.
    pub payload_bytes: u64,
    /// Bytes used by the containing database on disk.
    pub database_bytes: u64,
    /// Configured capacity of the store.
    pub quota_bytes: u64,
}

/// Usage of one small key/value store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueUsage {
    pub scope: StoreScope,
    pub keys: u64,
    pub used_bytes: u64,
    pub quota_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_each_token_prefix() {
        assert_eq!(PayloadRef::parse(""), PayloadRef::Empty);
        assert_eq!(
            PayloadRef::parse("local:media-1"),
            PayloadRef::Local("media-1".into())
        );
        assert_eq!(
            PayloadRef::parse("session:media-1"),
            PayloadRef::Session("media-1".into())
        );
        assert_eq!(
            PayloadRef::parse("indexeddb:media-1"),
            PayloadRef::LargeObject("media-1".into())
        );
        assert_eq!(
            PayloadRef::parse("data:image/png;base64,AAAA"),
            PayloadRef::Inline("data:image/png;base64,AAAA".into())
        );
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&PayloadRef::LargeObject("v-1".into())).unwrap();
        assert_eq!(json, r#""indexeddb:v-1""#);
        let back: PayloadRef = serde_json::from_str(r#""session:p-2""#).unwrap();
        assert_eq!(back, PayloadRef::Session("p-2".into()));
    }

    #[test]
    fn inline_and_empty_serialize_verbatim() {
        let inline = PayloadRef::Inline("data:video/mp4;base64,AAAA\"q".into());
        assert_eq!(
            serde_json::to_string(&inline).unwrap(),
            r#""data:video/mp4;base64,AAAA\"q""#
        );
        assert_eq!(serde_json::to_string(&PayloadRef::Empty).unwrap(), r#""""#);
    }

    #[test]
    fn store_scope_display() {
        assert_eq!(StoreScope::Local.to_string(), "local");
        assert_eq!(StoreScope::Session.to_string(), "session");
    }

    #[test]
    fn record_id_has_prefix_and_millis() {
        let id = generate_record_id("media");
        let (prefix, millis) = id.split_once('-').unwrap();
        assert_eq!(prefix, "media");
        assert!(millis.parse::<i64>().is_ok());
    }

    proptest! {
        #[test]
        fn token_display_parses_back(id in "[a-z0-9.-]{1,24}") {
            for payload in [
                PayloadRef::Local(id.clone()),
                PayloadRef::Session(id.clone()),
                PayloadRef::LargeObject(id.clone()),
            ] {
                prop_assert_eq!(PayloadRef::parse(&payload.to_string()), payload);
            }
        }
    }
}
