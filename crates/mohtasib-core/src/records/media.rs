// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media gallery items (photos and videos).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::MohtasibError;
use crate::traits::Record;
use crate::types::{PayloadRef, generate_record_id};

const MAX_TITLE_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 2000;

/// Kind of media; also the category used for snapshot caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn category(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
        }
    }
}

/// A gallery entry.
///
/// `is_loading` and `load_error` are view state: they are never written to a
/// snapshot and come back `false` after a reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub date: NaiveDate,
    /// Image or video content, inline or by token.
    #[serde(default)]
    pub payload: PayloadRef,
    #[serde(default, skip_serializing_if = "PayloadRef::is_empty")]
    pub thumbnail: PayloadRef,
    #[serde(skip)]
    pub is_loading: bool,
    #[serde(skip)]
    pub load_error: bool,
}

impl MediaItem {
    /// Creates an item with a freshly generated id.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        kind: MediaKind,
        date: NaiveDate,
        payload: PayloadRef,
    ) -> Self {
        Self {
            id: generate_record_id(Self::ID_PREFIX),
            title: title.into(),
            description: description.into(),
            kind,
            date,
            payload,
            thumbnail: PayloadRef::Empty,
            is_loading: false,
            load_error: false,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: PayloadRef) -> Self {
        self.thumbnail = thumbnail;
        self
    }
}

/// One field-level change to a [`MediaItem`].
#[derive(Debug, Clone, PartialEq)]
pub enum MediaUpdate {
    Title(String),
    Description(String),
    Kind(MediaKind),
    Date(NaiveDate),
    Payload(PayloadRef),
    Thumbnail(PayloadRef),
    Loading(bool),
    LoadError(bool),
}

impl Record for MediaItem {
    type Patch = Vec<MediaUpdate>;

    const COLLECTION: &'static str = "media-items";
    const ID_PREFIX: &'static str = "media";

    fn id(&self) -> &str {
        &self.id
    }

    fn category(&self) -> Option<&'static str> {
        Some(self.kind.category())
    }

    fn payloads(&self) -> Vec<(&'static str, &PayloadRef)> {
        vec![("payload", &self.payload), ("thumbnail", &self.thumbnail)]
    }

    fn payloads_mut(&mut self) -> Vec<(&'static str, &mut PayloadRef)> {
        vec![
            ("payload", &mut self.payload),
            ("thumbnail", &mut self.thumbnail),
        ]
    }

    fn validate_patch(patch: &Self::Patch) -> Result<(), MohtasibError> {
        for update in patch {
            match update {
                MediaUpdate::Title(title) if title.trim().is_empty() => {
                    return Err(MohtasibError::validation("title", "must not be empty"));
                }
                MediaUpdate::Title(title) if title.chars().count() > MAX_TITLE_LEN => {
                    return Err(MohtasibError::validation(
                        "title",
                        format!("must be at most {MAX_TITLE_LEN} characters"),
                    ));
                }
                MediaUpdate::Description(text) if text.chars().count() > MAX_DESCRIPTION_LEN => {
                    return Err(MohtasibError::validation(
                        "description",
                        format!("must be at most {MAX_DESCRIPTION_LEN} characters"),
                    ));
                }
                MediaUpdate::Payload(PayloadRef::Empty) => {
                    return Err(MohtasibError::validation("payload", "must not be empty"));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn apply_patch(&mut self, patch: Self::Patch) {
        for update in patch {
            match update {
                MediaUpdate::Title(v) => self.title = v,
                MediaUpdate::Description(v) => self.description = v,
                MediaUpdate::Kind(v) => self.kind = v,
                MediaUpdate::Date(v) => self.date = v,
                MediaUpdate::Payload(v) => self.payload = v,
                MediaUpdate::Thumbnail(v) => self.thumbnail = v,
                MediaUpdate::Loading(v) => self.is_loading = v,
                MediaUpdate::LoadError(v) => self.load_error = v,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MediaItem {
        MediaItem {
            id: "media-1".into(),
            title: "Open court".into(),
            description: "Hearing in Lahore".into(),
            kind: MediaKind::Photo,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            payload: PayloadRef::Inline("data:image/png;base64,AAAA".into()),
            thumbnail: PayloadRef::Empty,
            is_loading: true,
            load_error: true,
        }
    }

    #[test]
    fn snapshot_json_uses_camel_case_and_type_key() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["type"], "Photo");
        assert_eq!(json["payload"], "data:image/png;base64,AAAA");
        assert!(json.get("isLoading").is_none());
        assert!(json.get("loadError").is_none());
        assert!(json.get("thumbnail").is_none());
    }

    #[test]
    fn transient_flags_reset_on_load() {
        let json = serde_json::to_string(&sample()).unwrap();
        let back: MediaItem = serde_json::from_str(&json).unwrap();
        assert!(!back.is_loading);
        assert!(!back.load_error);
        assert_eq!(back.title, "Open court");
    }

    #[test]
    fn patch_changes_only_named_fields() {
        let mut item = sample();
        let before = item.clone();
        item.apply_patch(vec![MediaUpdate::Title("Public hearing".into())]);
        assert_eq!(item.title, "Public hearing");
        assert_eq!(item.description, before.description);
        assert_eq!(item.payload, before.payload);
        assert_eq!(item.date, before.date);
    }

    #[test]
    fn empty_title_is_rejected() {
        let err = MediaItem::validate_patch(&vec![MediaUpdate::Title("  ".into())]).unwrap_err();
        assert!(matches!(err, MohtasibError::Validation { ref path, .. } if path == "title"));
    }

    #[test]
    fn clearing_payload_is_rejected() {
        assert!(MediaItem::validate_patch(&vec![MediaUpdate::Payload(PayloadRef::Empty)]).is_err());
        assert!(MediaItem::validate_patch(&vec![MediaUpdate::Thumbnail(PayloadRef::Empty)]).is_ok());
    }

    #[test]
    fn category_follows_kind() {
        let mut item = sample();
        assert_eq!(item.category(), Some("photo"));
        item.kind = MediaKind::Video;
        assert_eq!(item.category(), Some("video"));
    }
}
