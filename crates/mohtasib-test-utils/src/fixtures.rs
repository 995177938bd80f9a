// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record fixtures.

use chrono::NaiveDate;
use mohtasib_core::{MediaItem, MediaKind, Notification, NotificationCategory, PayloadRef};

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// An inline data-URL payload with `len` bytes of base64 body.
pub fn inline_payload(len: usize) -> PayloadRef {
    PayloadRef::Inline(format!("{DATA_URL_PREFIX}{}", "A".repeat(len)))
}

pub fn sample_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 15).unwrap_or_default()
}

fn media(id: &str, kind: MediaKind, payload_len: usize) -> MediaItem {
    MediaItem {
        id: id.to_string(),
        title: format!("{kind} {id}"),
        description: String::new(),
        kind,
        date: sample_date(),
        payload: inline_payload(payload_len),
        thumbnail: PayloadRef::Empty,
        is_loading: false,
        load_error: false,
    }
}

/// A photo titled `Photo <id>` with an inline payload of `payload_len` bytes.
pub fn photo(id: &str, payload_len: usize) -> MediaItem {
    media(id, MediaKind::Photo, payload_len)
}

/// A video titled `Video <id>` with an inline payload of `payload_len` bytes.
pub fn video(id: &str, payload_len: usize) -> MediaItem {
    media(id, MediaKind::Video, payload_len)
}

pub fn notification(id: &str) -> Notification {
    Notification {
        id: id.to_string(),
        title: format!("Notice {id}"),
        content: "Public hearings resume on Monday.".to_string(),
        date: sample_date(),
        category: NotificationCategory::Press,
        link: None,
        attachment: PayloadRef::Empty,
    }
}
