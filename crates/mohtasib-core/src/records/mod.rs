// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain records curated through the admin panel.

pub mod media;
pub mod notification;

pub use media::{MediaItem, MediaKind, MediaUpdate};
pub use notification::{Notification, NotificationCategory, NotificationUpdate};
