// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Public notifications (press releases, tenders, vacancies, circulars).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::MohtasibError;
use crate::traits::Record;
use crate::types::{PayloadRef, generate_record_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum NotificationCategory {
    General,
    Press,
    Tender,
    Career,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub content: String,
    pub date: NaiveDate,
    pub category: NotificationCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Optional attached document (e.g. a scanned circular).
    #[serde(default, skip_serializing_if = "PayloadRef::is_empty")]
    pub attachment: PayloadRef,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        date: NaiveDate,
        category: NotificationCategory,
    ) -> Self {
        Self {
            id: generate_record_id(Self::ID_PREFIX),
            title: title.into(),
            content: content.into(),
            date,
            category,
            link: None,
            attachment: PayloadRef::Empty,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationUpdate {
    Title(String),
    Content(String),
    Date(NaiveDate),
    Category(NotificationCategory),
    Link(Option<String>),
    Attachment(PayloadRef),
}

impl Record for Notification {
    type Patch = Vec<NotificationUpdate>;

    const COLLECTION: &'static str = "notifications";
    const ID_PREFIX: &'static str = "notification";

    fn id(&self) -> &str {
        &self.id
    }

    fn payloads(&self) -> Vec<(&'static str, &PayloadRef)> {
        vec![("attachment", &self.attachment)]
    }

    fn payloads_mut(&mut self) -> Vec<(&'static str, &mut PayloadRef)> {
        vec![("attachment", &mut self.attachment)]
    }

    fn validate_patch(patch: &Self::Patch) -> Result<(), MohtasibError> {
        for update in patch {
            match update {
                NotificationUpdate::Title(title) if title.trim().is_empty() => {
                    return Err(MohtasibError::validation("title", "must not be empty"));
                }
                NotificationUpdate::Content(content) if content.trim().is_empty() => {
                    return Err(MohtasibError::validation("content", "must not be empty"));
                }
                NotificationUpdate::Link(Some(link))
                    if !(link.starts_with("https://") || link.starts_with("http://")) =>
                {
                    return Err(MohtasibError::validation(
                        "link",
                        "must be an http(s) URL",
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn apply_patch(&mut self, patch: Self::Patch) {
        for update in patch {
            match update {
                NotificationUpdate::Title(v) => self.title = v,
                NotificationUpdate::Content(v) => self.content = v,
                NotificationUpdate::Date(v) => self.date = v,
                NotificationUpdate::Category(v) => self.category = v,
                NotificationUpdate::Link(v) => self.link = v,
                NotificationUpdate::Attachment(v) => self.attachment = v,
            }
        }
    }
}
