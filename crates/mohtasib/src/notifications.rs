// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mohtasib notifications` subcommands.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use mohtasib_core::{
    MohtasibError, Notification, NotificationCategory, NotificationUpdate, PayloadRef, Record,
};
use mohtasib_storage::{RecordStore, SnapshotShim};

use crate::{output, payload};

#[derive(Subcommand, Debug)]
pub enum NotificationCommand {
    /// List notifications, newest first.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Publish a notification.
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long, value_parser = parse_category, default_value = "general")]
        category: NotificationCategory,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        link: Option<String>,
        /// Attach a document (stored like any other payload).
        #[arg(long)]
        attachment: Option<PathBuf>,
    },
    /// Change the named fields of a notification.
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long, value_parser = parse_category)]
        category: Option<NotificationCategory>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, conflicts_with = "clear_link")]
        link: Option<String>,
        #[arg(long)]
        clear_link: bool,
        #[arg(long)]
        attachment: Option<PathBuf>,
    },
    /// Delete a notification. Deleting an unknown id does nothing.
    Delete { id: String },
}

pub fn parse_category(value: &str) -> Result<NotificationCategory, String> {
    match value.to_ascii_lowercase().as_str() {
        "general" => Ok(NotificationCategory::General),
        "press" => Ok(NotificationCategory::Press),
        "tender" => Ok(NotificationCategory::Tender),
        "career" => Ok(NotificationCategory::Career),
        other => Err(format!(
            "unknown category `{other}` (expected general, press, tender or career)"
        )),
    }
}

pub async fn run_notifications(
    command: NotificationCommand,
    shim: Arc<SnapshotShim>,
    use_color: bool,
) -> Result<ExitCode, MohtasibError> {
    let store = RecordStore::<Notification>::hydrate(shim);

    match command {
        NotificationCommand::List { json } => {
            let records = store.records();
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(ExitCode::SUCCESS);
            }
            output::heading(&format!("notifications ({})", records.len()), use_color);
            for notice in &records {
                println!(
                    "    {:<29} {:<8} {}  {}",
                    notice.id,
                    notice.category.to_string(),
                    notice.date,
                    output::clip(&notice.title, 40)
                );
                if !notice.attachment.is_empty() {
                    println!("      attachment: {}", payload::describe(&notice.attachment));
                }
            }
            println!();
            Ok(ExitCode::SUCCESS)
        }
        NotificationCommand::Add {
            title,
            content,
            category,
            date,
            link,
            attachment,
        } => {
            Notification::validate_patch(&vec![
                NotificationUpdate::Title(title.clone()),
                NotificationUpdate::Content(content.clone()),
                NotificationUpdate::Link(link.clone()),
            ])?;
            let mut notice = Notification::new(
                title,
                content,
                date.unwrap_or_else(|| Utc::now().date_naive()),
                category,
            );
            notice.link = link;
            if let Some(path) = attachment {
                notice.attachment = PayloadRef::Inline(payload::read_data_url(&path)?);
            }
            let id = notice.id.clone();
            let outcome = store.add(notice).await;
            println!("  added {id}");
            Ok(output::outcome(&outcome, use_color))
        }
        NotificationCommand::Update {
            id,
            title,
            content,
            category,
            date,
            link,
            clear_link,
            attachment,
        } => {
            let mut patch = Vec::new();
            patch.extend(title.map(NotificationUpdate::Title));
            patch.extend(content.map(NotificationUpdate::Content));
            patch.extend(category.map(NotificationUpdate::Category));
            patch.extend(date.map(NotificationUpdate::Date));
            if clear_link {
                patch.push(NotificationUpdate::Link(None));
            } else if let Some(link) = link {
                patch.push(NotificationUpdate::Link(Some(link)));
            }
            if let Some(path) = attachment {
                patch.push(NotificationUpdate::Attachment(PayloadRef::Inline(
                    payload::read_data_url(&path)?,
                )));
            }
            if patch.is_empty() {
                return Err(MohtasibError::validation("update", "no fields to change"));
            }

            let outcome = store.update(&id, patch).await?.ok_or_else(|| {
                MohtasibError::NotFound {
                    kind: "notification".to_string(),
                    id: id.clone(),
                }
            })?;
            println!("  updated {id}");
            Ok(output::outcome(&outcome, use_color))
        }
        NotificationCommand::Delete { id } => match store.delete(&id).await {
            Some(outcome) => {
                println!("  deleted {id}");
                Ok(output::outcome(&outcome, use_color))
            }
            None => {
                println!("  no notification {id}");
                Ok(ExitCode::SUCCESS)
            }
        },
    }
}
