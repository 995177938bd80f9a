// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mohtasib media` subcommands.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use mohtasib_core::{MediaItem, MediaKind, MediaUpdate, MohtasibError, PayloadRef, Record};
use mohtasib_storage::{RecordStore, SnapshotShim};

use crate::{output, payload};

#[derive(Subcommand, Debug)]
pub enum MediaCommand {
    /// List gallery items, newest first.
    List {
        /// Print the records as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show one item and where its payload lives.
    Show {
        id: String,
        /// Write the decoded payload to this file.
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Add a photo or video from a file.
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, value_parser = parse_kind)]
        kind: MediaKind,
        /// Publication date (YYYY-MM-DD), today if omitted.
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        thumbnail: Option<PathBuf>,
    },
    /// Change the named fields of an item.
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_kind)]
        kind: Option<MediaKind>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        thumbnail: Option<PathBuf>,
    },
    /// Delete an item. Deleting an unknown id does nothing.
    Delete { id: String },
}

pub fn parse_kind(value: &str) -> Result<MediaKind, String> {
    match value.to_ascii_lowercase().as_str() {
        "photo" => Ok(MediaKind::Photo),
        "video" => Ok(MediaKind::Video),
        other => Err(format!("unknown media kind `{other}` (expected photo or video)")),
    }
}

pub async fn run_media(
    command: MediaCommand,
    shim: Arc<SnapshotShim>,
    use_color: bool,
) -> Result<ExitCode, MohtasibError> {
    let store = RecordStore::<MediaItem>::hydrate(shim);

    match command {
        MediaCommand::List { json } => {
            let records = store.records();
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(ExitCode::SUCCESS);
            }
            output::heading(&format!("media ({} items)", records.len()), use_color);
            for item in &records {
                println!(
                    "    {:<22} {:<6} {}  {:<32} {}",
                    item.id,
                    item.kind.to_string(),
                    item.date,
                    output::clip(&item.title, 32),
                    payload::describe(&item.payload)
                );
            }
            println!();
            Ok(ExitCode::SUCCESS)
        }
        MediaCommand::Show { id, export } => {
            let item = store.get(&id).ok_or_else(|| not_found(&id))?;
            output::heading(&item.title, use_color);
            println!("    Id:          {}", item.id);
            println!("    Kind:        {}", item.kind);
            println!("    Date:        {}", item.date);
            if !item.description.is_empty() {
                println!("    Description: {}", item.description);
            }
            println!("    Payload:     {}", payload::describe(&item.payload));
            println!("    Thumbnail:   {}", payload::describe(&item.thumbnail));

            let resolved = store.payload(&id, "payload").await;
            match (&resolved, &export) {
                (Some(data), Some(path)) => {
                    let written = payload::export(data, path)?;
                    println!("    Exported:    {} bytes to {}", written, path.display());
                }
                (None, _) if !item.payload.is_empty() => {
                    output::warning("payload could not be resolved", use_color);
                }
                _ => {}
            }
            println!();
            Ok(ExitCode::SUCCESS)
        }
        MediaCommand::Add {
            title,
            description,
            kind,
            date,
            file,
            thumbnail,
        } => {
            MediaItem::validate_patch(&vec![
                MediaUpdate::Title(title.clone()),
                MediaUpdate::Description(description.clone()),
            ])?;
            let data = payload::read_data_url(&file)?;
            let mut item = MediaItem::new(
                title,
                description,
                kind,
                date.unwrap_or_else(|| Utc::now().date_naive()),
                PayloadRef::Inline(data),
            );
            if let Some(path) = thumbnail {
                item = item.with_thumbnail(PayloadRef::Inline(payload::read_data_url(&path)?));
            }
            let id = item.id.clone();
            let outcome = store.add(item).await;
            println!("  added {id}");
            Ok(output::outcome(&outcome, use_color))
        }
        MediaCommand::Update {
            id,
            title,
            description,
            kind,
            date,
            file,
            thumbnail,
        } => {
            let mut patch = Vec::new();
            patch.extend(title.map(MediaUpdate::Title));
            patch.extend(description.map(MediaUpdate::Description));
            patch.extend(kind.map(MediaUpdate::Kind));
            patch.extend(date.map(MediaUpdate::Date));
            if let Some(path) = file {
                patch.push(MediaUpdate::Payload(PayloadRef::Inline(payload::read_data_url(&path)?)));
            }
            if let Some(path) = thumbnail {
                patch.push(MediaUpdate::Thumbnail(PayloadRef::Inline(payload::read_data_url(
                    &path,
                )?)));
            }
            if patch.is_empty() {
                return Err(MohtasibError::validation("update", "no fields to change"));
            }

            let outcome = store.update(&id, patch).await?.ok_or_else(|| not_found(&id))?;
            println!("  updated {id}");
            Ok(output::outcome(&outcome, use_color))
        }
        MediaCommand::Delete { id } => match store.delete(&id).await {
            Some(outcome) => {
                println!("  deleted {id}");
                Ok(output::outcome(&outcome, use_color))
            }
            None => {
                println!("  no media item {id}");
                Ok(ExitCode::SUCCESS)
            }
        },
    }
}

fn not_found(id: &str) -> MohtasibError {
    MohtasibError::NotFound {
        kind: "media item".to_string(),
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_case_insensitive() {
        assert_eq!(parse_kind("Video").unwrap(), MediaKind::Video);
        assert_eq!(parse_kind("photo").unwrap(), MediaKind::Photo);
        assert!(parse_kind("audio").is_err());
    }
}
