// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mohtasib storage` diagnostics and maintenance.
//!
//! The report is display only; watching it polls on the configured interval
//! and never changes stored data.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use colored::Colorize;
use mohtasib_config::model::MaintenanceConfig;
use mohtasib_core::{KeyValueUsage, MediaItem, MohtasibError, Notification};
use mohtasib_storage::recovery::clear_recoverable_keys;
use mohtasib_storage::report::{format_bytes, percent_used};
use mohtasib_storage::{RecordStore, SnapshotShim, StorageReport};
use tracing::info;

use crate::{COLLECTIONS, output};

const SECS_PER_DAY: u64 = 86_400;

#[derive(Subcommand, Debug)]
pub enum StorageCommand {
    /// Show usage of every storage tier.
    Report {
        #[arg(long)]
        json: bool,
        /// Refresh until interrupted.
        #[arg(long)]
        watch: bool,
    },
    /// Remove large objects older than the maximum age.
    Sweep {
        #[arg(long)]
        max_age_days: Option<u64>,
    },
    /// Remove entries no record refers to.
    Orphans,
    /// Clear temporary keys and unreferenced fallback entries.
    Recover,
}

pub async fn run_storage(
    command: StorageCommand,
    shim: Arc<SnapshotShim>,
    maintenance: &MaintenanceConfig,
    use_color: bool,
) -> Result<ExitCode, MohtasibError> {
    match command {
        StorageCommand::Report { json, watch: false } => {
            let report = StorageReport::collect(&shim, COLLECTIONS).await;
            print_report(&report, json, use_color)?;
        }
        StorageCommand::Report { json, watch: true } => {
            let mut ticker =
                tokio::time::interval(Duration::from_secs(maintenance.report_interval_secs));
            let shutdown = tokio::signal::ctrl_c();
            tokio::pin!(shutdown);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = StorageReport::collect(&shim, COLLECTIONS).await;
                        print_report(&report, json, use_color)?;
                    }
                    _ = &mut shutdown => break,
                }
            }
        }
        StorageCommand::Sweep { max_age_days } => {
            let days = max_age_days.unwrap_or(maintenance.sweep_max_age_days);
            let removed = shim
                .large_objects()
                .sweep(Duration::from_secs(days.saturating_mul(SECS_PER_DAY)))
                .await;
            info!(days, removed, "large-object sweep finished");
            println!("  removed {removed} large objects older than {days} days");
        }
        StorageCommand::Orphans => {
            let media = RecordStore::<MediaItem>::hydrate(shim.clone())
                .sweep_orphans()
                .await;
            let notices = RecordStore::<Notification>::hydrate(shim)
                .sweep_orphans()
                .await;
            println!("  removed {media} media entries and {notices} notification entries");
        }
        StorageCommand::Recover => {
            let report = clear_recoverable_keys(&shim, COLLECTIONS);
            println!(
                "  cleared {} temporary keys and {} fallback entries",
                report.temp_keys_cleared, report.fallback_entries_cleared
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_report(report: &StorageReport, json: bool, use_color: bool) -> Result<(), MohtasibError> {
    if json {
        println!("{}", serde_json::to_string(report)?);
        return Ok(());
    }

    output::heading("mohtasib storage", use_color);
    print_kv("Local", &report.local, use_color);
    print_kv("Session", &report.session, use_color);
    let large = &report.large_objects;
    println!(
        "    {:<14} {} in {} objects, {} on disk ({})",
        "Large objects",
        format_bytes(large.payload_bytes),
        large.entries,
        format_bytes(large.database_bytes),
        usage_label(large.payload_bytes, large.quota_bytes, use_color),
    );
    for collection in &report.collections {
        let size = collection
            .snapshot_bytes
            .map(format_bytes)
            .unwrap_or_else(|| "not stored".to_string());
        println!("    {:<14} {}", collection.collection, size);
    }
    println!();
    Ok(())
}

fn print_kv(name: &str, usage: &KeyValueUsage, use_color: bool) {
    println!(
        "    {:<14} {} in {} keys ({})",
        name,
        format_bytes(usage.used_bytes),
        usage.keys,
        usage_label(usage.used_bytes, usage.quota_bytes, use_color),
    );
}

fn usage_label(used: u64, quota: u64, use_color: bool) -> String {
    let percent = percent_used(used, quota);
    let label = format!("{percent:.1}% of {}", format_bytes(quota));
    if !use_color {
        return label;
    }
    match percent {
        p if p >= 90.0 => label.red().to_string(),
        p if p >= 70.0 => label.yellow().to_string(),
        _ => label.green().to_string(),
    }
}
