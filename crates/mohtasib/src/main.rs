// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mohtasib - command-line front end for the ombudsman portal data layer.

mod forms;
mod media;
mod notifications;
mod output;
mod payload;
mod storage;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use mohtasib_config::MohtasibConfig;
use mohtasib_core::{MediaItem, MohtasibError, Notification, Record};
use mohtasib_storage::SnapshotShim;
use mohtasib_storage::recovery::{clear_recoverable_keys, is_quota_error};
use tracing::warn;

use crate::forms::{FormKind, SubmitCommand};
use crate::media::MediaCommand;
use crate::notifications::NotificationCommand;
use crate::storage::StorageCommand;

/// Collections the portal keeps snapshots for.
pub(crate) const COLLECTIONS: &[&str] = &[MediaItem::COLLECTION, Notification::COLLECTION];

/// Mohtasib - ombudsman portal data layer.
#[derive(Parser, Debug)]
#[command(name = "mohtasib", version, about, long_about = None)]
struct Cli {
    /// Disable colored output.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage the media gallery.
    Media {
        #[command(subcommand)]
        action: MediaCommand,
    },
    /// Manage public notifications.
    Notifications {
        #[command(subcommand)]
        action: NotificationCommand,
    },
    /// Submit a complaint form.
    Complaint {
        #[command(subcommand)]
        action: SubmitCommand,
    },
    /// Submit a feedback form.
    Feedback {
        #[command(subcommand)]
        action: SubmitCommand,
    },
    /// Inspect and maintain the storage tiers.
    Storage {
        #[command(subcommand)]
        action: StorageCommand,
    },
    /// Manage configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate configuration, reporting every problem.
    Check {
        /// Check this file instead of the standard locations.
        #[arg(long)]
        path: Option<PathBuf>,
        /// Print the effective configuration.
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let use_color = !cli.plain && std::io::stdout().is_terminal();

    if let Commands::Config {
        action: ConfigCommand::Check { path, show },
    } = &cli.command
    {
        return check_config(path.as_deref(), *show, use_color);
    }

    let config = match mohtasib_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            mohtasib_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.app.log_level);

    match run(cli.command, &config, use_color).await {
        Ok(code) => code,
        Err(err) => {
            output::failure(&err.to_string(), use_color);
            if is_quota_error(&err) {
                recover_storage(&config, use_color).await;
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(
    command: Commands,
    config: &MohtasibConfig,
    use_color: bool,
) -> Result<ExitCode, MohtasibError> {
    match command {
        Commands::Complaint { action } => forms::run_submit(FormKind::Complaint, action, &config.forms),
        Commands::Feedback { action } => forms::run_submit(FormKind::Feedback, action, &config.forms),
        Commands::Media { action } => {
            let shim = Arc::new(SnapshotShim::open(config).await?);
            media::run_media(action, shim, use_color).await
        }
        Commands::Notifications { action } => {
            let shim = Arc::new(SnapshotShim::open(config).await?);
            notifications::run_notifications(action, shim, use_color).await
        }
        Commands::Storage { action } => {
            let shim = Arc::new(SnapshotShim::open(config).await?);
            storage::run_storage(action, shim, &config.maintenance, use_color).await
        }
        Commands::Config { .. } => Ok(ExitCode::SUCCESS),
    }
}

/// Quota-shaped failures clear disposable keys so a retry can succeed.
async fn recover_storage(config: &MohtasibConfig, use_color: bool) {
    match SnapshotShim::open(config).await {
        Ok(shim) => {
            let report = clear_recoverable_keys(&shim, COLLECTIONS);
            output::warning(
                &format!(
                    "storage was full; cleared {} keys, please try again",
                    report.total()
                ),
                use_color,
            );
        }
        Err(e) => warn!(error = %e, "could not open storage to recover from quota error"),
    }
}

fn check_config(path: Option<&std::path::Path>, show: bool, use_color: bool) -> ExitCode {
    let loaded = match path {
        Some(path) => mohtasib_config::load_and_validate_path(path),
        None => mohtasib_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            mohtasib_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    if use_color {
        use colored::Colorize;
        println!("  {} configuration is valid", "✓".green());
    } else {
        println!("  [OK]   configuration is valid");
    }
    if show {
        match toml::to_string_pretty(&config) {
            Ok(rendered) => println!("\n{rendered}"),
            Err(e) => {
                output::failure(&format!("failed to render configuration: {e}"), use_color);
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}

/// Initialize the tracing subscriber; `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mohtasib={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
