// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal rendering shared by the subcommands.

use std::process::ExitCode;

use colored::Colorize;
use mohtasib_storage::PersistOutcome;

/// Print the result of mirroring a mutation and map it to an exit code.
///
/// A memory-only outcome means the change is lost when the process exits.
pub fn outcome(outcome: &PersistOutcome, use_color: bool) -> ExitCode {
    match outcome {
        PersistOutcome::Written(_) => {
            if use_color {
                println!("  {} saved", "✓".green());
            } else {
                println!("  [OK]   saved");
            }
            ExitCode::SUCCESS
        }
        PersistOutcome::Degraded(_) => {
            if use_color {
                println!("  {} {}", "!".yellow(), outcome.to_string().yellow());
            } else {
                println!("  [WARN] {outcome}");
            }
            ExitCode::SUCCESS
        }
        PersistOutcome::MemoryOnly(_) => {
            if use_color {
                println!("  {} {}", "✗".red(), outcome.to_string().red());
            } else {
                println!("  [FAIL] {outcome}");
            }
            ExitCode::FAILURE
        }
    }
}

/// Heading line followed by a rule.
pub fn heading(title: &str, use_color: bool) {
    println!();
    if use_color {
        println!("  {}", title.bold());
    } else {
        println!("  {title}");
    }
    println!("  {}", "-".repeat(50));
}

pub fn warning(message: &str, use_color: bool) {
    if use_color {
        eprintln!("  {} {}", "!".yellow(), message.yellow());
    } else {
        eprintln!("  [WARN] {message}");
    }
}

pub fn failure(message: &str, use_color: bool) {
    if use_color {
        eprintln!("  {} {}", "✗".red(), message.red());
    } else {
        eprintln!("  [FAIL] {message}");
    }
}

/// Truncate `text` to `max` characters for table cells.
pub fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut clipped: String = text.chars().take(max.saturating_sub(1)).collect();
        clipped.push('…');
        clipped
    }
}
