// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mohtasib complaint` and `mohtasib feedback`.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Subcommand;
use mohtasib_config::model::FormsConfig;
use mohtasib_core::MohtasibError;
use mohtasib_forms::{SubmissionResult, submit_complaint, submit_feedback};
use serde_json::Value;

#[derive(Subcommand, Debug)]
pub enum SubmitCommand {
    /// Validate and submit a JSON form (`-` reads stdin).
    Submit { file: PathBuf },
}

#[derive(Debug, Clone, Copy)]
pub enum FormKind {
    Complaint,
    Feedback,
}

fn read_input(path: &Path) -> Result<String, MohtasibError> {
    let mut raw = String::new();
    if path == Path::new("-") {
        std::io::stdin()
            .read_to_string(&mut raw)
            .map_err(|e| MohtasibError::Internal(format!("failed to read stdin: {e}")))?;
    } else {
        raw = std::fs::read_to_string(path)
            .map_err(|e| MohtasibError::Internal(format!("failed to read {}: {e}", path.display())))?;
    }
    Ok(raw)
}

/// Run one form action on raw JSON text.
pub fn submit(kind: FormKind, raw: &str, config: &FormsConfig) -> SubmissionResult {
    let input: Value = match serde_json::from_str(raw) {
        Ok(input) => input,
        Err(e) => return SubmissionResult::failure(format!("Submission is not valid JSON: {e}")),
    };
    match kind {
        FormKind::Complaint => submit_complaint(&input, config),
        FormKind::Feedback => submit_feedback(&input),
    }
}

pub fn run_submit(
    kind: FormKind,
    command: SubmitCommand,
    config: &FormsConfig,
) -> Result<ExitCode, MohtasibError> {
    let SubmitCommand::Submit { file } = command;
    let raw = read_input(&file)?;
    let result = submit(kind, &raw, config);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
