// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion between files on disk and inline `data:` URL payloads.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use mohtasib_core::{MohtasibError, PayloadRef};
use mohtasib_storage::report::format_bytes;

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Read `path` into a base64 `data:` URL.
pub fn read_data_url(path: &Path) -> Result<String, MohtasibError> {
    let bytes = std::fs::read(path)
        .map_err(|e| MohtasibError::Internal(format!("failed to read {}: {e}", path.display())))?;
    Ok(format!("data:{};base64,{}", mime_for(path), STANDARD.encode(bytes)))
}

/// Decode a base64 `data:` URL back to bytes.
pub fn decode_data_url(data: &str) -> Option<Vec<u8>> {
    let rest = data.strip_prefix("data:")?;
    let (_, encoded) = rest.split_once(";base64,")?;
    STANDARD.decode(encoded).ok()
}

/// Write a resolved payload to `path`.
pub fn export(data: &str, path: &Path) -> Result<u64, MohtasibError> {
    let bytes = decode_data_url(data)
        .ok_or_else(|| MohtasibError::validation("payload", "not a base64 data URL"))?;
    std::fs::write(path, &bytes)
        .map_err(|e| MohtasibError::Internal(format!("failed to write {}: {e}", path.display())))?;
    Ok(bytes.len() as u64)
}

/// Short description of a stored payload for listings.
pub fn describe(payload: &PayloadRef) -> String {
    match payload {
        PayloadRef::Empty => "-".to_string(),
        PayloadRef::Inline(data) => format!("inline {}", format_bytes(data.len() as u64)),
        token => token.to_string(),
    }
}
