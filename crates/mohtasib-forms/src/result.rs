// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The answer returned by every form action.

use std::fmt;

use mohtasib_core::MohtasibError;
use serde::{Deserialize, Serialize};

/// Message shown when one or more fields fail validation.
pub const INVALID_MESSAGE: &str = "Please correct the highlighted fields and submit again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Success,
    Error,
}

/// One failed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Input field name as submitted (camelCase).
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl From<FieldError> for MohtasibError {
    fn from(err: FieldError) -> Self {
        MohtasibError::validation(err.path, err.message)
    }
}

/// `{status, message, trackingId?, errors?}` as sent back to the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub status: SubmissionStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl SubmissionResult {
    pub fn success(message: impl Into<String>, tracking_id: Option<String>) -> Self {
        Self {
            status: SubmissionStatus::Success,
            message: message.into(),
            tracking_id,
            errors: None,
        }
    }

    /// Validation failure listing every failed field.
    pub fn invalid(errors: Vec<FieldError>) -> Self {
        Self {
            status: SubmissionStatus::Error,
            message: INVALID_MESSAGE.to_string(),
            tracking_id: None,
            errors: Some(errors),
        }
    }

    /// Failure not tied to a particular field, such as unparseable input.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: SubmissionStatus::Error,
            message: message.into(),
            tracking_id: None,
            errors: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SubmissionStatus::Success
    }

    /// Errors reported for `path`.
    pub fn errors_for(&self, path: &str) -> Vec<&FieldError> {
        self.errors
            .iter()
            .flatten()
            .filter(|e| e.path == path)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_omits_errors() {
        let result = SubmissionResult::success("ok", Some("WM-20260115-00042".into()));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"status": "success", "message": "ok", "trackingId": "WM-20260115-00042"})
        );
    }

    #[test]
    fn invalid_lists_errors_without_tracking_id() {
        let result = SubmissionResult::invalid(vec![FieldError::new("cnic", "bad")]);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["errors"], json!([{"path": "cnic", "message": "bad"}]));
        assert!(value.get("trackingId").is_none());
        assert_eq!(result.errors_for("cnic").len(), 1);
        assert!(result.errors_for("email").is_empty());
    }

    #[test]
    fn field_error_becomes_validation_error() {
        let err: MohtasibError = FieldError::new("email", "must be a valid email address").into();
        assert_eq!(err.to_string(), "invalid email: must be a valid email address");
    }
}
