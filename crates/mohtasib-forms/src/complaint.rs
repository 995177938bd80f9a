// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Complaint submission against a federal agency.

use std::sync::LazyLock;

use mohtasib_config::model::FormsConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::result::SubmissionResult;
use crate::rules::{FieldSpec, Form, Rule, Schema};
use crate::tracking;

static CNIC_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{5}-\d{7}-\d$").unwrap());

// 03XX-XXXXXXX or 03XXXXXXXXX
static MOBILE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^03\d{2}-?\d{7}$").unwrap());

static SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(vec![
        FieldSpec::new("fullName", "Full name")
            .rule(Rule::Required)
            .rule(Rule::MinLen(2))
            .rule(Rule::MaxLen(100)),
        FieldSpec::new("cnic", "CNIC").rule(Rule::Required).rule(Rule::Pattern(
            &CNIC_PATTERN,
            "CNIC must be in the format 12345-1234567-1",
        )),
        FieldSpec::new("mobile", "Mobile number")
            .rule(Rule::Required)
            .rule(Rule::Pattern(
                &MOBILE_PATTERN,
                "Mobile number must be in the format 03XX-XXXXXXX",
            )),
        FieldSpec::new("email", "Email").rule(Rule::Email),
        FieldSpec::new("address", "Address")
            .rule(Rule::Required)
            .rule(Rule::MinLen(10))
            .rule(Rule::MaxLen(300)),
        FieldSpec::new("agency", "Agency").rule(Rule::Required),
        FieldSpec::new("complaintDetails", "Complaint details")
            .rule(Rule::Required)
            .rule(Rule::MinLen(50))
            .rule(Rule::MaxLen(5000)),
        FieldSpec::new("remedySought", "Remedy sought").rule(Rule::MaxLen(1000)),
        FieldSpec::new("declaration", "Declaration").rule(Rule::Accepted),
    ])
});

pub const SUCCESS_MESSAGE: &str =
    "Your complaint has been registered. Keep your tracking id to follow its progress.";

/// A validated complaint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub full_name: String,
    pub cnic: String,
    pub mobile: String,
    #[serde(default)]
    pub email: Option<String>,
    pub address: String,
    pub agency: String,
    pub complaint_details: String,
    #[serde(default)]
    pub remedy_sought: Option<String>,
    #[serde(deserialize_with = "accepted")]
    pub declaration: bool,
}

// The schema has already checked the value; this maps "on"/"true" to `true`.
fn accepted<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => s == "true" || s == "on",
        _ => false,
    })
}

impl Form for Complaint {
    const NAME: &'static str = "complaint";

    fn schema() -> &'static Schema {
        &SCHEMA
    }
}

/// Validate a complaint and issue a tracking id.
pub fn submit_complaint(input: &Value, config: &FormsConfig) -> SubmissionResult {
    match Complaint::parse(input) {
        Ok(complaint) => {
            let tracking_id = tracking::generate(&config.tracking_prefix);
            info!(
                form = Complaint::NAME,
                tracking_id = %tracking_id,
                agency = %complaint.agency,
                "complaint accepted"
            );
            SubmissionResult::success(SUCCESS_MESSAGE, Some(tracking_id))
        }
        Err(errors) => {
            debug!(form = Complaint::NAME, errors = errors.len(), "complaint rejected");
            SubmissionResult::invalid(errors)
        }
    }
}
