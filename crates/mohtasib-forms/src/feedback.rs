// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General feedback about the portal.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::result::SubmissionResult;
use crate::rules::{FieldSpec, Form, Rule, Schema};

static SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(vec![
        FieldSpec::new("name", "Name")
            .rule(Rule::Required)
            .rule(Rule::MinLen(2))
            .rule(Rule::MaxLen(100)),
        FieldSpec::new("email", "Email").rule(Rule::Required).rule(Rule::Email),
        FieldSpec::new("subject", "Subject")
            .rule(Rule::Required)
            .rule(Rule::MinLen(5))
            .rule(Rule::MaxLen(150)),
        FieldSpec::new("message", "Message")
            .rule(Rule::Required)
            .rule(Rule::MinLen(20))
            .rule(Rule::MaxLen(2000)),
        FieldSpec::new("rating", "Rating").rule(Rule::Range(1, 5)),
    ])
});

pub const SUCCESS_MESSAGE: &str = "Thank you for your feedback.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub rating: Option<u8>,
}

impl Form for Feedback {
    const NAME: &'static str = "feedback";

    fn schema() -> &'static Schema {
        &SCHEMA
    }
}

/// Validate feedback. No tracking id is issued.
pub fn submit_feedback(input: &Value) -> SubmissionResult {
    match Feedback::parse(input) {
        Ok(feedback) => {
            info!(form = Feedback::NAME, rating = ?feedback.rating, "feedback accepted");
            SubmissionResult::success(SUCCESS_MESSAGE, None)
        }
        Err(errors) => {
            debug!(form = Feedback::NAME, errors = errors.len(), "feedback rejected");
            SubmissionResult::invalid(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rating_is_optional_and_bounded() {
        let base = json!({
            "name": "Bilal",
            "email": "bilal@example.pk",
            "subject": "Portal speed",
            "message": "The complaint page loads slowly on mobile."
        });
        assert_eq!(Feedback::parse(&base).unwrap().rating, None);

        let mut rated = base.clone();
        rated["rating"] = json!(5);
        assert_eq!(Feedback::parse(&rated).unwrap().rating, Some(5));

        rated["rating"] = json!(0);
        let errors = Feedback::parse(&rated).unwrap_err();
        assert_eq!(errors[0].message, "Rating must be between 1 and 5");
    }
}
