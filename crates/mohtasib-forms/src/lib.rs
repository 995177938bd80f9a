// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Form submission actions for the Mohtasib portal.
//!
//! Each action validates a JSON object against a declared field schema in a
//! single pass and answers with a [`SubmissionResult`]. Nothing is stored.

pub mod complaint;
pub mod feedback;
pub mod result;
pub mod rules;
pub mod tracking;

pub use complaint::{Complaint, submit_complaint};
pub use feedback::{Feedback, submit_feedback};
pub use result::{FieldError, SubmissionResult, SubmissionStatus};
pub use rules::{FieldSpec, Form, Rule, Schema};
