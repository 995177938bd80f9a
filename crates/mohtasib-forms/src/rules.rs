// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Declarative field rules and the single-pass schema validator.
//!
//! A [`Schema`] checks every declared field and collects every failure;
//! it never stops at the first one. On success it yields a normalized
//! object: declared fields only, strings trimmed, blank optional fields
//! removed.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::result::FieldError;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// One constraint on a field value.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Present and not blank.
    Required,
    /// At least this many characters.
    MinLen(usize),
    /// At most this many characters.
    MaxLen(usize),
    /// Matches the regex; the message is reported as-is.
    Pattern(&'static LazyLock<Regex>, &'static str),
    Email,
    /// Checkbox-style consent: `true`, `"true"` or `"on"`.
    Accepted,
    /// Integer within the inclusive range.
    Range(i64, i64),
}

/// A named input field with its label and rules.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub path: &'static str,
    pub label: &'static str,
    pub rules: Vec<Rule>,
}

impl FieldSpec {
    pub fn new(path: &'static str, label: &'static str) -> Self {
        Self {
            path,
            label,
            rules: Vec::new(),
        }
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    fn expects_text(&self) -> bool {
        self.rules.iter().any(|r| {
            matches!(r, Rule::MinLen(_) | Rule::MaxLen(_) | Rule::Pattern(..) | Rule::Email)
        })
    }

    fn is_required(&self) -> bool {
        self.rules.iter().any(|r| matches!(r, Rule::Required | Rule::Accepted))
    }

    /// Check `value`, appending failures to `errors`. Returns the
    /// normalized value to keep, if any.
    fn check(&self, value: Option<&Value>, errors: &mut Vec<FieldError>) -> Option<Value> {
        let value = match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(Value::String(s.trim().to_string())),
            Some(other) => Some(other.clone()),
        };

        let Some(value) = value else {
            if self.is_required() {
                let message = if self.rules.iter().any(|r| matches!(r, Rule::Accepted)) {
                    format!("{} must be accepted", self.label)
                } else {
                    format!("{} is required", self.label)
                };
                errors.push(FieldError::new(self.path, message));
            }
            return None;
        };

        if self.expects_text() && !value.is_string() {
            errors.push(FieldError::new(self.path, format!("{} must be text", self.label)));
            return None;
        }

        let before = errors.len();
        for rule in &self.rules {
            if let Some(message) = self.violation(rule, &value) {
                errors.push(FieldError::new(self.path, message));
            }
        }
        (errors.len() == before).then_some(value)
    }

    fn violation(&self, rule: &Rule, value: &Value) -> Option<String> {
        let label = self.label;
        match rule {
            Rule::Required => None,
            Rule::MinLen(min) => {
                let len = text(value)?.chars().count();
                (len < *min).then(|| format!("{label} must be at least {min} characters"))
            }
            Rule::MaxLen(max) => {
                let len = text(value)?.chars().count();
                (len > *max).then(|| format!("{label} must be at most {max} characters"))
            }
            Rule::Pattern(regex, message) => match text(value) {
                Some(s) if regex.is_match(s) => None,
                _ => Some((*message).to_string()),
            },
            Rule::Email => match text(value) {
                Some(s) if EMAIL_PATTERN.is_match(s) => None,
                _ => Some(format!("{label} must be a valid email address")),
            },
            Rule::Accepted => {
                let accepted = match value {
                    Value::Bool(b) => *b,
                    Value::String(s) => s == "true" || s == "on",
                    _ => false,
                };
                (!accepted).then(|| format!("{label} must be accepted"))
            }
            Rule::Range(min, max) => match value.as_i64() {
                Some(n) if (*min..=*max).contains(&n) => None,
                Some(_) => Some(format!("{label} must be between {min} and {max}")),
                None => Some(format!("{label} must be a whole number")),
            },
        }
    }
}

fn text(value: &Value) -> Option<&str> {
    value.as_str()
}

/// An ordered set of field specs.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Validate `input` in one pass.
    pub fn validate(&self, input: &Value) -> Result<Map<String, Value>, Vec<FieldError>> {
        let Some(object) = input.as_object() else {
            return Err(vec![FieldError::new("form", "Submission must be a JSON object")]);
        };

        let mut errors = Vec::new();
        let mut normalized = Map::new();
        for field in &self.fields {
            if let Some(value) = field.check(object.get(field.path), &mut errors) {
                normalized.insert(field.path.to_string(), value);
            }
        }

        if errors.is_empty() {
            Ok(normalized)
        } else {
            Err(errors)
        }
    }
}

/// A typed form backed by a schema.
pub trait Form: DeserializeOwned {
    /// Name used in log events.
    const NAME: &'static str;

    fn schema() -> &'static Schema;

    /// Validate `input` and deserialize the normalized object.
    fn parse(input: &Value) -> Result<Self, Vec<FieldError>> {
        let normalized = Self::schema().validate(input)?;
        serde_json::from_value(Value::Object(normalized))
            .map_err(|e| vec![FieldError::new("form", format!("Submission could not be read: {e}"))])
    }
}
