// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Complaint tracking identifiers: `<PREFIX>-YYYYMMDD-NNNNN`.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use regex::Regex;

static TRACKING_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]+)-(\d{8})-(\d{5})$").unwrap());

/// Build an id from an explicit clock and random source.
pub fn generate_with<R: Rng + ?Sized>(prefix: &str, now: DateTime<Utc>, rng: &mut R) -> String {
    let serial: u32 = rng.gen_range(0..100_000);
    format!("{prefix}-{}-{serial:05}", now.format("%Y%m%d"))
}

/// A fresh id for today (UTC).
pub fn generate(prefix: &str) -> String {
    generate_with(prefix, Utc::now(), &mut rand::thread_rng())
}

/// Parts of a well-formed tracking id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingId {
    pub prefix: String,
    pub date: NaiveDate,
    pub serial: u32,
}

impl TrackingId {
    /// Parse `id`, rejecting malformed ids and impossible dates.
    pub fn parse(id: &str) -> Option<Self> {
        let captures = TRACKING_PATTERN.captures(id)?;
        let date = NaiveDate::parse_from_str(&captures[2], "%Y%m%d").ok()?;
        let serial = captures[3].parse().ok()?;
        Some(Self {
            prefix: captures[1].to_string(),
            date,
            serial,
        })
    }
}
