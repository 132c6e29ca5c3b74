// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ISO-8601 UTC timestamp helpers.
//!
//! The schema stores timestamps as `%Y-%m-%dT%H:%M:%S%.3fZ` text, matching
//! SQLite's `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')`, so string comparison
//! is chronological comparison. These helpers produce and consume that
//! format on the Rust side for computed deadlines (`next_attempt_at`,
//! `next_check_at`, cooldowns).

use std::time::Duration;

use chrono::{DateTime, Utc};

const ISO_FMT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Current UTC time in storage format.
pub fn now_iso() -> String {
    Utc::now().format(ISO_FMT).to_string()
}

/// A timestamp `delay` in the future, in storage format.
pub fn iso_after(delay: Duration) -> String {
    let delay = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::MAX);
    (Utc::now() + delay).format(ISO_FMT).to_string()
}

/// A timestamp `age` in the past, in storage format.
pub fn iso_before(age: Duration) -> String {
    let age = chrono::Duration::from_std(age).unwrap_or(chrono::Duration::MAX);
    (Utc::now() - age).format(ISO_FMT).to_string()
}

/// Parse a storage-format timestamp.
pub fn parse_iso(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// True when `ts` is older than `age` (unparseable timestamps count as old).
pub fn is_older_than(ts: &str, age: Duration) -> bool {
    match parse_iso(ts) {
        Some(dt) => {
            let age = chrono::Duration::from_std(age).unwrap_or(chrono::Duration::MAX);
            Utc::now() - dt > age
        }
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_round_trips() {
        let now = now_iso();
        assert!(parse_iso(&now).is_some(), "unparseable: {now}");
        assert!(now.ends_with('Z'));
    }

    #[test]
    fn iso_after_orders_lexicographically() {
        let sooner = iso_after(Duration::from_secs(120));
        let later = iso_after(Duration::from_secs(300));
        assert!(sooner < later);
        assert!(now_iso() < sooner);
        assert!(iso_before(Duration::from_secs(120)) < now_iso());
    }

    #[test]
    fn age_check() {
        assert!(is_older_than("2020-01-01T00:00:00.000Z", Duration::from_secs(60)));
        assert!(!is_older_than(&now_iso(), Duration::from_secs(60)));
        assert!(is_older_than("garbage", Duration::from_secs(60)));
    }
}
