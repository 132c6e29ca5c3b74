// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry backoff policy for the action queue.
//!
//! Exponential with a hard cap: attempts are unbounded, the delay is not.

use std::time::Duration;

const BASE_SECS: u64 = 10;
const CAP_SECS: u64 = 810;

/// Delay before retry number `attempt` (0-based): `clamp(10 * 3^n, 10, 810)`
/// seconds, i.e. 10s, 30s, 90s, 270s, then 810s forever.
pub fn backoff(attempt: u32) -> Duration {
    // 3^5 already exceeds the cap; bound the exponent so the multiply
    // cannot overflow for large attempt counts.
    let factor = 3u64.saturating_pow(attempt.min(8));
    let secs = BASE_SECS
        .saturating_mul(factor)
        .clamp(BASE_SECS, CAP_SECS);
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_sequence() {
        let expected = [10, 30, 90, 270, 810, 810, 810];
        for (n, want) in expected.iter().enumerate() {
            assert_eq!(
                backoff(n as u32),
                Duration::from_secs(*want),
                "backoff({n})"
            );
        }
    }

    #[test]
    fn caps_for_absurd_attempt_counts() {
        assert_eq!(backoff(100), Duration::from_secs(810));
        assert_eq!(backoff(u32::MAX), Duration::from_secs(810));
    }
}
