// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded cooldown tracking for command-triggered operations.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A bounded `(group, wallet)` -> last-hit map with TTL eviction.
///
/// Entries older than the TTL are irrelevant (the cooldown has passed) and
/// are dropped opportunistically on every insert; when the map is still at
/// capacity after that, the oldest entry goes. Memory use is therefore
/// bounded no matter how many distinct callers hammer the commands.
pub struct CooldownCache {
    capacity: usize,
    ttl: Duration,
    hits: HashMap<(String, String), Instant>,
}

impl CooldownCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            hits: HashMap::new(),
        }
    }

    /// Returns true and records the hit when the caller is outside its
    /// cooldown window; false when it must wait.
    pub fn check_and_touch(&mut self, group_id: &str, wallet_address: &str) -> bool {
        let now = Instant::now();
        let key = (group_id.to_string(), wallet_address.to_string());

        if let Some(last) = self.hits.get(&key) {
            if now.duration_since(*last) < self.ttl {
                return false;
            }
        }

        self.hits.retain(|_, last| now.duration_since(*last) < self.ttl);
        if self.hits.len() >= self.capacity {
            if let Some(oldest) = self
                .hits
                .iter()
                .min_by_key(|(_, last)| **last)
                .map(|(key, _)| key.clone())
            {
                self.hits.remove(&oldest);
            }
        }

        self.hits.insert(key, now);
        true
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_hit_inside_the_window_is_blocked() {
        let mut cache = CooldownCache::new(16, Duration::from_secs(60));
        assert!(cache.check_and_touch("g1", "0xw"));
        assert!(!cache.check_and_touch("g1", "0xw"));
        // A different wallet in the same group is unaffected.
        assert!(cache.check_and_touch("g1", "0xother"));
    }

    #[test]
    fn expired_entries_allow_again() {
        let mut cache = CooldownCache::new(16, Duration::from_millis(0));
        assert!(cache.check_and_touch("g1", "0xw"));
        assert!(cache.check_and_touch("g1", "0xw"));
    }

    #[test]
    fn capacity_bounds_the_map() {
        let mut cache = CooldownCache::new(2, Duration::from_secs(60));
        assert!(cache.check_and_touch("g1", "0xa"));
        assert!(cache.check_and_touch("g1", "0xb"));
        assert!(cache.check_and_touch("g1", "0xc"));
        assert!(cache.len() <= 2);
        // The newest entry survives the eviction and stays on cooldown.
        assert!(!cache.check_and_touch("g1", "0xc"));
    }
}
