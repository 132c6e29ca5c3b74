// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints serde attributes cannot express, such as
//! well-formed RPC URLs and non-zero batch sizes. Collects all errors
//! rather than failing fast.

use crate::diagnostic::ConfigError;
use crate::model::KeeprConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &KeeprConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "agent.log_level must be one of {}, got `{}`",
                LOG_LEVELS.join(", "),
                config.agent.log_level
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    for (i, url) in config.chain.rpc_urls.iter().enumerate() {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ConfigError::Validation {
                message: format!("chain.rpc_urls[{i}] `{url}` must be an http(s) URL"),
            });
        }
    }

    if config.chain.request_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "chain.request_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.engine.tick_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.tick_interval_secs must be at least 1".to_string(),
        });
    }

    if config.engine.claim_batch_size == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.claim_batch_size must be at least 1".to_string(),
        });
    }

    if config.engine.join_batch_size == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.join_batch_size must be at least 1".to_string(),
        });
    }

    if config.engine.sync_max_members_per_batch == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.sync_max_members_per_batch must be at least 1".to_string(),
        });
    }

    if config.engine.cooldown_cache_capacity == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.cooldown_cache_capacity must be at least 1".to_string(),
        });
    }

    if let Some(url) = &config.xmtp.api_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ConfigError::Validation {
                message: format!("xmtp.api_url `{url}` must be an http(s) URL"),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
