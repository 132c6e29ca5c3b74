// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./keepr.toml` > `~/.config/keepr/keepr.toml` >
//! `/etc/keepr/keepr.toml` with environment variable overrides via the
//! `KEEPR_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::KeeprConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/keepr/keepr.toml` (system-wide)
/// 3. `~/.config/keepr/keepr.toml` (user XDG config)
/// 4. `./keepr.toml` (local directory)
/// 5. `KEEPR_*` environment variables
pub fn load_config() -> Result<KeeprConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<KeeprConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KeeprConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<KeeprConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KeeprConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(KeeprConfig::default()))
        .merge(Toml::file("/etc/keepr/keepr.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("keepr/keepr.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("keepr.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `KEEPR_STORAGE_DATABASE_PATH` must map
/// to `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("KEEPR_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: KEEPR_CHAIN_REQUEST_TIMEOUT_SECS -> "chain_request_timeout_secs"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("chain_", "chain.", 1)
            .replacen("engine_", "engine.", 1)
            .replacen("xmtp_", "xmtp.", 1);
        mapped.into()
    })
}
