// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Keepr gating engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so unrecognized keys are
//! rejected at startup with an actionable diagnostic.

use serde::{Deserialize, Serialize};

/// Top-level Keepr configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeeprConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Blockchain read-endpoint pool.
    #[serde(default)]
    pub chain: ChainConfig,

    /// Runtime-loop and queue tuning.
    #[serde(default)]
    pub engine: EngineConfig,

    /// XMTP gateway adapter settings.
    #[serde(default)]
    pub xmtp: XmtpConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the bot process.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "keepr".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("keepr").join("keepr.db"))
        .and_then(|p| p.to_str().map(|s| s.to_string()))
        .unwrap_or_else(|| "keepr.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Blockchain read-endpoint configuration.
///
/// `rpc_urls` is an *ordered* pool: the oracle tries endpoints in list
/// order and the first successful read wins.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    /// Ordered candidate JSON-RPC endpoints.
    #[serde(default)]
    pub rpc_urls: Vec<String>,

    /// Per-endpoint request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_urls: Vec::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    12
}

/// Runtime-loop and queue tuning.
///
/// Per-vault rate limits (sync cooldown, batch size) in the vault record
/// override the engine-wide defaults here.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Seconds between runtime-loop ticks.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// Actions claimed per tick.
    #[serde(default = "default_claim_batch_size")]
    pub claim_batch_size: usize,

    /// Join requests examined per watchlist pass.
    #[serde(default = "default_join_batch_size")]
    pub join_batch_size: usize,

    /// Age after which a row stuck in `executing` is returned to `retry`.
    #[serde(default = "default_stuck_executing_secs")]
    pub stuck_executing_secs: u64,

    /// Default seconds between reconciliation sweeps per group.
    #[serde(default = "default_sync_cooldown_secs")]
    pub sync_cooldown_secs: u64,

    /// Default members examined per reconciliation invocation.
    #[serde(default = "default_sync_max_members_per_batch")]
    pub sync_max_members_per_batch: usize,

    /// Pacing delay between per-member RPC checks during reconciliation.
    #[serde(default = "default_member_pacing_ms")]
    pub member_pacing_ms: u64,

    /// Default per-(group, wallet) command cooldown.
    #[serde(default = "default_command_cooldown_ms")]
    pub command_cooldown_ms: u64,

    /// Bound on the in-memory cooldown cache.
    #[serde(default = "default_cooldown_cache_capacity")]
    pub cooldown_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            claim_batch_size: default_claim_batch_size(),
            join_batch_size: default_join_batch_size(),
            stuck_executing_secs: default_stuck_executing_secs(),
            sync_cooldown_secs: default_sync_cooldown_secs(),
            sync_max_members_per_batch: default_sync_max_members_per_batch(),
            member_pacing_ms: default_member_pacing_ms(),
            command_cooldown_ms: default_command_cooldown_ms(),
            cooldown_cache_capacity: default_cooldown_cache_capacity(),
        }
    }
}

fn default_tick_interval_secs() -> u64 {
    5
}

fn default_claim_batch_size() -> usize {
    10
}

fn default_join_batch_size() -> usize {
    25
}

fn default_stuck_executing_secs() -> u64 {
    900
}

fn default_sync_cooldown_secs() -> u64 {
    600
}

fn default_sync_max_members_per_batch() -> usize {
    25
}

fn default_member_pacing_ms() -> u64 {
    250
}

fn default_command_cooldown_ms() -> u64 {
    10_000
}

fn default_cooldown_cache_capacity() -> usize {
    1024
}

/// XMTP gateway adapter configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct XmtpConfig {
    /// Base URL of the XMTP node-gateway sidecar. `None` disables the adapter.
    #[serde(default)]
    pub api_url: Option<String>,

    /// Bearer token for the gateway, if it requires one.
    #[serde(default)]
    pub auth_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = KeeprConfig::default();
        assert_eq!(config.agent.name, "keepr");
        assert_eq!(config.agent.log_level, "info");
        assert!(config.storage.wal_mode);
        assert_eq!(config.chain.request_timeout_secs, 12);
        assert_eq!(config.engine.tick_interval_secs, 5);
        assert_eq!(config.engine.join_batch_size, 25);
        assert_eq!(config.engine.sync_cooldown_secs, 600);
        assert_eq!(config.engine.sync_max_members_per_batch, 25);
        assert_eq!(config.engine.member_pacing_ms, 250);
        assert!(config.xmtp.api_url.is_none());
    }

    #[test]
    fn partial_section_fills_remaining_defaults() {
        let config: KeeprConfig =
            toml::from_str("[engine]\nclaim_batch_size = 3\n").expect("valid toml");
        assert_eq!(config.engine.claim_batch_size, 3);
        assert_eq!(config.engine.tick_interval_secs, 5);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let result: Result<KeeprConfig, _> = toml::from_str("[agent]\nnaem = \"x\"\n");
        assert!(result.is_err(), "deny_unknown_fields should reject `naem`");
    }
}
