// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `keepr serve` command implementation.
//!
//! Wires storage, the eligibility oracle, and the XMTP gateway adapter
//! into the engine loop, then runs until SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use keepr_chain::{JsonRpcShareReader, Oracle};
use keepr_config::KeeprConfig;
use keepr_core::KeeprError;
use keepr_engine::{install_signal_handler, EngineLoop};
use keepr_storage::Database;
use keepr_xmtp::XmtpGatewayClient;

/// Runs the `keepr serve` command.
pub async fn run_serve(config: KeeprConfig) -> Result<(), KeeprError> {
    init_tracing(&config.agent.log_level);

    if config.chain.rpc_urls.is_empty() {
        return Err(KeeprError::Config(
            "chain.rpc_urls must list at least one endpoint".to_string(),
        ));
    }
    let api_url = config.xmtp.api_url.as_deref().ok_or_else(|| {
        KeeprError::Config("xmtp.api_url is required for serve".to_string())
    })?;

    let db = Arc::new(
        Database::open_with_options(&config.storage.database_path, config.storage.wal_mode)
            .await?,
    );
    info!(path = %config.storage.database_path, "storage ready");

    let reader = Arc::new(JsonRpcShareReader::new(Duration::from_secs(
        config.chain.request_timeout_secs,
    ))?);
    let oracle = Arc::new(Oracle::new(reader, config.chain.rpc_urls.clone()));

    let groups = Arc::new(XmtpGatewayClient::new(
        api_url,
        config.xmtp.auth_token.as_deref(),
        Duration::from_secs(config.chain.request_timeout_secs),
    )?);
    info!(gateway = api_url, "XMTP gateway client ready");

    let engine = EngineLoop::new(db.clone(), oracle, groups, config.engine.clone());
    let cancel = install_signal_handler();
    engine.run(cancel).await?;

    drop(engine);
    match Arc::try_unwrap(db) {
        Ok(db) => db.close().await?,
        Err(_) => warn!("database still shared at shutdown, skipping checkpoint"),
    }
    info!("shutdown complete");
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("keepr={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
