// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The engine loop: a single periodic tick that advances every stage of
//! the gating pipeline.
//!
//! Stages are isolated: a failing stage is logged and the remaining stages
//! of the same tick still run, as does the next tick. The loop holds no
//! in-memory queue state, so a crash between ticks loses nothing beyond
//! time -- the action queue and watchlist are the durable truth.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use keepr_chain::Oracle;
use keepr_config::EngineConfig;
use keepr_core::{GroupClient, KeeprError};
use keepr_storage::queries::{actions, vaults};
use keepr_storage::{time, Database};

use crate::cooldown::CooldownCache;
use crate::executor::Executor;
use crate::reconciler::{Reconciler, SyncReport};
use crate::watchlist::Watchlist;

/// Outcome of a command-triggered sync request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualSyncOutcome {
    /// The requesting caller hit the per-(group, wallet) command cooldown.
    CommandCooldown,
    /// The group itself was synced too recently.
    SyncCooldown,
    Completed(SyncReport),
}

pub struct EngineLoop {
    db: Arc<Database>,
    executor: Executor,
    watchlist: Watchlist,
    reconciler: Reconciler,
    config: EngineConfig,
    cooldowns: Mutex<CooldownCache>,
}

impl EngineLoop {
    pub fn new(
        db: Arc<Database>,
        oracle: Arc<Oracle>,
        groups: Arc<dyn GroupClient>,
        config: EngineConfig,
    ) -> Self {
        let executor = Executor::new(db.clone(), groups.clone());
        let watchlist = Watchlist::new(db.clone(), oracle.clone());
        let reconciler = Reconciler::new(
            db.clone(),
            oracle,
            groups,
            Duration::from_millis(config.member_pacing_ms),
        );
        let cooldowns = Mutex::new(CooldownCache::new(
            config.cooldown_cache_capacity,
            Duration::from_millis(config.command_cooldown_ms),
        ));
        Self {
            db,
            executor,
            watchlist,
            reconciler,
            config,
            cooldowns,
        }
    }

    /// Run ticks until the token is cancelled.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), KeeprError> {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.tick_interval_secs.max(1)));
        info!(
            tick_secs = self.config.tick_interval_secs,
            "engine loop started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("engine loop stopping");
                    return Ok(());
                }
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// One pass over every stage. Never fails; stage errors are logged.
    pub async fn tick(&self) {
        if let Err(e) = self.release_stuck().await {
            error!(error = %e, "stuck-row sweep failed");
        }
        if let Err(e) = self.executor.run_batch(self.config.claim_batch_size).await {
            error!(error = %e, "action batch failed");
        }
        if let Err(e) = self
            .watchlist
            .process_batch(self.config.join_batch_size)
            .await
        {
            error!(error = %e, "watchlist batch failed");
        }
        if let Err(e) = self.reconcile_due_vaults().await {
            error!(error = %e, "reconciliation pass failed");
        }
    }

    async fn release_stuck(&self) -> Result<(), KeeprError> {
        let cutoff = time::iso_before(Duration::from_secs(self.config.stuck_executing_secs));
        let released = actions::release_stuck(&self.db, &cutoff).await?;
        if released > 0 {
            info!(released, "returned stuck executing actions to retry");
        }
        Ok(())
    }

    /// Sweep every gated vault whose per-vault sync cooldown has elapsed.
    async fn reconcile_due_vaults(&self) -> Result<(), KeeprError> {
        for vault in vaults::list_gated(&self.db).await? {
            if !vault.shares_gating_configured() {
                continue;
            }
            let cooldown = Duration::from_secs(vault.rate_limits.sync_cooldown_secs);
            let due = match &vault.last_sync_at {
                None => true,
                Some(last) => time::is_older_than(last, cooldown),
            };
            if !due {
                continue;
            }
            if let Err(e) = self.reconciler.run_sync_for_group(&vault.group_id).await {
                error!(group_id = %vault.group_id, error = %e, "sweep failed");
            }
        }
        Ok(())
    }

    /// Command-triggered sync for one group, guarded by the caller's
    /// command cooldown and the group's own sync cooldown.
    pub async fn manual_sync(
        &self,
        group_id: &str,
        requested_by_wallet: &str,
    ) -> Result<ManualSyncOutcome, KeeprError> {
        if !self
            .cooldowns
            .lock()
            .await
            .check_and_touch(group_id, requested_by_wallet)
        {
            debug!(group_id, wallet_address = requested_by_wallet, "command cooldown active");
            return Ok(ManualSyncOutcome::CommandCooldown);
        }

        let vault = vaults::get_by_group(&self.db, group_id)
            .await?
            .ok_or_else(|| KeeprError::Internal(format!("no vault for group {group_id}")))?;
        let cooldown = Duration::from_secs(vault.rate_limits.sync_cooldown_secs);
        if let Some(last) = &vault.last_sync_at {
            if !time::is_older_than(last, cooldown) {
                debug!(group_id, "group sync cooldown active");
                return Ok(ManualSyncOutcome::SyncCooldown);
            }
        }

        let report = self.reconciler.run_sync_for_group(group_id).await?;
        Ok(ManualSyncOutcome::Completed(report))
    }
}
