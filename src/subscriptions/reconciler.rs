//! Periodic reconciliation of stored subscriptions against chain state.
//!
//! # Responsibilities
//! - Wait for the ledger to answer before doing any work
//! - Every interval, load the stored list and decide per subscription
//! - Submit executions and drop subscriptions that can never run again
//!
//! Ticks never overlap. A failure on one subscription only skips that
//! subscription for the tick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tokio::time::{self, MissedTickBehavior};

use crate::config::schema::ReconcilerConfig;
use crate::ledger::client::Ledger;
use crate::ledger::submitter::TxSubmitter;
use crate::ledger::types::{LedgerError, SubscriptionStatus};
use crate::observability::metrics;
use crate::resilience::RetryPolicy;
use crate::store::kv::StoreError;
use crate::store::subscriptions::SubscriptionStore;
use crate::subscriptions::readiness::{evaluate, Action};
use crate::subscriptions::types::Subscription;

/// Errors that end a tick, or one subscription's share of it.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The previous tick still holds the tick lock.
    #[error("previous tick still running")]
    Busy,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Counts from a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub checked: usize,
    pub executed: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// The background reconciliation service for one network.
pub struct Reconciler {
    ledger: Arc<dyn Ledger>,
    store: Arc<SubscriptionStore>,
    submitter: TxSubmitter,
    interval: Duration,
    startup: RetryPolicy,
    tick_lock: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        store: Arc<SubscriptionStore>,
        submitter: TxSubmitter,
        config: &ReconcilerConfig,
    ) -> Self {
        Self {
            ledger,
            store,
            submitter,
            interval: Duration::from_secs(config.interval_secs),
            startup: RetryPolicy::from(&config.startup),
            tick_lock: Mutex::new(()),
        }
    }

    /// Override the startup retry policy.
    pub fn with_startup_policy(mut self, policy: RetryPolicy) -> Self {
        self.startup = policy;
        self
    }

    /// Probe the ledger until it answers.
    ///
    /// Returns `false` if shutdown arrives first or the policy gives up.
    pub async fn wait_until_live(&self, shutdown: &mut broadcast::Receiver<()>) -> bool {
        let mut attempt = 1;
        loop {
            match self.ledger.probe().await {
                Ok(()) => {
                    metrics::record_ledger_up(true);
                    tracing::info!(attempt, "Ledger is live");
                    return true;
                }
                Err(e) => {
                    metrics::record_ledger_up(false);
                    if !self.startup.allows(attempt + 1) {
                        tracing::error!(attempt, error = %e, "Ledger unreachable, giving up");
                        return false;
                    }
                    let delay = self.startup.delay_after(attempt);
                    tracing::warn!(
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %e,
                        "Ledger not reachable yet"
                    );
                    tokio::select! {
                        _ = time::sleep(delay) => {}
                        _ = shutdown.recv() => {
                            tracing::info!("Shutdown during startup probe");
                            return false;
                        }
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Wait for the ledger, then tick every interval until shutdown.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        if !self.wait_until_live(&mut shutdown).await {
            return;
        }

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            network = %self.store.network(),
            "Reconciler starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(report) => tracing::debug!(?report, "Tick complete"),
                        Err(ReconcileError::Busy) => tracing::warn!("Previous tick still running, skipping"),
                        Err(e) => tracing::error!(error = %e, "Tick failed"),
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Reconciler received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one reconciliation pass over the stored list.
    pub async fn tick(&self) -> Result<TickReport, ReconcileError> {
        let Ok(_guard) = self.tick_lock.try_lock() else {
            metrics::record_tick(false, Duration::ZERO);
            return Err(ReconcileError::Busy);
        };
        let started = Instant::now();

        let subscriptions = self.store.subscriptions().await?;
        let mut report = TickReport::default();

        for subscription in &subscriptions {
            report.checked += 1;
            match self.reconcile_one(subscription).await {
                Ok(Action::Execute) => report.executed += 1,
                Ok(Action::Remove) => report.removed += 1,
                Ok(Action::Skip) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    metrics::record_action("failed");
                    tracing::warn!(
                        contract = %subscription.subscription_contract,
                        signature = %subscription.short_id(),
                        error = %e,
                        "Skipping subscription this tick"
                    );
                }
            }
        }

        metrics::record_tick(true, started.elapsed());
        if report.checked > 0 {
            tracing::info!(
                checked = report.checked,
                executed = report.executed,
                removed = report.removed,
                skipped = report.skipped,
                failed = report.failed,
                "Reconciled subscriptions"
            );
        }
        Ok(report)
    }

    async fn reconcile_one(&self, subscription: &Subscription) -> Result<Action, ReconcileError> {
        let contract = subscription.subscription_contract;

        let hash = self.ledger.subscription_hash(contract, &subscription.parts).await?;
        let status = self.ledger.subscription_status(contract, hash).await?;
        let ready = if status == SubscriptionStatus::Active {
            self.ledger
                .is_subscription_ready(contract, &subscription.parts, &subscription.signature)
                .await?
        } else {
            false
        };

        let action = evaluate(status, ready);
        tracing::debug!(
            contract = %contract,
            hash = %hash,
            status = %status,
            ready,
            action = action.as_str(),
            "Evaluated subscription"
        );

        match action {
            Action::Execute => {
                let pending = self.submitter.submit(subscription.execute_call()).await?;
                tracing::info!(
                    contract = %contract,
                    hash = %hash,
                    tx_hash = %pending.tx_hash(),
                    "Subscription execution submitted"
                );
            }
            Action::Remove => {
                self.store.remove_subscription(&subscription.signature).await?;
                tracing::info!(
                    contract = %contract,
                    hash = %hash,
                    status = %status,
                    "Subscription removed"
                );
            }
            Action::Skip => {}
        }

        metrics::record_action(action.as_str());
        Ok(action)
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("interval", &self.interval)
            .field("startup", &self.startup)
            .finish()
    }
}
