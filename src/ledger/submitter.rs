//! Transaction building, broadcast, and receipt observation.
//!
//! # Responsibilities
//! - Encode a [`ContractCall`] with the configured call shape
//! - Build a transaction from the operator account with fixed gas settings
//! - Broadcast it and hand back a [`PendingSubmission`]
//! - Watch for the receipt in the background and publish lifecycle events
//!
//! Nothing here retries a failed broadcast, and no caller is required to wait
//! for confirmation.

use std::sync::Arc;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash};
use alloy::rpc::types::TransactionRequest;
use tokio::sync::{broadcast, oneshot};
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::config::schema::{GasConfig, LedgerConfig};
use crate::ledger::abi::SubscriptionAbi;
use crate::ledger::client::Ledger;
use crate::ledger::types::{CallKind, ContractCall, LedgerResult, ReceiptSummary};
use crate::observability::metrics;

/// Floor for the receipt poll period; `interval` rejects zero.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Lifecycle events of submitted transactions.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionEvent {
    BroadcastFailed {
        kind: CallKind,
        contract: Address,
        error: String,
    },
    HashKnown {
        kind: CallKind,
        contract: Address,
        tx_hash: TxHash,
    },
    ReceiptKnown {
        kind: CallKind,
        receipt: ReceiptSummary,
    },
    ReceiptTimedOut {
        kind: CallKind,
        tx_hash: TxHash,
    },
}

impl SubmissionEvent {
    fn label(&self) -> &'static str {
        match self {
            SubmissionEvent::BroadcastFailed { .. } => "broadcast_failed",
            SubmissionEvent::HashKnown { .. } => "hash_known",
            SubmissionEvent::ReceiptKnown { .. } => "receipt_known",
            SubmissionEvent::ReceiptTimedOut { .. } => "receipt_timed_out",
        }
    }
}

/// Final state of a broadcast transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptOutcome {
    Included(ReceiptSummary),
    Reverted(ReceiptSummary),
    TimedOut,
    /// The receipt watcher went away before reporting.
    Unavailable,
}

/// A broadcast transaction whose inclusion is not yet known.
#[derive(Debug)]
pub struct PendingSubmission {
    kind: CallKind,
    contract: Address,
    tx_hash: TxHash,
    receipt: oneshot::Receiver<ReceiptOutcome>,
}

impl PendingSubmission {
    pub fn kind(&self) -> CallKind {
        self.kind
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    /// Wait for the receipt watcher to report.
    pub async fn confirmation(self) -> ReceiptOutcome {
        self.receipt.await.unwrap_or(ReceiptOutcome::Unavailable)
    }
}

/// Receipt watching settings.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl From<&LedgerConfig> for ReceiptPolicy {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.receipt_timeout_secs),
            poll_interval: Duration::from_millis(config.receipt_poll_ms),
        }
    }
}

/// Shared submission routine for the reconciler and the relay dispatcher.
#[derive(Clone)]
pub struct TxSubmitter {
    ledger: Arc<dyn Ledger>,
    abi: Arc<SubscriptionAbi>,
    gas: GasConfig,
    receipts: ReceiptPolicy,
    events: broadcast::Sender<SubmissionEvent>,
}

impl TxSubmitter {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        abi: Arc<SubscriptionAbi>,
        gas: GasConfig,
        receipts: ReceiptPolicy,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            ledger,
            abi,
            gas,
            receipts,
            events,
        }
    }

    /// Subscribe to lifecycle events of every future submission.
    pub fn subscribe(&self) -> broadcast::Receiver<SubmissionEvent> {
        self.events.subscribe()
    }

    /// Build and broadcast `call`.
    ///
    /// Returns once the node has accepted the transaction and its hash is
    /// known; the receipt is observed in the background.
    pub async fn submit(&self, call: ContractCall) -> LedgerResult<PendingSubmission> {
        let kind = call.kind;
        let contract = call.contract;

        let tx_hash = match self.broadcast(call).await {
            Ok(tx_hash) => tx_hash,
            Err(e) => {
                tracing::error!(
                    kind = kind.as_str(),
                    contract = %contract,
                    error = %e,
                    "Transaction broadcast failed"
                );
                self.publish(SubmissionEvent::BroadcastFailed {
                    kind,
                    contract,
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        tracing::info!(
            kind = kind.as_str(),
            contract = %contract,
            tx_hash = %tx_hash,
            "Transaction broadcast"
        );
        self.publish(SubmissionEvent::HashKnown {
            kind,
            contract,
            tx_hash,
        });

        let (tx, rx) = oneshot::channel();
        let watcher = self.clone();
        tokio::spawn(async move {
            let outcome = watcher.watch_receipt(kind, tx_hash).await;
            let _ = tx.send(outcome);
        });

        Ok(PendingSubmission {
            kind,
            contract,
            tx_hash,
            receipt: rx,
        })
    }

    async fn broadcast(&self, call: ContractCall) -> LedgerResult<TxHash> {
        let shape = match call.kind {
            CallKind::ExecuteSubscription => &self.abi.execute_subscription,
            CallKind::ModifyStatus => &self.abi.modify_status,
        };
        let input = shape.encode(&call.parts, Some(&call.signature))?;
        let operator = self.ledger.operator().await?;

        let tx = TransactionRequest::default()
            .with_from(operator)
            .with_to(call.contract)
            .with_input(input)
            .with_gas_limit(self.gas.limit)
            .with_gas_price(self.gas.price_wei());

        self.ledger.send_transaction(tx).await
    }

    async fn watch_receipt(&self, kind: CallKind, tx_hash: TxHash) -> ReceiptOutcome {
        let polled = timeout(self.receipts.timeout, async {
            let mut ticker = interval(self.receipts.poll_interval.max(MIN_POLL_INTERVAL));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.ledger.receipt(tx_hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => tracing::debug!(tx_hash = %tx_hash, "Transaction pending"),
                    Err(e) => tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt lookup failed"),
                }
            }
        })
        .await;

        match polled {
            Ok(receipt) => {
                if receipt.success {
                    tracing::info!(
                        kind = kind.as_str(),
                        tx_hash = %tx_hash,
                        block = ?receipt.block_number,
                        gas_used = receipt.gas_used,
                        "Transaction included"
                    );
                } else {
                    tracing::warn!(kind = kind.as_str(), tx_hash = %tx_hash, "Transaction reverted");
                }
                self.publish(SubmissionEvent::ReceiptKnown {
                    kind,
                    receipt: receipt.clone(),
                });
                if receipt.success {
                    ReceiptOutcome::Included(receipt)
                } else {
                    ReceiptOutcome::Reverted(receipt)
                }
            }
            Err(_) => {
                tracing::warn!(
                    kind = kind.as_str(),
                    tx_hash = %tx_hash,
                    timeout_secs = self.receipts.timeout.as_secs(),
                    "No receipt before timeout"
                );
                self.publish(SubmissionEvent::ReceiptTimedOut { kind, tx_hash });
                ReceiptOutcome::TimedOut
            }
        }
    }

    fn publish(&self, event: SubmissionEvent) {
        metrics::record_submission_event(event.label());
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for TxSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxSubmitter")
            .field("gas", &self.gas)
            .field("receipts", &self.receipts)
            .finish()
    }
}
