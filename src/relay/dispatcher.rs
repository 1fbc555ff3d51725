//! Verify-then-forward for meta-transactions.

use std::sync::Arc;

use crate::ledger::client::Ledger;
use crate::ledger::submitter::TxSubmitter;
use crate::observability::metrics;
use crate::relay::types::{MetaTransaction, RejectReason, RelayError, RelayOutcome, RelayResult};

/// Forwards meta-transactions the subscription contract accepts as signed by
/// a valid signer. Each request is evaluated once; nothing is stored or
/// retried.
#[derive(Clone)]
pub struct RelayDispatcher {
    ledger: Arc<dyn Ledger>,
    submitter: TxSubmitter,
}

impl RelayDispatcher {
    pub fn new(ledger: Arc<dyn Ledger>, submitter: TxSubmitter) -> Self {
        Self { ledger, submitter }
    }

    pub async fn relay(&self, meta: MetaTransaction) -> RelayResult<RelayOutcome> {
        let result = self.dispatch(meta).await;
        let label = match &result {
            Ok(RelayOutcome::Accepted { .. }) => "accepted",
            Ok(RelayOutcome::Rejected(reason)) => reason.as_str(),
            Err(RelayError::Verification(_)) => "verification_failed",
            Err(RelayError::Broadcast(_)) => "broadcast_failed",
        };
        metrics::record_relay(label);
        result
    }

    async fn dispatch(&self, meta: MetaTransaction) -> RelayResult<RelayOutcome> {
        let contract = meta.subscription_contract;

        let derived = self
            .ledger
            .modify_status_hash(contract, &meta.parts)
            .await
            .map_err(RelayError::Verification)?;

        if let Some(supplied) = meta.modify_status_hash {
            if supplied != derived {
                tracing::warn!(
                    contract = %contract,
                    supplied = %supplied,
                    derived = %derived,
                    "Meta-transaction hash mismatch"
                );
                return Ok(RelayOutcome::Rejected(RejectReason::HashMismatch { supplied, derived }));
            }
        }

        let valid = self
            .ledger
            .is_valid_modify_status_signer(contract, &meta.parts, &meta.signature)
            .await
            .map_err(RelayError::Verification)?;
        if !valid {
            tracing::warn!(contract = %contract, hash = %derived, "Meta-transaction signer rejected");
            return Ok(RelayOutcome::Rejected(RejectReason::InvalidSigner));
        }

        let pending = self
            .submitter
            .submit(meta.modify_status_call())
            .await
            .map_err(RelayError::Broadcast)?;

        tracing::info!(
            contract = %contract,
            hash = %derived,
            tx_hash = %pending.tx_hash(),
            "Meta-transaction relayed"
        );
        Ok(RelayOutcome::Accepted {
            hash: derived,
            tx_hash: pending.tx_hash(),
        })
    }
}

impl std::fmt::Debug for RelayDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayDispatcher")
            .field("submitter", &self.submitter)
            .finish()
    }
}
