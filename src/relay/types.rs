//! Meta-transaction types.

use alloy::primitives::{Address, Bytes, TxHash, B256};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::ledger::types::{CallKind, ContractCall, LedgerError};

/// A pre-signed status change for a subscription contract.
///
/// With the default call shapes, `parts` is `(bytes32 subscriptionHash,
/// uint8 newStatus)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaTransaction {
    #[serde(alias = "contractAddress")]
    pub subscription_contract: Address,

    pub parts: Vec<Value>,

    pub signature: Bytes,

    /// Client-supplied hash. Compared against the re-derived one, never used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modify_status_hash: Option<B256>,
}

impl MetaTransaction {
    pub fn modify_status_call(&self) -> ContractCall {
        ContractCall {
            kind: CallKind::ModifyStatus,
            contract: self.subscription_contract,
            parts: self.parts.clone(),
            signature: self.signature.clone(),
        }
    }
}

/// Why a meta-transaction was not forwarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum RejectReason {
    HashMismatch { supplied: B256, derived: B256 },
    InvalidSigner,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::HashMismatch { .. } => "hash_mismatch",
            RejectReason::InvalidSigner => "invalid_signer",
        }
    }
}

/// The answer a relay caller receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Broadcast; inclusion is not implied.
    Accepted { hash: B256, tx_hash: TxHash },
    Rejected(RejectReason),
}

/// Failures that are not a verdict on the meta-transaction.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Reading verification state from the contract failed.
    #[error("verification failed: {0}")]
    Verification(LedgerError),

    /// The transaction was valid but the node did not accept it.
    #[error("broadcast failed: {0}")]
    Broadcast(LedgerError),
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
