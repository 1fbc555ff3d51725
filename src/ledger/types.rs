//! Ledger-specific types and error definitions.

use std::fmt;

use alloy::primitives::{Address, Bytes, TxHash};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// A configured call signature could not be parsed.
    #[error("ABI error: {0}")]
    Abi(String),

    /// Call arguments did not fit the configured call shape.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A call returned data that did not match the expected output.
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// The node does not expose the configured operator account.
    #[error("Operator account {index} not found ({available} accounts available)")]
    NoOperator { index: usize, available: usize },
}

impl LedgerError {
    /// Whether retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Rpc(_) | LedgerError::Timeout(_))
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// On-chain subscription status, as reported by `getSubscriptionStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionStatus {
    Active,
    Paused,
    Cancelled,
    Expired,
    /// A status value this relayer does not recognize.
    Unknown(u8),
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::Paused => "PAUSED",
            SubscriptionStatus::Cancelled => "CANCELLED",
            SubscriptionStatus::Expired => "EXPIRED",
            SubscriptionStatus::Unknown(_) => "UNKNOWN",
        }
    }
}

impl From<u8> for SubscriptionStatus {
    fn from(raw: u8) -> Self {
        match raw {
            0 => SubscriptionStatus::Active,
            1 => SubscriptionStatus::Paused,
            2 => SubscriptionStatus::Cancelled,
            3 => SubscriptionStatus::Expired,
            other => SubscriptionStatus::Unknown(other),
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionStatus::Unknown(raw) => write!(f, "UNKNOWN({})", raw),
            other => f.write_str(other.as_str()),
        }
    }
}

/// The subset of a transaction receipt the relayer reports on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptSummary {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub success: bool,
}

/// State-mutating contract methods the relayer submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CallKind {
    ExecuteSubscription,
    ModifyStatus,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::ExecuteSubscription => "executeSubscription",
            CallKind::ModifyStatus => "modifyStatus",
        }
    }
}

/// A contract call waiting to be encoded and broadcast.
///
/// `parts` are passed positionally, followed by `signature`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractCall {
    pub kind: CallKind,
    pub contract: Address,
    pub parts: Vec<Value>,
    pub signature: Bytes,
}
