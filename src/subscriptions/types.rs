//! Subscription records as submitted by clients and kept in the store.

use alloy::primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ledger::types::{CallKind, ContractCall};

/// A pre-signed recurring operation.
///
/// `parts` is an opaque tuple encoded positionally with the configured call
/// shapes. Only `parts[0]`, the owner address, is ever interpreted here.
/// Fields the relayer does not know are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(alias = "contractAddress")]
    pub subscription_contract: Address,

    pub parts: Vec<Value>,

    pub signature: Bytes,

    /// Client-supplied hash. Informational; the relayer re-derives it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_hash: Option<B256>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Subscription {
    /// The owner address from `parts[0]`, if it parses as one.
    pub fn owner(&self) -> Option<Address> {
        match self.parts.first()? {
            Value::String(s) => s.trim().to_lowercase().parse().ok(),
            _ => None,
        }
    }

    /// Subscriptions are identified by their signature bytes.
    pub fn is_identified_by(&self, signature: &[u8]) -> bool {
        self.signature.as_ref() == signature
    }

    pub fn execute_call(&self) -> ContractCall {
        ContractCall {
            kind: CallKind::ExecuteSubscription,
            contract: self.subscription_contract,
            parts: self.parts.clone(),
            signature: self.signature.clone(),
        }
    }

    /// Abbreviated signature for log fields.
    pub fn short_id(&self) -> String {
        let hex = alloy::primitives::hex::encode(&self.signature);
        hex.chars().take(16).collect()
    }
}
