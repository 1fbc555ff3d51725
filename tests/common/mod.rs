//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{hex, keccak256, Address, Bytes, TxHash, B256};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use async_trait::async_trait;
use serde_json::{json, Value};

use subscription_relayer::config::schema::{
    GasConfig, ReconcilerConfig, StoreConfig, SubscriptionAbiConfig,
};
use subscription_relayer::config::NetworkId;
use subscription_relayer::ledger::{
    Ledger, LedgerError, LedgerResult, ReceiptPolicy, ReceiptSummary, SubscriptionAbi,
    SubscriptionStatus, TxSubmitter,
};
use subscription_relayer::store::{KvStore, MemoryKvStore, SubscriptionStore};
use subscription_relayer::subscriptions::{Reconciler, Subscription};

/// Well-known test private key (Anvil's first account).
pub const OWNER_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const NETWORK: NetworkId = NetworkId(4);

pub fn owner() -> PrivateKeySigner {
    OWNER_KEY.parse().unwrap()
}

pub fn contract() -> Address {
    Address::repeat_byte(0xc0)
}

pub fn operator() -> Address {
    Address::repeat_byte(0x0e)
}

/// A transaction as the mock node received it.
#[derive(Debug, Clone)]
pub struct SentTx {
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub input: Bytes,
    pub gas: Option<u64>,
    pub gas_price: Option<u128>,
    pub tx_hash: TxHash,
}

/// Scripted ledger. Hashes are derived deterministically from `parts`;
/// statuses default to ACTIVE and readiness to false.
#[derive(Default)]
pub struct MockLedger {
    pub down: AtomicBool,
    pub fail_send: AtomicBool,
    pub withhold_receipts: AtomicBool,
    statuses: Mutex<HashMap<B256, SubscriptionStatus>>,
    ready: Mutex<HashSet<B256>>,
    failing: Mutex<HashSet<B256>>,
    valid_modify_signatures: Mutex<HashSet<Vec<u8>>>,
    read_delay: Mutex<Duration>,
    sent: Mutex<Vec<SentTx>>,
    pub ready_reads: AtomicUsize,
}

impl MockLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscription_hash_of(parts: &[Value]) -> B256 {
        keccak256(serde_json::to_vec(parts).unwrap())
    }

    pub fn modify_status_hash_of(parts: &[Value]) -> B256 {
        let mut preimage = b"modifyStatus".to_vec();
        preimage.extend(serde_json::to_vec(parts).unwrap());
        keccak256(preimage)
    }

    pub fn set_status(&self, hash: B256, status: SubscriptionStatus) {
        self.statuses.lock().unwrap().insert(hash, status);
    }

    pub fn set_ready(&self, hash: B256) {
        self.ready.lock().unwrap().insert(hash);
    }

    /// Reads for this subscription hash time out.
    pub fn fail_hash(&self, hash: B256) {
        self.failing.lock().unwrap().insert(hash);
    }

    pub fn accept_modify_signature(&self, signature: &[u8]) {
        self.valid_modify_signatures
            .lock()
            .unwrap()
            .insert(signature.to_vec());
    }

    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = delay;
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.sent.lock().unwrap().clone()
    }

    async fn read(&self) -> LedgerResult<()> {
        let delay = *self.read_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.down.load(Ordering::SeqCst) {
            return Err(LedgerError::Rpc("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn probe(&self) -> LedgerResult<()> {
        self.read().await
    }

    async fn operator(&self) -> LedgerResult<Address> {
        self.read().await?;
        Ok(operator())
    }

    async fn block_number(&self) -> LedgerResult<u64> {
        self.read().await?;
        Ok(self.sent.lock().unwrap().len() as u64)
    }

    async fn subscription_hash(&self, _contract: Address, parts: &[Value]) -> LedgerResult<B256> {
        self.read().await?;
        let hash = Self::subscription_hash_of(parts);
        if self.failing.lock().unwrap().contains(&hash) {
            return Err(LedgerError::Timeout(10));
        }
        Ok(hash)
    }

    async fn subscription_status(
        &self,
        _contract: Address,
        hash: B256,
    ) -> LedgerResult<SubscriptionStatus> {
        self.read().await?;
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(&hash)
            .copied()
            .unwrap_or(SubscriptionStatus::Active))
    }

    async fn is_subscription_ready(
        &self,
        _contract: Address,
        parts: &[Value],
        _signature: &[u8],
    ) -> LedgerResult<bool> {
        self.read().await?;
        self.ready_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.ready.lock().unwrap().contains(&Self::subscription_hash_of(parts)))
    }

    async fn modify_status_hash(&self, _contract: Address, parts: &[Value]) -> LedgerResult<B256> {
        self.read().await?;
        Ok(Self::modify_status_hash_of(parts))
    }

    async fn is_valid_modify_status_signer(
        &self,
        _contract: Address,
        _parts: &[Value],
        signature: &[u8],
    ) -> LedgerResult<bool> {
        self.read().await?;
        Ok(self.valid_modify_signatures.lock().unwrap().contains(signature))
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> LedgerResult<TxHash> {
        self.read().await?;
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(LedgerError::Rpc("insufficient funds for gas".to_string()));
        }

        let mut sent = self.sent.lock().unwrap();
        let tx_hash = keccak256((sent.len() as u64).to_be_bytes());
        sent.push(SentTx {
            from: tx.from,
            to: tx.to.and_then(|kind| kind.to().copied()),
            input: tx.input.input().cloned().unwrap_or_default(),
            gas: tx.gas,
            gas_price: tx.gas_price,
            tx_hash,
        });
        Ok(tx_hash)
    }

    async fn receipt(&self, tx_hash: TxHash) -> LedgerResult<Option<ReceiptSummary>> {
        self.read().await?;
        if self.withhold_receipts.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let sent = self.sent.lock().unwrap();
        Ok(sent.iter().position(|tx| tx.tx_hash == tx_hash).map(|index| ReceiptSummary {
            tx_hash,
            block_number: Some(index as u64 + 1),
            gas_used: 50_000,
            success: true,
        }))
    }
}

pub fn abi() -> Arc<SubscriptionAbi> {
    Arc::new(SubscriptionAbi::from_config(&SubscriptionAbiConfig::default()).unwrap())
}

pub fn subscription_parts(owner: Address, nonce: u64) -> Vec<Value> {
    let zero = Address::ZERO.to_string();
    vec![
        json!(owner.to_string()),
        json!(Address::repeat_byte(0x22).to_string()),
        json!(Address::repeat_byte(0x33).to_string()),
        json!("1000000000000000000"),
        json!(60),
        json!(zero),
        json!("1"),
        json!(zero),
        json!(nonce),
    ]
}

/// A subscription signed by `signer` over the hash the mock derives.
pub fn signed_subscription(signer: &PrivateKeySigner, nonce: u64) -> Subscription {
    let parts = subscription_parts(signer.address(), nonce);
    let hash = MockLedger::subscription_hash_of(&parts);
    let signature = signer.sign_message_sync(hash.as_slice()).unwrap();
    Subscription {
        subscription_contract: contract(),
        parts,
        signature: Bytes::from(signature.as_bytes().to_vec()),
        subscription_hash: None,
        extra: Default::default(),
    }
}

pub fn subscription_json(subscription: &Subscription) -> Value {
    serde_json::to_value(subscription).unwrap()
}

/// Parts for a status change, `(bytes32 subscriptionHash, uint8 newStatus)`.
pub fn modify_status_parts(hash: B256, new_status: u8) -> Vec<Value> {
    vec![json!(hex::encode_prefixed(hash)), json!(new_status)]
}

pub fn store() -> (MemoryKvStore, Arc<SubscriptionStore>) {
    let kv = MemoryKvStore::new(None);
    let store = Arc::new(SubscriptionStore::new(
        Arc::new(kv.clone()) as Arc<dyn KvStore>,
        NETWORK,
        &StoreConfig::default(),
    ));
    (kv, store)
}

pub fn submitter(ledger: Arc<MockLedger>) -> TxSubmitter {
    TxSubmitter::new(
        ledger,
        abi(),
        GasConfig::default(),
        ReceiptPolicy {
            timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(10),
        },
    )
}

pub fn reconciler(ledger: Arc<MockLedger>, store: Arc<SubscriptionStore>) -> Reconciler {
    Reconciler::new(
        ledger.clone(),
        store,
        submitter(ledger),
        &ReconcilerConfig::default(),
    )
}

/// Poll `check` until it holds or `timeout` elapses.
pub async fn wait_for<F: Fn() -> bool>(check: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
