//! Ledger RPC client with timeout and failover handling.
//!
//! # Responsibilities
//! - Connect to JSON-RPC endpoints (primary + failovers)
//! - Read subscription contract state through the configured call shapes
//! - Broadcast transactions from the unlocked operator account
//! - Bound every RPC with a timeout

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{hex, Address, Bytes, TxHash, B256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::TransportResult;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::OnceCell;
use tokio::time::timeout;

use crate::config::schema::LedgerConfig;
use crate::ledger::abi::{CallShape, SubscriptionAbi};
use crate::ledger::types::{
    LedgerError, LedgerResult, ReceiptSummary, SubscriptionStatus,
};
use crate::observability::metrics;

/// Everything the relayer needs from the ledger node.
///
/// Contract reads take the subscription contract address and the opaque
/// `parts` tuple; implementations own the encoding.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Cheap authoritative read used as a liveness gate.
    async fn probe(&self) -> LedgerResult<()>;

    /// The funded operator account that sends every transaction.
    async fn operator(&self) -> LedgerResult<Address>;

    async fn block_number(&self) -> LedgerResult<u64>;

    /// `getSubscriptionHash(parts)`.
    async fn subscription_hash(&self, contract: Address, parts: &[Value]) -> LedgerResult<B256>;

    /// `getSubscriptionStatus(hash)`.
    async fn subscription_status(
        &self,
        contract: Address,
        hash: B256,
    ) -> LedgerResult<SubscriptionStatus>;

    /// `isSubscriptionReady(parts, signature)`.
    async fn is_subscription_ready(
        &self,
        contract: Address,
        parts: &[Value],
        signature: &[u8],
    ) -> LedgerResult<bool>;

    /// `getModifyStatusHash(parts)`.
    async fn modify_status_hash(&self, contract: Address, parts: &[Value]) -> LedgerResult<B256>;

    /// `isValidModifyStatusSigner(parts, signature)`.
    async fn is_valid_modify_status_signer(
        &self,
        contract: Address,
        parts: &[Value],
        signature: &[u8],
    ) -> LedgerResult<bool>;

    /// Broadcast a fully specified transaction; the node signs for `from`.
    async fn send_transaction(&self, tx: TransactionRequest) -> LedgerResult<TxHash>;

    async fn receipt(&self, tx_hash: TxHash) -> LedgerResult<Option<ReceiptSummary>>;
}

type DynProvider = Arc<dyn Provider + Send + Sync>;

/// JSON-RPC ledger client with failover support.
#[derive(Clone)]
pub struct RpcLedger {
    /// List of providers (primary + failovers).
    providers: Vec<DynProvider>,
    config: LedgerConfig,
    abi: Arc<SubscriptionAbi>,
    probe_contract: Option<Address>,
    /// Resolved once from `eth_accounts`.
    operator: Arc<OnceCell<Address>>,
    timeout_duration: Duration,
}

impl RpcLedger {
    /// Create a new ledger client. Does not contact the node.
    pub fn new(config: LedgerConfig, abi: Arc<SubscriptionAbi>) -> LedgerResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            LedgerError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as DynProvider);

        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as DynProvider);
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        let probe_contract = match &config.probe_contract {
            Some(raw) => Some(raw.parse::<Address>().map_err(|e| {
                LedgerError::Rpc(format!("Invalid probe contract '{}': {}", raw, e))
            })?),
            None => None,
        };

        tracing::info!(
            rpc_url = %config.rpc_url,
            failovers = providers.len() - 1,
            "Ledger client initialized"
        );

        Ok(Self {
            providers,
            config,
            abi,
            probe_contract,
            operator: Arc::new(OnceCell::new()),
            timeout_duration,
        })
    }

    /// Run `f` against each provider in turn until one answers in time.
    async fn with_failover<T, F, Fut>(&self, method: &str, f: F) -> LedgerResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut timed_out = false;
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, f(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    timed_out = false;
                    tracing::warn!(provider_idx = i, method, error = %e, "RPC error, trying next provider");
                }
                Err(_) => {
                    timed_out = true;
                    tracing::warn!(provider_idx = i, method, "RPC timeout, trying next provider");
                }
            }
        }
        metrics::record_rpc_failure(method);
        if timed_out {
            Err(LedgerError::Timeout(self.config.rpc_timeout_secs))
        } else {
            Err(LedgerError::Rpc(format!("All providers failed: {}", method)))
        }
    }

    /// `eth_call` against `contract` with pre-encoded input.
    async fn read(&self, contract: Address, shape: &CallShape, input: Bytes) -> LedgerResult<Bytes> {
        let tx = TransactionRequest::default()
            .with_to(contract)
            .with_input(input);
        self.with_failover(shape.name(), move |provider| {
            let tx = tx.clone();
            async move { provider.call(tx).await }
        })
        .await
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn probe(&self) -> LedgerResult<()> {
        match self.probe_contract {
            Some(contract) => {
                let shape = &self.abi.author;
                let output = self.read(contract, shape, shape.encode(&[], None)?).await?;
                let author = shape.decode_address(&output)?;
                tracing::debug!(contract = %contract, author = %author, "Ledger probe answered");
            }
            None => {
                self.block_number().await?;
            }
        }
        Ok(())
    }

    async fn operator(&self) -> LedgerResult<Address> {
        let index = self.config.operator_account_index;
        let address = self
            .operator
            .get_or_try_init(|| async {
                let accounts = self
                    .with_failover("eth_accounts", |provider| async move {
                        provider.get_accounts().await
                    })
                    .await?;
                let available = accounts.len();
                let operator = accounts
                    .get(index)
                    .copied()
                    .ok_or(LedgerError::NoOperator { index, available })?;
                tracing::info!(operator = %operator, index, "Operator account resolved");
                Ok::<_, LedgerError>(operator)
            })
            .await?;
        Ok(*address)
    }

    async fn block_number(&self) -> LedgerResult<u64> {
        self.with_failover("eth_blockNumber", |provider| async move {
            provider.get_block_number().await
        })
        .await
    }

    async fn subscription_hash(&self, contract: Address, parts: &[Value]) -> LedgerResult<B256> {
        let shape = &self.abi.subscription_hash;
        let output = self.read(contract, shape, shape.encode(parts, None)?).await?;
        shape.decode_b256(&output)
    }

    async fn subscription_status(
        &self,
        contract: Address,
        hash: B256,
    ) -> LedgerResult<SubscriptionStatus> {
        let shape = &self.abi.subscription_status;
        let input = shape.encode(&[Value::String(hex::encode_prefixed(hash))], None)?;
        let output = self.read(contract, shape, input).await?;
        shape.decode_status(&output)
    }

    async fn is_subscription_ready(
        &self,
        contract: Address,
        parts: &[Value],
        signature: &[u8],
    ) -> LedgerResult<bool> {
        let shape = &self.abi.subscription_ready;
        let output = self
            .read(contract, shape, shape.encode(parts, Some(signature))?)
            .await?;
        shape.decode_bool(&output)
    }

    async fn modify_status_hash(&self, contract: Address, parts: &[Value]) -> LedgerResult<B256> {
        let shape = &self.abi.modify_status_hash;
        let output = self.read(contract, shape, shape.encode(parts, None)?).await?;
        shape.decode_b256(&output)
    }

    async fn is_valid_modify_status_signer(
        &self,
        contract: Address,
        parts: &[Value],
        signature: &[u8],
    ) -> LedgerResult<bool> {
        let shape = &self.abi.valid_modify_status_signer;
        let output = self
            .read(contract, shape, shape.encode(parts, Some(signature))?)
            .await?;
        shape.decode_bool(&output)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> LedgerResult<TxHash> {
        // Primary only: the operator account is unlocked on that node, and a
        // timed-out send may still have been accepted.
        let provider = &self.providers[0];
        match timeout(self.timeout_duration, provider.send_transaction(tx)).await {
            Ok(Ok(pending)) => Ok(*pending.tx_hash()),
            Ok(Err(e)) => {
                metrics::record_rpc_failure("eth_sendTransaction");
                Err(LedgerError::Rpc(format!("eth_sendTransaction: {}", e)))
            }
            Err(_) => {
                metrics::record_rpc_failure("eth_sendTransaction");
                Err(LedgerError::Timeout(self.config.rpc_timeout_secs))
            }
        }
    }

    async fn receipt(&self, tx_hash: TxHash) -> LedgerResult<Option<ReceiptSummary>> {
        let receipt = self
            .with_failover("eth_getTransactionReceipt", |provider| async move {
                provider.get_transaction_receipt(tx_hash).await
            })
            .await?;
        Ok(receipt.map(|r| ReceiptSummary {
            tx_hash,
            block_number: r.block_number,
            gas_used: r.gas_used,
            success: r.status(),
        }))
    }
}

impl std::fmt::Debug for RpcLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedger")
            .field("rpc_url", &self.config.rpc_url)
            .field("providers", &self.providers.len())
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}
