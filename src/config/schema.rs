//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relayer.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the subscription relayer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// HTTP listener configuration.
    pub listener: ListenerConfig,

    /// Where the deploy network id is read from.
    pub network: NetworkConfig,

    /// Ledger node connection settings.
    pub ledger: LedgerConfig,

    /// Fixed gas settings for every submitted transaction.
    pub gas: GasConfig,

    /// Reconciliation loop settings.
    pub reconciler: ReconcilerConfig,

    /// Subscription store settings.
    pub store: StoreConfig,

    /// Contract call shapes and ABI files.
    pub contracts: ContractsConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:10002").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:10002".to_string(),
            request_timeout_secs: 30,
            max_body_size: 256 * 1024,
        }
    }
}

/// Network identification.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// File holding the numeric network id the contracts were deployed to.
    pub id_file: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            id_file: "../deploy.network".to_string(),
        }
    }
}

/// Ledger node configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    #[serde(default)]
    pub failover_urls: Vec<String>,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Index of the funded, unlocked operator account in `eth_accounts`.
    pub operator_account_index: usize,

    /// Contract whose `author()` answers the startup liveness probe.
    /// Falls back to a block number query when unset.
    #[serde(default)]
    pub probe_contract: Option<String>,

    /// How long a submitted transaction's receipt is awaited, in seconds.
    pub receipt_timeout_secs: u64,

    /// Receipt polling interval in milliseconds.
    pub receipt_poll_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            failover_urls: Vec::new(),
            rpc_timeout_secs: 10,
            operator_account_index: 3,
            probe_contract: None,
            receipt_timeout_secs: 300,
            receipt_poll_ms: 2000,
        }
    }
}

/// Gas settings. No dynamic fee estimation is performed.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct GasConfig {
    /// Gas price in gwei.
    pub price_gwei: u64,

    /// Gas limit per transaction.
    pub limit: u64,
}

impl GasConfig {
    /// Gas price in wei.
    pub fn price_wei(&self) -> u128 {
        self.price_gwei as u128 * 1_000_000_000
    }
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            price_gwei: 4,
            limit: 1_000_000,
        }
    }
}

/// Reconciliation loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Run the reconciliation loop.
    pub enabled: bool,

    /// Tick interval in seconds.
    pub interval_secs: u64,

    /// Retry policy for the startup liveness gate.
    pub startup: RetryConfig,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            startup: RetryConfig::default(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts. `None` retries forever.
    pub max_attempts: Option<u32>,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        // Fixed 15s between probes, until the node answers.
        Self {
            max_attempts: None,
            base_delay_ms: 15_000,
            max_delay_ms: 15_000,
        }
    }
}

/// Subscription store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Per-operation timeout in milliseconds.
    pub op_timeout_ms: u64,

    /// Time-to-live applied on every write, in seconds.
    pub ttl_secs: u64,

    /// Attempts for an optimistic list mutation before giving up.
    pub cas_max_attempts: u32,

    /// Period of the sweep that drops expired keys, in seconds.
    pub purge_interval_secs: u64,

    /// Optional JSON snapshot file loaded at startup and written on shutdown.
    #[serde(default)]
    pub snapshot_path: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            op_timeout_ms: 2000,
            ttl_secs: 60 * 60 * 24 * 7,
            cas_max_attempts: 16,
            purge_interval_secs: 60,
            snapshot_path: None,
        }
    }
}

/// Contract call shapes and ABI documents.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ContractsConfig {
    /// Method signatures of the subscription contract.
    pub subscription: SubscriptionAbiConfig,

    /// ABI JSON files served by `/abi/{address}`.
    pub abi_files: Vec<AbiFileConfig>,
}

/// Solidity signatures used to encode calls against the subscription contract.
///
/// Parts are passed positionally, so the arity of these signatures defines the
/// shape of `parts` a client must send.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SubscriptionAbiConfig {
    pub author: String,
    pub subscription_hash: String,
    pub subscription_status: String,
    pub subscription_ready: String,
    pub execute_subscription: String,
    pub modify_status_hash: String,
    pub valid_modify_status_signer: String,
    pub modify_status: String,
}

impl Default for SubscriptionAbiConfig {
    fn default() -> Self {
        const PARTS: &str =
            "address from, address to, address tokenAddress, uint256 tokenAmount, uint256 periodSeconds, address gasToken, uint256 gasPrice, address gasPayer, uint256 nonce";
        Self {
            author: "function author() view returns (address)".to_string(),
            subscription_hash: format!(
                "function getSubscriptionHash({PARTS}) view returns (bytes32)"
            ),
            subscription_status: "function getSubscriptionStatus(bytes32 subscriptionHash) view returns (uint8)".to_string(),
            subscription_ready: format!(
                "function isSubscriptionReady({PARTS}, bytes signature) view returns (bool)"
            ),
            execute_subscription: format!(
                "function executeSubscription({PARTS}, bytes signature) returns (bool)"
            ),
            modify_status_hash: "function getModifyStatusHash(bytes32 subscriptionHash, uint8 newStatus) view returns (bytes32)".to_string(),
            valid_modify_status_signer: "function isValidModifyStatusSigner(bytes32 subscriptionHash, uint8 newStatus, bytes signature) view returns (bool)".to_string(),
            modify_status: "function modifyStatus(bytes32 subscriptionHash, uint8 newStatus, bytes signature) returns (bool)".to_string(),
        }
    }
}

/// A contract ABI document served to clients.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AbiFileConfig {
    /// Contract name, for logging.
    pub name: String,

    /// Deployed address.
    pub address: String,

    /// Path to a JSON file holding the ABI array.
    pub path: String,
}

/// Admin configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    /// Bearer token required by administrative routes. Open when unset.
    pub api_key: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
