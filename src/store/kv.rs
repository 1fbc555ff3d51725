//! Key/value store abstraction with versioned writes.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The operation did not finish within the configured timeout.
    #[error("Store timeout after {0} ms")]
    Timeout(u64),

    /// An optimistic update kept losing to concurrent writers.
    #[error("Store contention on '{key}' after {attempts} attempts")]
    Contention { key: String, attempts: u32 },

    /// The backing store failed.
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] std::io::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A stored value with the version token of the write that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    pub value: String,
    pub version: u64,
}

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    Written { version: u64 },
    /// The key changed since the expected version was read.
    Conflict,
}

/// A TTL-bounded key/value store.
///
/// Every write (re)sets the key's time-to-live. Expired keys read as absent.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<Versioned>>;

    /// Unconditional write. Returns the new version.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> StoreResult<u64>;

    /// Write only if the key is still at `expected` (`None`: key absent).
    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<u64>,
        value: String,
        ttl: Duration,
    ) -> StoreResult<CasOutcome>;

    async fn delete(&self, key: &str) -> StoreResult<()>;
}
