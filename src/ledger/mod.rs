//! Ledger integration subsystem.
//!
//! # Data Flow
//! ```text
//! config (RPC URLs, call signatures, gas)
//!     → abi.rs (parse call shapes, encode opaque parts)
//!     → client.rs (Ledger trait; RPC reads with timeouts and failover)
//!     → submitter.rs (build, broadcast, observe receipt)
//! signature.rs (off-chain signer recovery, no RPC)
//! catalog.rs (ABI documents served to clients)
//! ```
//!
//! # Constraints
//! - The operator account is unlocked on the node; no key material is held here
//! - All RPC calls have configurable timeouts
//! - Gas price and limit are fixed by configuration

pub mod abi;
pub mod catalog;
pub mod client;
pub mod signature;
pub mod submitter;
pub mod types;

pub use abi::{CallShape, SubscriptionAbi};
pub use catalog::{AbiCatalog, AbiEntry};
pub use client::{Ledger, RpcLedger};
pub use submitter::{PendingSubmission, ReceiptOutcome, ReceiptPolicy, SubmissionEvent, TxSubmitter};
pub use types::{CallKind, ContractCall, LedgerError, LedgerResult, ReceiptSummary, SubscriptionStatus};
