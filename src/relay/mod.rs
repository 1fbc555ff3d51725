//! Meta-transaction relay.
//!
//! # Data Flow
//! ```text
//! POST /relayMetaTx
//!     → dispatcher.rs
//!         getModifyStatusHash(parts)          re-derived, compared to any supplied hash
//!         isValidModifyStatusSigner(parts, sig)
//!         submitter: modifyStatus(parts, sig)
//!     → Accepted { tx_hash } | Rejected(reason)
//! ```

pub mod dispatcher;
pub mod types;

pub use dispatcher::RelayDispatcher;
pub use types::{MetaTransaction, RejectReason, RelayError, RelayOutcome, RelayResult};
