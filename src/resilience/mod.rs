//! Resilience subsystem.
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every ledger call and store operation has a
//!   deadline, enforced where the call is made
//! - Startup waits on the ledger with an explicit [`RetryPolicy`]
//! - Failed broadcasts are never retried; the next reconciler tick re-evaluates

pub mod backoff;

pub use backoff::{calculate_backoff, RetryPolicy};
