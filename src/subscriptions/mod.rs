//! Subscription lifecycle.
//!
//! # Data Flow
//! ```text
//! POST /saveSubscription
//!     → registry.rs (re-derive hash on chain, verify owner signature)
//!     → store (atomic append)
//!
//! every tick
//!     → reconciler.rs (load list; per subscription: hash → status → ready)
//!     → readiness.rs (Skip / Execute / Remove)
//!     → submitter (execute) or store (remove)
//! ```

pub mod readiness;
pub mod reconciler;
pub mod registry;
pub mod types;

pub use readiness::{evaluate, Action};
pub use reconciler::{ReconcileError, Reconciler, TickReport};
pub use registry::{
    AuthorizationRequest, AuthorizeOutcome, RegistryError, SaveOutcome, SaveRejection,
    SubscriptionRegistry,
};
pub use types::Subscription;
