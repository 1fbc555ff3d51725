//! Persistent relayer state.
//!
//! [`KvStore`] is the storage seam; [`MemoryKvStore`] is the bundled backend
//! and [`SubscriptionStore`] the typed view everything else uses.

pub mod kv;
pub mod memory;
pub mod subscriptions;

pub use kv::{CasOutcome, KvStore, StoreError, StoreResult, Versioned};
pub use memory::MemoryKvStore;
pub use subscriptions::{Deployment, SubscriptionStore};
