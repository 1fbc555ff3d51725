//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → shared by reference with every component
//!
//! deploy.network
//!     → network.rs (NetworkId, fatal when absent)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod network;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use network::{read_network_id, NetworkId};
pub use schema::{
    AdminConfig, GasConfig, LedgerConfig, ObservabilityConfig, ReconcilerConfig, RelayConfig,
    RetryConfig, StoreConfig,
};
