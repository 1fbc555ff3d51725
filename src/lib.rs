//! Subscription reconciliation and meta-transaction relay library.

pub mod admin;
pub mod config;
pub mod http;
pub mod ledger;
pub mod lifecycle;
pub mod observability;
pub mod relay;
pub mod resilience;
pub mod store;
pub mod subscriptions;

pub use config::schema::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
