//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields (`contract`, `signature`, `tx_hash`) on every event
//! - Request ID flows through HTTP spans
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
