//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Read network id → Build ledger and store
//!     → Wait for ledger liveness → Start reconciler and HTTP server
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop reconciler and server → Save store snapshot → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
