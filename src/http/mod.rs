//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, CORS, limits)
//!     → handlers.rs (decode JSON, call registry / dispatcher / store)
//!     → response.rs (map failures to status codes)
//! ```

pub mod handlers;
pub mod response;
pub mod server;

pub use response::ApiError;
pub use server::{build_router, AppState, HttpServer};
