//! HTTP access gate.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, account header)
//!     → routing resolver (path → routes, most specific first)
//!     → access manager (decision for the first route)
//!     → response.rs (200 / 403 / 404 / 500)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::{GateDecision, GateError};
pub use server::{GateServer, GateState};
