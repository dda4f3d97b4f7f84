//! Route resolution and access decisions.
//!
//! Routes are compiled once and stored by outline; a request path is turned
//! into its candidate outlines, matched against the stored routes most
//! specific first, and the attached access checks of the winning route are
//! combined into a single admit/deny decision.

pub mod access;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod store;

pub use access::{AccessManager, AccessResult, Account, RequestContext};
pub use config::AppConfig;
pub use http::GateServer;
pub use lifecycle::{Services, Shutdown};
pub use routing::{Route, RouteResolver};
