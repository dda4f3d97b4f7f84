//! Access subsystem.
//!
//! # Data Flow
//! ```text
//! Setup (once, ahead of request time):
//!     registry.rs (registered check services)
//!     → build-once RequirementMap (static keys, dynamic list)
//!     → attach_checks(route) sets route.access_checks
//!
//! Per request:
//!     resolved Route + RequestContext (context.rs)
//!     → manager.rs (lazy check instances, ALL / ANY aggregation)
//!     → Return: bool
//! ```
//!
//! # Design Decisions
//! - Check results are tri-state; Kill is a veto, never folded into Deny
//! - Check instances are memoized per engine, not shared process-wide
//! - An attached id with no registered service is an error, not a denial

pub mod builtin;
pub mod check;
pub mod context;
pub mod manager;
pub mod registry;

use thiserror::Error;

use crate::routing::RouteError;

pub use builtin::register_builtin_checks;
pub use check::{AccessCheck, AccessResult, CheckCapability, CheckFactory, DynamicAccessCheck, StaticAccessCheck};
pub use context::{Account, AccountDirectory, RequestContext};
pub use manager::AccessManager;
pub use registry::{AccessCheckRegistry, RequirementMap};

/// Errors produced while deciding access.
#[derive(Debug, Error)]
pub enum AccessError {
    /// A route carries a check id nothing is registered under.
    #[error("Access check '{0}' is not registered")]
    UnregisteredChecker(String),

    /// Route lookup failed for a reason other than "not found".
    #[error(transparent)]
    Routing(#[from] RouteError),
}

/// Result type for access decisions.
pub type AccessOutcome<T> = Result<T, AccessError>;
