//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (administrative step):
//!     Route[]
//!     → builder.rs (attach access checks via the registry)
//!     → compiler.rs (fit, outline, regex per pattern)
//!     → dumper.rs (atomically replace the route set in the store)
//!
//! Incoming Request (path):
//!     → outline.rs (normalize, enumerate candidate outlines)
//!     → store lookup by outline, ordered by fit descending
//!     → resolver.rs (regex confirmation against the real path)
//!     → Return: ordered RouteCollection or RouteError::PathNotFound
//! ```
//!
//! # Design Decisions
//! - Routes are compiled once and persisted with their compiled form
//! - Lookup never scans the whole table: only outlines derived from the path
//! - Explicit not-found rather than silent "first route wins"
//! - Store failures are never downgraded to not-found

pub mod builder;
pub mod compiler;
pub mod dumper;
pub mod outline;
pub mod resolver;
pub mod route;

use thiserror::Error;

use crate::store::StoreError;

pub use builder::RouteBuilder;
pub use compiler::{CompiledRoute, PathPatternCompiler, PatternCompiler, PatternError, MAX_PARTS};
pub use dumper::RouteDumper;
pub use outline::{candidate_outlines, normalize_path, path_parts};
pub use resolver::RouteResolver;
pub use route::{AccessMode, Route, RouteCollection};

/// Errors produced while dumping or resolving routes.
#[derive(Debug, Error)]
pub enum RouteError {
    /// No stored route matches the path.
    #[error("No route found for path '{0}'")]
    PathNotFound(String),

    /// No stored route carries the name.
    #[error("Route '{0}' does not exist")]
    NameNotFound(String),

    /// The pattern compiler rejected a route.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// The route table store failed.
    #[error("Route store error: {0}")]
    Store(#[from] StoreError),
}

impl RouteError {
    /// True for the recoverable "nothing matched" conditions.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RouteError::PathNotFound(_) | RouteError::NameNotFound(_))
    }
}

/// Result type for routing operations.
pub type RouteResult<T> = Result<T, RouteError>;
