//! Route table storage.
//!
//! # Data Flow
//! ```text
//! RouteDumper
//!     → transaction(delete_route_set, insert*) → commit or discard
//!
//! RouteResolver
//!     → find_by_outlines (ordered by fit descending)
//!     → find_by_names
//! ```
//!
//! # Design Decisions
//! - A route set is replaced all-or-nothing; readers see the old or the new
//!   set, never a mix
//! - `(route_set, name)` is unique; a duplicate insert fails the transaction
//! - Backend failures surface as `StoreError`, never as "no match"

pub mod file;
pub mod memory;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use file::FileRouteStore;
pub use memory::MemoryRouteStore;

/// A persisted route record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRow {
    pub name: String,
    pub route_set: String,
    pub fit: u32,
    pub pattern: String,
    pub pattern_outline: String,
    pub num_parts: usize,
    /// JSON-serialized `Route`, including its compiled form.
    pub route: String,
}

/// Errors raised by route table backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("Route store unavailable: {0}")]
    Unavailable(String),

    /// A row with the same name already exists in the route set.
    #[error("Duplicate route '{name}' in route set '{route_set}'")]
    DuplicateRoute { route_set: String, name: String },

    #[error("Route store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Route store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Staged writes inside a store transaction.
pub trait RouteTransaction {
    /// Delete every row of `route_set`, returning how many were staged for removal.
    fn delete_route_set(&mut self, route_set: &str) -> StoreResult<usize>;

    fn insert(&mut self, row: RouteRow) -> StoreResult<()>;
}

/// Unit of work run inside [`RouteStore::transaction`].
pub type TransactionWork<'a> = dyn FnMut(&mut dyn RouteTransaction) -> StoreResult<()> + 'a;

/// Row-oriented route table.
pub trait RouteStore: Send + Sync {
    /// Run `work` atomically: its writes are committed only if it returns `Ok`.
    fn transaction(&self, work: &mut TransactionWork<'_>) -> StoreResult<()>;

    /// Rows whose outline is in `outlines`, ordered by fit descending.
    fn find_by_outlines(&self, outlines: &[String]) -> StoreResult<Vec<RouteRow>>;

    /// Rows whose name is in `names`.
    fn find_by_names(&self, names: &[String]) -> StoreResult<Vec<RouteRow>>;

    /// Number of rows in `route_set`.
    fn count(&self, route_set: &str) -> StoreResult<usize>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}
