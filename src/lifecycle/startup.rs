//! Startup orchestration.
//!
//! # Responsibilities
//! - Open the configured route store
//! - Register the stock access checks
//! - Wire resolver, access manager and route builder together
//! - Rebuild the configured route set before traffic is accepted
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently

use std::sync::Arc;

use thiserror::Error;

use crate::access::builtin::register_builtin_checks;
use crate::access::manager::AccessManager;
use crate::access::registry::AccessCheckRegistry;
use crate::config::schema::{AppConfig, StoreBackend, StoreConfig};
use crate::routing::builder::RouteBuilder;
use crate::routing::dumper::RouteDumper;
use crate::routing::resolver::RouteResolver;
use crate::routing::route::Route;
use crate::routing::RouteError;
use crate::store::{FileRouteStore, MemoryRouteStore, RouteStore, StoreError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to open route store: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to build routes: {0}")]
    Routing(#[from] RouteError),
}

/// The wired routing and access services.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn RouteStore>,
    pub registry: Arc<AccessCheckRegistry>,
    pub resolver: Arc<RouteResolver>,
    pub access: Arc<AccessManager>,
    pub builder: Arc<RouteBuilder>,
}

impl Services {
    /// Open the store and wire every service, without touching stored routes.
    pub fn open(config: &StoreConfig) -> Result<Self, StartupError> {
        let store = open_store(config)?;
        let registry = Arc::new(AccessCheckRegistry::new());
        register_builtin_checks(&registry);
        Ok(Self::with_parts(store, registry))
    }

    /// Wire services around an existing store and registry.
    pub fn with_parts(store: Arc<dyn RouteStore>, registry: Arc<AccessCheckRegistry>) -> Self {
        let resolver = Arc::new(RouteResolver::new(store.clone()));
        let access = Arc::new(AccessManager::new(registry.clone(), resolver.clone()));
        let builder = Arc::new(RouteBuilder::new(registry.clone(), RouteDumper::new(store.clone())));
        Self {
            store,
            registry,
            resolver,
            access,
            builder,
        }
    }

    /// Open the configured store and rebuild the configured route set.
    pub fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        let services = Self::open(&config.store)?;
        services.rebuild(&config.store.route_set, config.routes())?;
        Ok(services)
    }

    /// Replace `route_set` with `routes`.
    pub fn rebuild(&self, route_set: &str, routes: Vec<Route>) -> Result<Vec<Route>, RouteError> {
        self.builder.rebuild(route_set, routes)
    }

    /// Replace `route_set` with `routes` and delete `previous` if it differs.
    pub fn rebuild_replacing(
        &self,
        previous: &str,
        route_set: &str,
        routes: Vec<Route>,
    ) -> Result<Vec<Route>, RouteError> {
        self.builder.rebuild_replacing(Some(previous), route_set, routes)
    }

    /// Same store and registry with a fresh resolver and access manager,
    /// so name lookups and check instances start empty.
    pub fn refreshed(&self) -> Self {
        Self::with_parts(self.store.clone(), self.registry.clone())
    }
}

fn open_store(config: &StoreConfig) -> Result<Arc<dyn RouteStore>, StoreError> {
    let store: Arc<dyn RouteStore> = match (config.backend, &config.path) {
        (StoreBackend::File, Some(path)) => Arc::new(FileRouteStore::open(path)?),
        (StoreBackend::File, None) => {
            return Err(StoreError::Unavailable("file store requires a path".to_string()));
        }
        (StoreBackend::Memory, _) => Arc::new(MemoryRouteStore::new()),
    };
    tracing::info!(store = store.name(), route_set = %config.route_set, "Route store opened");
    Ok(store)
}
