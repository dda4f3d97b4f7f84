//! Access check registry and requirement map.
//!
//! # Responsibilities
//! - Hold the registered check services (id → factory), in registration order
//! - Build the requirement map once, on first use
//! - Attach the applicable check ids to routes ahead of request time
//!
//! # Design Decisions
//! - The map is built behind a single-initialization cell; concurrent first
//!   use builds it exactly once
//! - Registration after the map is built is refused; `reset` re-opens it
//! - Attachment order follows requirement key order, then registration order;
//!   a check reachable through several keys is attached once per key

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use once_cell::sync::OnceCell;

use crate::access::check::{AccessCheck, CheckCapability, CheckFactory};
use crate::access::AccessError;
use crate::routing::route::Route;

/// Build-once index from requirement keys to check ids.
#[derive(Debug, Default)]
pub struct RequirementMap {
    static_checks: HashMap<String, Vec<String>>,
    dynamic_checks: Vec<(String, Arc<dyn AccessCheck>)>,
}

impl RequirementMap {
    /// Ids of static checks claiming `key`, in registration order.
    pub fn static_checks(&self, key: &str) -> Option<&[String]> {
        self.static_checks.get(key).map(Vec::as_slice)
    }

    /// Ids of checks that must be asked per route.
    pub fn dynamic_checks(&self) -> impl Iterator<Item = &str> {
        self.dynamic_checks.iter().map(|(id, _)| id.as_str())
    }

    pub fn static_keys(&self) -> usize {
        self.static_checks.len()
    }
}

/// Registered access check services.
pub struct AccessCheckRegistry {
    services: RwLock<Vec<(String, CheckFactory)>>,
    requirement_map: OnceCell<RequirementMap>,
}

impl AccessCheckRegistry {
    pub fn new() -> Self {
        Self {
            services: RwLock::new(Vec::new()),
            requirement_map: OnceCell::new(),
        }
    }

    /// Register a check service under `id`.
    ///
    /// Returns `false` (and changes nothing) when the id is already taken or
    /// the requirement map has been built.
    pub fn register<F>(&self, id: impl Into<String>, factory: F) -> bool
    where
        F: Fn() -> Arc<dyn AccessCheck> + Send + Sync + 'static,
    {
        let id = id.into();

        // The map is built under the read lock, so once the write lock is
        // held it is either complete or not yet started.
        let mut services = self.services.write().expect("access check registry lock poisoned");
        if self.requirement_map.get().is_some() {
            tracing::warn!(check = %id, "Requirement map already built, registration ignored");
            return false;
        }
        if services.iter().any(|(existing, _)| *existing == id) {
            tracing::warn!(check = %id, "Access check already registered");
            return false;
        }
        tracing::debug!(check = %id, "Access check registered");
        services.push((id, Arc::new(factory)));
        true
    }

    /// Register an existing instance; every instantiation shares it.
    pub fn register_instance(&self, id: impl Into<String>, check: Arc<dyn AccessCheck>) -> bool {
        self.register(id, move || check.clone())
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.services
            .read()
            .expect("access check registry lock poisoned")
            .iter()
            .any(|(existing, _)| existing == id)
    }

    /// Registered ids in registration order.
    pub fn check_ids(&self) -> Vec<String> {
        self.services
            .read()
            .expect("access check registry lock poisoned")
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Create an instance of the check registered as `id`.
    pub fn instantiate(&self, id: &str) -> Result<Arc<dyn AccessCheck>, AccessError> {
        let factory = self
            .services
            .read()
            .expect("access check registry lock poisoned")
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, factory)| factory.clone())
            .ok_or_else(|| AccessError::UnregisteredChecker(id.to_string()))?;
        Ok(factory())
    }

    /// The requirement map, built on first call.
    pub fn requirement_map(&self) -> &RequirementMap {
        if let Some(map) = self.requirement_map.get() {
            return map;
        }
        let services = self.services.read().expect("access check registry lock poisoned");
        self.requirement_map.get_or_init(|| build_requirement_map(&services))
    }

    /// Set `route.access_checks` from its requirement keys.
    pub fn attach_checks(&self, route: &mut Route) {
        let map = self.requirement_map();
        let mut checks = Vec::new();

        for key in route.requirements.keys() {
            if let Some(ids) = map.static_checks(key) {
                checks.extend(ids.iter().cloned());
                continue;
            }
            for (id, check) in &map.dynamic_checks {
                if let CheckCapability::Dynamic(dynamic) = check.capability() {
                    if dynamic.applies(route) {
                        checks.push(id.clone());
                    }
                }
            }
        }

        tracing::debug!(route = %route.name, checks = ?checks, "Access checks attached");
        route.access_checks = checks;
    }

    /// Attach checks to every route in `routes`.
    pub fn set_checks(&self, routes: &mut [Route]) {
        for route in routes.iter_mut() {
            self.attach_checks(route);
        }
    }

    /// Drop the requirement map so it is rebuilt, and registration re-opens.
    pub fn reset(&mut self) {
        self.requirement_map.take();
    }
}

fn build_requirement_map(services: &[(String, CheckFactory)]) -> RequirementMap {
    let mut map = RequirementMap::default();
    for (id, factory) in services {
        let check = factory();
        match check.capability() {
            CheckCapability::Static(declared) => {
                for key in declared.applies_to() {
                    map.static_checks.entry(key).or_default().push(id.clone());
                }
            }
            CheckCapability::Dynamic(_) => {
                map.dynamic_checks.push((id.clone(), check.clone()));
            }
        }
    }

    tracing::info!(
        static_keys = map.static_checks.len(),
        dynamic_checks = map.dynamic_checks.len(),
        "Requirement map built"
    );
    map
}

impl Default for AccessCheckRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AccessCheckRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessCheckRegistry")
            .field("checks", &self.check_ids())
            .field("built", &self.requirement_map.get().is_some())
            .finish()
    }
}
