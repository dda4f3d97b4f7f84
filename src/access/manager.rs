//! Access decision engine.
//!
//! # Responsibilities
//! - Evaluate the checks attached to a route, in attachment order
//! - Combine their results under the route's `ALL` / `ANY` mode
//! - Instantiate each check lazily, once per engine
//!
//! # Decision Rules
//! ```text
//! ALL:  Allow → access = true, continue
//!       Deny | Kill → access = false, stop
//! ANY:  Allow → access = true, continue
//!       Kill → return false
//!       Deny → continue
//! Neither mode grants access when no check is attached.
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::access::check::{AccessCheck, AccessResult};
use crate::access::context::{Account, RequestContext};
use crate::access::registry::AccessCheckRegistry;
use crate::access::AccessOutcome;
use crate::observability::metrics;
use crate::routing::resolver::RouteResolver;
use crate::routing::route::{AccessMode, Route};

/// Combines attached access checks into one admit/deny decision.
pub struct AccessManager {
    registry: Arc<AccessCheckRegistry>,
    resolver: Arc<RouteResolver>,
    checks: DashMap<String, Arc<dyn AccessCheck>>,
}

impl AccessManager {
    pub fn new(registry: Arc<AccessCheckRegistry>, resolver: Arc<RouteResolver>) -> Self {
        Self {
            registry,
            resolver,
            checks: DashMap::new(),
        }
    }

    /// Decide whether `request` may reach `route`.
    pub fn check(&self, route: &Route, request: &RequestContext) -> AccessOutcome<bool> {
        let granted = match route.access_mode {
            AccessMode::All => self.check_all(route, request)?,
            AccessMode::Any => self.check_any(route, request)?,
        };

        let result = if granted { "granted" } else { "denied" };
        tracing::debug!(
            route = %route.name,
            mode = %route.access_mode,
            checks = route.access_checks.len(),
            result,
            "Access decided"
        );
        metrics::record_decision(route.access_mode.as_str(), result);
        Ok(granted)
    }

    /// Resolve `name` and check it for `account`, with `parameters` overlaid
    /// on the route defaults. An unknown name is a plain denial.
    pub fn check_named_route(
        &self,
        name: &str,
        parameters: &BTreeMap<String, String>,
        account: &Account,
    ) -> AccessOutcome<bool> {
        let route = match self.resolver.route_by_name(name) {
            Ok(route) => route,
            Err(e) if e.is_not_found() => {
                tracing::debug!(route = %name, "Named route not found, denying");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        let request = RequestContext::for_route(route.clone(), parameters, account.clone());
        self.check(&route, &request)
    }

    /// Number of checks instantiated so far.
    pub fn loaded_checks(&self) -> usize {
        self.checks.len()
    }

    fn check_all(&self, route: &Route, request: &RequestContext) -> AccessOutcome<bool> {
        let mut access = false;
        for id in &route.access_checks {
            match self.load_check(id)?.access(route, request) {
                AccessResult::Allow => access = true,
                result @ (AccessResult::Deny | AccessResult::Kill) => {
                    tracing::trace!(route = %route.name, check = %id, %result, "ALL stopped");
                    return Ok(false);
                }
            }
        }
        Ok(access)
    }

    fn check_any(&self, route: &Route, request: &RequestContext) -> AccessOutcome<bool> {
        let mut access = false;
        for id in &route.access_checks {
            match self.load_check(id)?.access(route, request) {
                AccessResult::Allow => access = true,
                AccessResult::Kill => {
                    tracing::trace!(route = %route.name, check = %id, "ANY vetoed");
                    return Ok(false);
                }
                AccessResult::Deny => {}
            }
        }
        Ok(access)
    }

    fn load_check(&self, id: &str) -> AccessOutcome<Arc<dyn AccessCheck>> {
        if let Some(check) = self.checks.get(id) {
            return Ok(check.value().clone());
        }
        let check = self
            .checks
            .entry(id.to_string())
            .or_try_insert_with(|| self.registry.instantiate(id))?;
        Ok(check.value().clone())
    }
}

impl std::fmt::Debug for AccessManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessManager")
            .field("registry", &self.registry)
            .field("loaded_checks", &self.checks.len())
            .finish()
    }
}
