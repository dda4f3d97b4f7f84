//! Administrative rebuild of a route set.

use std::sync::Arc;

use crate::access::registry::AccessCheckRegistry;
use crate::routing::dumper::RouteDumper;
use crate::routing::route::Route;
use crate::routing::RouteResult;

/// Attaches access checks to routes and persists them in one step.
pub struct RouteBuilder {
    registry: Arc<AccessCheckRegistry>,
    dumper: RouteDumper,
}

impl RouteBuilder {
    pub fn new(registry: Arc<AccessCheckRegistry>, dumper: RouteDumper) -> Self {
        Self { registry, dumper }
    }

    /// Replace `route_set` with `routes`, checks attached.
    ///
    /// Returns the routes as stored so callers can inspect the attachment.
    pub fn rebuild(&self, route_set: &str, routes: Vec<Route>) -> RouteResult<Vec<Route>> {
        self.rebuild_replacing(None, route_set, routes)
    }

    /// Rebuild `route_set` and drop the `previous` set in the same write.
    pub fn rebuild_replacing(
        &self,
        previous: Option<&str>,
        route_set: &str,
        routes: Vec<Route>,
    ) -> RouteResult<Vec<Route>> {
        let mut routes = routes;
        self.registry.set_checks(&mut routes);
        let written = self.dumper.dump_replacing(&routes, route_set, previous)?;
        tracing::info!(route_set = %route_set, routes = written, "Route set rebuilt");
        Ok(routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::builtin::{register_builtin_checks, DEFAULT_CHECK, OWN_ACCOUNT_CHECK};
    use crate::routing::resolver::RouteResolver;
    use crate::store::MemoryRouteStore;

    #[test]
    fn test_rebuild_persists_attached_checks() {
        let store = Arc::new(MemoryRouteStore::new());
        let registry = Arc::new(AccessCheckRegistry::new());
        register_builtin_checks(&registry);
        let builder = RouteBuilder::new(registry, RouteDumper::new(store.clone()));

        let routes = builder
            .rebuild(
                "main",
                vec![
                    Route::new("front", "/").with_requirement("_access", "TRUE"),
                    Route::new("user.edit", "/user/{account}/edit").with_requirement("account", "\\d+"),
                ],
            )
            .unwrap();
        assert_eq!(routes[0].access_checks, vec![DEFAULT_CHECK]);
        assert_eq!(routes[1].access_checks, vec![OWN_ACCOUNT_CHECK]);

        let resolver = RouteResolver::new(store);
        let stored = resolver.route_by_name("user.edit").unwrap();
        assert_eq!(stored.access_checks, vec![OWN_ACCOUNT_CHECK]);
    }
}
