//! Route lookup by path and by name.
//!
//! # Responsibilities
//! - Turn a request path into its candidate outlines
//! - Fetch rows for those outlines, most specific first
//! - Confirm each candidate against the real path with its compiled regex
//! - Resolve names directly, caching hits for the life of the resolver
//!
//! # Design Decisions
//! - Work is bounded by outlines that actually have stored routes
//! - Placeholder constraints are enforced by the regex pass, not the outline
//! - The name cache is per instance and never invalidated; build a new
//!   resolver to observe a replaced route set by name

use std::sync::Arc;

use dashmap::DashMap;

use crate::observability::metrics;
use crate::routing::compiler::{PathPatternCompiler, PatternCompiler};
use crate::routing::outline::{candidate_outlines, normalize_path, path_parts};
use crate::routing::route::{Route, RouteCollection};
use crate::routing::{RouteError, RouteResult};
use crate::store::{RouteRow, RouteStore, StoreError};

/// Resolves request paths and route names against a [`RouteStore`].
pub struct RouteResolver {
    store: Arc<dyn RouteStore>,
    by_name: DashMap<String, Arc<Route>>,
}

impl RouteResolver {
    pub fn new(store: Arc<dyn RouteStore>) -> Self {
        Self {
            store,
            by_name: DashMap::new(),
        }
    }

    /// Every route matching `path`, most specific first.
    ///
    /// Fails with [`RouteError::PathNotFound`] when nothing survives the
    /// regex pass; store failures propagate as [`RouteError::Store`].
    pub fn resolve_path(&self, path: &str) -> RouteResult<RouteCollection> {
        let normalized = normalize_path(path);
        let outlines = candidate_outlines(&path_parts(&normalized));

        let rows = match self.store.find_by_outlines(&outlines) {
            Ok(rows) => rows,
            Err(e) => {
                metrics::record_lookup("error");
                return Err(e.into());
            }
        };

        let mut routes = RouteCollection::new();
        for row in &rows {
            let route = decode(row)?;
            let confirmed = route
                .compiled
                .as_ref()
                .is_some_and(|compiled| compiled.is_match(&normalized));
            if confirmed {
                routes.push(Arc::new(route));
            }
        }

        if routes.is_empty() {
            tracing::debug!(path = %normalized, candidates = rows.len(), "No route matched");
            metrics::record_lookup("not_found");
            return Err(RouteError::PathNotFound(normalized));
        }

        tracing::debug!(
            path = %normalized,
            candidates = rows.len(),
            matched = ?routes.names(),
            "Path resolved"
        );
        metrics::record_lookup("found");
        Ok(routes)
    }

    /// Look up a single route by name.
    pub fn route_by_name(&self, name: &str) -> RouteResult<Arc<Route>> {
        self.routes_by_names(&[name])?
            .into_iter()
            .next()
            .ok_or_else(|| RouteError::NameNotFound(name.to_string()))
    }

    /// Look up several routes in one store round-trip.
    ///
    /// Unknown names are skipped; results follow the order of `names`.
    pub fn routes_by_names(&self, names: &[&str]) -> RouteResult<Vec<Arc<Route>>> {
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !self.by_name.contains_key(**name))
            .map(|name| name.to_string())
            .collect();

        if !missing.is_empty() {
            for row in self.store.find_by_names(&missing)? {
                if self.by_name.contains_key(&row.name) {
                    continue;
                }
                let route = Arc::new(decode(&row)?);
                self.by_name.insert(row.name.clone(), route);
            }
        }

        Ok(names
            .iter()
            .filter_map(|name| self.by_name.get(*name).map(|r| r.value().clone()))
            .collect())
    }

    /// Number of names currently cached.
    pub fn cached_names(&self) -> usize {
        self.by_name.len()
    }
}

/// Deserialize a stored route, recompiling it if the row predates compilation.
fn decode(row: &RouteRow) -> RouteResult<Route> {
    let mut route: Route = serde_json::from_str(&row.route).map_err(StoreError::from)?;
    if route.compiled.is_none() {
        route.compiled = Some(PathPatternCompiler.compile(&route)?);
    }
    Ok(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::dumper::RouteDumper;
    use crate::store::{MemoryRouteStore, StoreResult, TransactionWork};

    fn resolver_with(routes: &[Route]) -> (Arc<MemoryRouteStore>, RouteResolver) {
        let store = Arc::new(MemoryRouteStore::new());
        RouteDumper::new(store.clone()).dump(routes, "main").unwrap();
        (store.clone(), RouteResolver::new(store))
    }

    #[test]
    fn test_resolve_orders_by_fit() {
        let (_, resolver) = resolver_with(&[
            Route::new("node.page", "/node/{nid}/{op}"),
            Route::new("node.edit", "/node/{nid}/edit"),
            Route::new("node.add", "/node/add/edit"),
        ]);

        let routes = resolver.resolve_path("/node/add/edit").unwrap();
        assert_eq!(routes.names(), vec!["node.add", "node.edit", "node.page"]);

        let routes = resolver.resolve_path("/node/7/edit").unwrap();
        assert_eq!(routes.names(), vec!["node.edit", "node.page"]);
    }

    #[test]
    fn test_regex_pass_enforces_constraints() {
        let (_, resolver) = resolver_with(&[
            Route::new("node.view", "/node/{nid}").with_requirement("nid", "\\d+"),
        ]);

        assert!(resolver.resolve_path("/node/12").is_ok());
        let err = resolver.resolve_path("/node/abc").unwrap_err();
        assert!(matches!(err, RouteError::PathNotFound(ref p) if p == "/node/abc"));
    }

    #[test]
    fn test_shorter_prefix_finds_optional_placeholders() {
        let (_, resolver) = resolver_with(&[
            Route::new("node.page", "/node/{nid}/{op}").with_default("op", "view"),
        ]);

        let routes = resolver.resolve_path("/node/3").unwrap();
        assert_eq!(routes.names(), vec!["node.page"]);
        let routes = resolver.resolve_path("/node/3/delete").unwrap();
        let params = routes.first().unwrap().parameters("/node/3/delete").unwrap();
        assert_eq!(params.get("op").map(String::as_str), Some("delete"));
    }

    #[test]
    fn test_root_path() {
        let (_, resolver) = resolver_with(&[Route::new("front", "/")]);
        assert_eq!(resolver.resolve_path("").unwrap().names(), vec!["front"]);
        assert!(resolver.resolve_path("/x").unwrap_err().is_not_found());
    }

    #[test]
    fn test_name_lookup_is_cached() {
        let (store, resolver) = resolver_with(&[Route::new("about", "/about")]);
        assert_eq!(resolver.route_by_name("about").unwrap().pattern, "/about");
        assert_eq!(resolver.cached_names(), 1);

        // A later replacement is not observed by this instance.
        RouteDumper::new(store).dump(&[Route::new("about", "/about-us")], "main").unwrap();
        assert_eq!(resolver.route_by_name("about").unwrap().pattern, "/about");
    }

    #[test]
    fn test_batch_name_lookup_skips_unknown() {
        let (_, resolver) = resolver_with(&[Route::new("a", "/a"), Route::new("b", "/b")]);
        let routes = resolver.routes_by_names(&["b", "zzz", "a"]).unwrap();
        let names: Vec<_> = routes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);

        let err = resolver.route_by_name("zzz").unwrap_err();
        assert!(matches!(err, RouteError::NameNotFound(_)));
    }

    struct DownStore;

    impl RouteStore for DownStore {
        fn transaction(&self, _work: &mut TransactionWork<'_>) -> StoreResult<()> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        fn find_by_outlines(&self, _outlines: &[String]) -> StoreResult<Vec<RouteRow>> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        fn find_by_names(&self, _names: &[String]) -> StoreResult<Vec<RouteRow>> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        fn count(&self, _route_set: &str) -> StoreResult<usize> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        fn name(&self) -> &'static str {
            "down"
        }
    }

    #[test]
    fn test_store_outage_is_not_a_miss() {
        let resolver = RouteResolver::new(Arc::new(DownStore));

        let err = resolver.resolve_path("/node/1").unwrap_err();
        assert!(matches!(err, RouteError::Store(StoreError::Unavailable(_))));
        assert!(!err.is_not_found());

        let err = resolver.route_by_name("about").unwrap_err();
        assert!(!err.is_not_found());
    }
}
