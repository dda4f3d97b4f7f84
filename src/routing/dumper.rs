//! Route set persistence.
//!
//! # Responsibilities
//! - Compile every route before touching the store (fail fast)
//! - Build one row per route, carrying the serialized compiled route
//! - Replace the route set inside a single store transaction
//!
//! # Design Decisions
//! - A malformed pattern aborts the dump before any write is staged
//! - An insert failure rolls the whole replacement back
//! - Dumping the same routes twice yields the same stored rows

use std::sync::Arc;

use crate::observability::metrics;
use crate::routing::compiler::{PathPatternCompiler, PatternCompiler};
use crate::routing::route::Route;
use crate::routing::RouteResult;
use crate::store::{RouteRow, RouteStore, StoreError};

/// Writes compiled routes into a [`RouteStore`].
pub struct RouteDumper {
    store: Arc<dyn RouteStore>,
    compiler: Arc<dyn PatternCompiler>,
}

impl RouteDumper {
    /// Create a dumper using the stock pattern compiler.
    pub fn new(store: Arc<dyn RouteStore>) -> Self {
        Self::with_compiler(store, Arc::new(PathPatternCompiler))
    }

    pub fn with_compiler(store: Arc<dyn RouteStore>, compiler: Arc<dyn PatternCompiler>) -> Self {
        Self { store, compiler }
    }

    /// Atomically replace every row of `route_set` with `routes`.
    ///
    /// Returns the number of rows written.
    pub fn dump(&self, routes: &[Route], route_set: &str) -> RouteResult<usize> {
        self.dump_replacing(routes, route_set, None)
    }

    /// Like [`dump`](Self::dump), also deleting `retired` in the same
    /// transaction when it names a different route set.
    pub fn dump_replacing(&self, routes: &[Route], route_set: &str, retired: Option<&str>) -> RouteResult<usize> {
        let rows = routes
            .iter()
            .map(|route| self.build_row(route, route_set))
            .collect::<RouteResult<Vec<_>>>()?;
        let retired = retired.filter(|set| *set != route_set);

        let mut removed = 0;
        self.store.transaction(&mut |tx| {
            removed = tx.delete_route_set(route_set)?;
            if let Some(set) = retired {
                removed += tx.delete_route_set(set)?;
            }
            for row in &rows {
                tx.insert(row.clone())?;
            }
            Ok(())
        })?;

        tracing::info!(
            route_set = %route_set,
            retired = retired.unwrap_or("-"),
            store = self.store.name(),
            removed,
            inserted = rows.len(),
            "Route set dumped"
        );
        metrics::record_dump(route_set, rows.len());
        Ok(rows.len())
    }

    fn build_row(&self, route: &Route, route_set: &str) -> RouteResult<RouteRow> {
        let compiled = self.compiler.compile(route)?;
        let fit = compiled.fit;
        let pattern_outline = compiled.pattern_outline.clone();
        let num_parts = compiled.num_parts;

        let mut stored = route.clone();
        stored.compiled = Some(compiled);
        let serialized = serde_json::to_string(&stored).map_err(StoreError::from)?;

        Ok(RouteRow {
            name: route.name.clone(),
            route_set: route_set.to_string(),
            fit,
            pattern: route.pattern.clone(),
            pattern_outline,
            num_parts,
            route: serialized,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::compiler::{CompiledRoute, PatternError, PatternResult};
    use crate::routing::RouteError;
    use crate::store::MemoryRouteStore;

    #[test]
    fn test_rows_carry_compiled_route() {
        let store = Arc::new(MemoryRouteStore::new());
        let dumper = RouteDumper::new(store.clone());

        let written = dumper
            .dump(&[Route::new("node.edit", "/node/{nid}/edit")], "main")
            .unwrap();
        assert_eq!(written, 1);

        let rows = store.snapshot();
        assert_eq!(rows[0].fit, 0b101);
        assert_eq!(rows[0].pattern_outline, "/node/%/edit");
        assert_eq!(rows[0].num_parts, 3);

        let route: Route = serde_json::from_str(&rows[0].route).unwrap();
        assert!(route.compiled.unwrap().is_match("/node/1/edit"));
    }

    #[test]
    fn test_dump_is_idempotent() {
        let store = Arc::new(MemoryRouteStore::new());
        let dumper = RouteDumper::new(store.clone());
        let routes = vec![
            Route::new("a", "/a"),
            Route::new("b", "/b/{x}"),
        ];

        dumper.dump(&routes, "main").unwrap();
        let first = store.snapshot();
        dumper.dump(&routes, "main").unwrap();
        assert_eq!(*first, *store.snapshot());
    }

    #[test]
    fn test_malformed_pattern_aborts_before_writing() {
        let store = Arc::new(MemoryRouteStore::new());
        let dumper = RouteDumper::new(store.clone());
        dumper.dump(&[Route::new("old", "/old")], "main").unwrap();

        let err = dumper
            .dump(
                &[Route::new("ok", "/ok"), Route::new("bad", "/bad/{x")],
                "main",
            )
            .unwrap_err();
        assert!(matches!(err, RouteError::Pattern(PatternError::UnbalancedBraces { .. })));
        assert_eq!(store.snapshot()[0].name, "old");
    }

    #[test]
    fn test_retired_route_set_is_removed_with_the_dump() {
        let store = Arc::new(MemoryRouteStore::new());
        let dumper = RouteDumper::new(store.clone());
        dumper.dump(&[Route::new("old", "/old")], "a").unwrap();
        dumper.dump(&[Route::new("other", "/other")], "c").unwrap();

        dumper
            .dump_replacing(&[Route::new("new", "/new")], "b", Some("a"))
            .unwrap();
        assert_eq!(store.count("a").unwrap(), 0);
        assert_eq!(store.count("b").unwrap(), 1);
        assert_eq!(store.count("c").unwrap(), 1);

        // Retiring the set being written keeps the fresh rows.
        dumper
            .dump_replacing(&[Route::new("new", "/new")], "b", Some("b"))
            .unwrap();
        assert_eq!(store.count("b").unwrap(), 1);
    }

    #[test]
    fn test_failed_dump_keeps_retired_set() {
        let store = Arc::new(MemoryRouteStore::new());
        let dumper = RouteDumper::new(store.clone());
        dumper.dump(&[Route::new("old", "/old")], "a").unwrap();

        let duplicate = [Route::new("x", "/x"), Route::new("x", "/y")];
        assert!(dumper.dump_replacing(&duplicate, "b", Some("a")).is_err());
        assert_eq!(store.count("a").unwrap(), 1);
        assert_eq!(store.count("b").unwrap(), 0);
    }

    #[derive(Debug)]
    struct RejectEverything;

    impl PatternCompiler for RejectEverything {
        fn compile(&self, route: &Route) -> PatternResult<CompiledRoute> {
            Err(PatternError::UnbalancedBraces {
                pattern: route.pattern.clone(),
            })
        }
    }

    #[test]
    fn test_custom_compiler_is_used() {
        let store = Arc::new(MemoryRouteStore::new());
        let dumper = RouteDumper::with_compiler(store.clone(), Arc::new(RejectEverything));
        assert!(dumper.dump(&[Route::new("a", "/a")], "main").is_err());
        assert_eq!(store.count("main").unwrap(), 0);
    }
}
