//! In-memory route table.
//!
//! The table is an immutable snapshot behind an `ArcSwap`. A transaction
//! stages its writes on a private copy and publishes it with a single swap,
//! so concurrent readers observe either the previous or the new table.
//! Writers are serialized by a mutex.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;

use crate::store::{RouteRow, RouteStore, RouteTransaction, StoreError, StoreResult, TransactionWork};

/// A thread-safe, snapshot-isolated route table.
pub struct MemoryRouteStore {
    table: ArcSwap<Vec<RouteRow>>,
    writer: Mutex<()>,
}

impl MemoryRouteStore {
    pub fn new() -> Self {
        Self::with_rows(Vec::new())
    }

    /// Start from previously persisted rows.
    pub fn with_rows(rows: Vec<RouteRow>) -> Self {
        Self {
            table: ArcSwap::from_pointee(rows),
            writer: Mutex::new(()),
        }
    }

    /// Current snapshot of every row.
    pub fn snapshot(&self) -> Arc<Vec<RouteRow>> {
        self.table.load_full()
    }

    /// Run `work` and, before publishing, hand the staged table to `on_commit`.
    ///
    /// An error from either discards the staged table.
    pub(crate) fn transaction_with(
        &self,
        work: &mut TransactionWork<'_>,
        on_commit: &dyn Fn(&[RouteRow]) -> StoreResult<()>,
    ) -> StoreResult<()> {
        let _guard = self.writer.lock().expect("route store writer mutex poisoned");

        let mut staged = StagedTable {
            rows: (**self.table.load()).clone(),
        };
        if let Err(e) = work(&mut staged) {
            tracing::debug!(error = %e, "Route store transaction rolled back");
            return Err(e);
        }
        on_commit(&staged.rows)?;

        tracing::debug!(rows = staged.rows.len(), "Route store transaction committed");
        self.table.store(Arc::new(staged.rows));
        Ok(())
    }
}

impl Default for MemoryRouteStore {
    fn default() -> Self {
        Self::new()
    }
}

struct StagedTable {
    rows: Vec<RouteRow>,
}

impl RouteTransaction for StagedTable {
    fn delete_route_set(&mut self, route_set: &str) -> StoreResult<usize> {
        let before = self.rows.len();
        self.rows.retain(|row| row.route_set != route_set);
        Ok(before - self.rows.len())
    }

    fn insert(&mut self, row: RouteRow) -> StoreResult<()> {
        let exists = self
            .rows
            .iter()
            .any(|r| r.route_set == row.route_set && r.name == row.name);
        if exists {
            return Err(StoreError::DuplicateRoute {
                route_set: row.route_set,
                name: row.name,
            });
        }
        self.rows.push(row);
        Ok(())
    }
}

impl RouteStore for MemoryRouteStore {
    fn transaction(&self, work: &mut TransactionWork<'_>) -> StoreResult<()> {
        self.transaction_with(work, &|_| Ok(()))
    }

    fn find_by_outlines(&self, outlines: &[String]) -> StoreResult<Vec<RouteRow>> {
        let wanted: HashSet<&str> = outlines.iter().map(String::as_str).collect();
        let table = self.table.load();
        let mut rows: Vec<RouteRow> = table
            .iter()
            .filter(|row| wanted.contains(row.pattern_outline.as_str()))
            .cloned()
            .collect();
        // Stable: equal fits keep insertion order.
        rows.sort_by(|a, b| b.fit.cmp(&a.fit));
        Ok(rows)
    }

    fn find_by_names(&self, names: &[String]) -> StoreResult<Vec<RouteRow>> {
        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        let table = self.table.load();
        Ok(table
            .iter()
            .filter(|row| wanted.contains(row.name.as_str()))
            .cloned()
            .collect())
    }

    fn count(&self, route_set: &str) -> StoreResult<usize> {
        Ok(self
            .table
            .load()
            .iter()
            .filter(|row| row.route_set == route_set)
            .count())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(set: &str, name: &str, outline: &str, fit: u32) -> RouteRow {
        RouteRow {
            name: name.into(),
            route_set: set.into(),
            fit,
            pattern: outline.into(),
            pattern_outline: outline.into(),
            num_parts: outline.split('/').filter(|s| !s.is_empty()).count(),
            route: "{}".into(),
        }
    }

    fn replace(store: &MemoryRouteStore, set: &str, rows: Vec<RouteRow>) -> StoreResult<()> {
        store.transaction(&mut |tx| {
            tx.delete_route_set(set)?;
            for r in &rows {
                tx.insert(r.clone())?;
            }
            Ok(())
        })
    }

    #[test]
    fn test_outline_lookup_orders_by_fit() {
        let store = MemoryRouteStore::new();
        replace(
            &store,
            "main",
            vec![
                row("main", "wild", "/node/%", 0b10),
                row("main", "exact", "/node/add", 0b11),
                row("main", "other", "/user/%", 0b10),
            ],
        )
        .unwrap();

        let rows = store
            .find_by_outlines(&["/node/%".to_string(), "/node/add".to_string()])
            .unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["exact", "wild"]);
    }

    #[test]
    fn test_replace_only_touches_its_route_set() {
        let store = MemoryRouteStore::new();
        replace(&store, "a", vec![row("a", "one", "/one", 1)]).unwrap();
        replace(&store, "b", vec![row("b", "two", "/two", 1)]).unwrap();
        replace(&store, "a", vec![row("a", "three", "/three", 1)]).unwrap();

        assert_eq!(store.count("a").unwrap(), 1);
        assert_eq!(store.count("b").unwrap(), 1);
        assert!(store.find_by_names(&["one".to_string()]).unwrap().is_empty());
    }

    #[test]
    fn test_failed_insert_rolls_back() {
        let store = MemoryRouteStore::new();
        replace(&store, "a", vec![row("a", "keep", "/keep", 1)]).unwrap();

        let err = replace(
            &store,
            "a",
            vec![row("a", "dup", "/dup", 1), row("a", "dup", "/dup2", 1)],
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateRoute { .. }));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "keep");
    }

    #[test]
    fn test_failed_commit_hook_discards_staged_rows() {
        let store = MemoryRouteStore::new();
        let result = store.transaction_with(
            &mut |tx| tx.insert(row("a", "x", "/x", 1)),
            &|_| Err(StoreError::Unavailable("disk full".into())),
        );
        assert!(result.is_err());
        assert_eq!(store.count("a").unwrap(), 0);
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let store = MemoryRouteStore::new();
        replace(&store, "a", vec![row("a", "old", "/old", 1)]).unwrap();

        let before = store.snapshot();
        replace(&store, "a", vec![row("a", "new", "/new", 1)]).unwrap();

        assert_eq!(before[0].name, "old");
        assert_eq!(store.snapshot()[0].name, "new");
    }
}
