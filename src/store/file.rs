//! JSON-file-backed route table.
//!
//! Reads go to the in-memory snapshot; every committed transaction rewrites
//! the file through a temporary sibling and a rename, so a crash mid-write
//! leaves the previous file in place.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::store::memory::MemoryRouteStore;
use crate::store::{RouteRow, RouteStore, StoreResult, TransactionWork};

/// Route table persisted as a JSON array of rows.
pub struct FileRouteStore {
    path: PathBuf,
    inner: MemoryRouteStore,
}

impl FileRouteStore {
    /// Open the store, loading `path` if it exists.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let rows: Vec<RouteRow> = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            serde_json::from_reader(reader)?
        } else {
            Vec::new()
        };

        tracing::info!(path = ?path, rows = rows.len(), "Route table loaded");
        Ok(Self {
            path,
            inner: MemoryRouteStore::with_rows(rows),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, rows: &[RouteRow]) -> StoreResult<()> {
        let tmp = self.path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut writer, rows)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl RouteStore for FileRouteStore {
    fn transaction(&self, work: &mut TransactionWork<'_>) -> StoreResult<()> {
        self.inner.transaction_with(work, &|rows| self.persist(rows))
    }

    fn find_by_outlines(&self, outlines: &[String]) -> StoreResult<Vec<RouteRow>> {
        self.inner.find_by_outlines(outlines)
    }

    fn find_by_names(&self, names: &[String]) -> StoreResult<Vec<RouteRow>> {
        self.inner.find_by_names(names)
    }

    fn count(&self, route_set: &str) -> StoreResult<usize> {
        self.inner.count(route_set)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
