//! Configuration file watcher for route set hot reload.
//!
//! Every accepted change triggers a full route set rebuild in the gate, so
//! the watcher only forwards configurations that parse, validate, and differ
//! from the last forwarded file contents. Editors commonly emit several
//! modify events per save; the repeats are dropped here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::AppConfig;

/// Watches the configuration file and sends validated updates.
pub struct ConfigWatcher {
    source: ReloadSource,
    update_tx: mpsc::UnboundedSender<AppConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for validated configuration updates.
    ///
    /// The file contents at this point count as already applied.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<AppConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                source: ReloadSource::new(path),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { mut source, update_tx } = self;
        let path = source.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    if let Some(config) = source.poll() {
                        if update_tx.send(config).is_err() {
                            tracing::debug!("Route set reloader gone, dropping update");
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

/// Reads the configuration file and decides whether it warrants a rebuild.
struct ReloadSource {
    path: PathBuf,
    last: Option<String>,
}

impl ReloadSource {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            last: std::fs::read_to_string(path).ok(),
        }
    }

    /// The new configuration, or `None` when it is unchanged or invalid.
    fn poll(&mut self) -> Option<AppConfig> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "Config file unreadable, keeping current routes");
                return None;
            }
        };
        if self.last.as_deref() == Some(content.as_str()) {
            tracing::debug!(path = ?self.path, "Config file unchanged, skipping route rebuild");
            return None;
        }

        match parse_config(&content) {
            Ok(config) => {
                tracing::info!(
                    path = ?self.path,
                    route_set = %config.store.route_set,
                    routes = config.routes.len(),
                    "Config change detected, route set will be rebuilt"
                );
                self.last = Some(content);
                Some(config)
            }
            Err(e) => {
                tracing::error!(error = %e, "Invalid config, keeping current routes");
                None
            }
        }
    }
}
