//! Route entity and ordered route collections.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::routing::compiler::CompiledRoute;

/// How the results of a route's attached access checks are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessMode {
    /// Every attached check must allow; the first non-allow stops evaluation.
    All,
    /// At least one check must allow and none may kill.
    #[default]
    Any,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::All => "ALL",
            AccessMode::Any => "ANY",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named path-matching rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Unique identifier within a route set.
    pub name: String,

    /// Raw path pattern, e.g. `/node/{nid}/edit`.
    pub pattern: String,

    /// Default values for placeholders and other attributes.
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,

    /// Placeholder constraints and access requirements (keys starting with `_`).
    #[serde(default)]
    pub requirements: BTreeMap<String, String>,

    /// Access check ids attached by the registry, in evaluation order.
    #[serde(default)]
    pub access_checks: Vec<String>,

    /// Conjunction policy for `access_checks`.
    #[serde(default)]
    pub access_mode: AccessMode,

    /// Compiled form, filled in by the dumper before persisting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiled: Option<CompiledRoute>,
}

impl Route {
    /// Create a route with no defaults, requirements or attached checks.
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            defaults: BTreeMap::new(),
            requirements: BTreeMap::new(),
            access_checks: Vec::new(),
            access_mode: AccessMode::default(),
            compiled: None,
        }
    }

    pub fn with_requirement(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.requirements.insert(key.into(), value.into());
        self
    }

    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(key.into(), value.into());
        self
    }

    pub fn with_access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = mode;
        self
    }

    pub fn requirement(&self, key: &str) -> Option<&str> {
        self.requirements.get(key).map(String::as_str)
    }

    pub fn has_requirement(&self, key: &str) -> bool {
        self.requirements.contains_key(key)
    }

    /// Extract placeholder values from `path`, falling back to defaults.
    ///
    /// Returns `None` when the route is not compiled or the path does not
    /// match its regex.
    pub fn parameters(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let captured = self.compiled.as_ref()?.captures(path)?;
        let mut params = self.defaults.clone();
        params.extend(captured);
        Some(params)
    }
}

/// Routes in resolution order (fit descending, regex-confirmed).
#[derive(Debug, Clone, Default)]
pub struct RouteCollection {
    routes: Vec<Arc<Route>>,
}

impl RouteCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, route: Arc<Route>) {
        self.routes.push(route);
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// The most specific matching route.
    pub fn first(&self) -> Option<&Arc<Route>> {
        self.routes.first()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Route>> {
        self.routes.iter().find(|r| r.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.iter()
    }
}

impl IntoIterator for RouteCollection {
    type Item = Arc<Route>;
    type IntoIter = std::vec::IntoIter<Arc<Route>>;

    fn into_iter(self) -> Self::IntoIter {
        self.routes.into_iter()
    }
}

impl FromIterator<Arc<Route>> for RouteCollection {
    fn from_iter<I: IntoIterator<Item = Arc<Route>>>(iter: I) -> Self {
        Self {
            routes: iter.into_iter().collect(),
        }
    }
}
