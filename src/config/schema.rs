//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::access::context::Account;
use crate::routing::route::{AccessMode, Route};

/// Root configuration for the access gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Route table storage.
    pub store: StoreConfig,

    /// HTTP gate settings.
    pub server: ServerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Route definitions, dumped as one route set.
    pub routes: Vec<RouteConfig>,

    /// Known accounts; anything else is anonymous.
    pub accounts: Vec<Account>,
}

impl AppConfig {
    /// The configured routes as domain routes, in file order.
    pub fn routes(&self) -> Vec<Route> {
        self.routes.iter().map(RouteConfig::to_route).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    File,
}

/// Route table storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// JSON file for the `file` backend.
    pub path: Option<PathBuf>,

    /// Route set the configured routes are dumped into.
    pub route_set: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: None,
            route_set: "main".to_string(),
        }
    }
}

/// HTTP gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Header carrying the caller's account id.
    pub account_header: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            account_header: "x-account-id".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A route as written in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Unique route name.
    pub name: String,

    /// Path pattern, e.g. `/node/{nid}/edit`.
    pub path: String,

    #[serde(default)]
    pub defaults: BTreeMap<String, String>,

    /// Placeholder constraints and access requirements (`_access`, `_role`, ...).
    #[serde(default)]
    pub requirements: BTreeMap<String, String>,

    #[serde(default)]
    pub access_mode: AccessMode,
}

impl RouteConfig {
    pub fn to_route(&self) -> Route {
        let mut route = Route::new(&self.name, &self.path).with_access_mode(self.access_mode);
        route.defaults = self.defaults.clone();
        route.requirements = self.requirements.clone();
        route
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.route_set, "main");
        assert_eq!(config.server.account_header, "x-account-id");
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config: AppConfig = toml::from_str(
            r#"
            [store]
            backend = "file"
            path = "/var/lib/routes.json"
            route_set = "site"

            [observability]
            log_format = "json"

            [[routes]]
            name = "node.edit"
            path = "/node/{nid}/edit"
            access_mode = "ALL"
            requirements = { nid = "\\d+", _permission = "edit content" }

            [[accounts]]
            id = "1"
            name = "admin"
            roles = ["administrator"]
            permissions = ["edit content"]
            "#,
        )
        .unwrap();

        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(config.observability.log_format, LogFormat::Json);

        let routes = config.routes();
        assert_eq!(routes[0].access_mode, AccessMode::All);
        assert_eq!(routes[0].requirement("nid"), Some("\\d+"));
        assert!(config.accounts[0].has_permission("edit content"));
    }
}
