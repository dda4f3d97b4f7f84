//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Compile every route pattern up front
//! - Validate addresses and storage settings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{AppConfig, StoreBackend};
use crate::routing::compiler::{PathPatternCompiler, PatternCompiler, PatternError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("route set name must not be empty")]
    EmptyRouteSet,

    #[error("file store requires a path")]
    MissingStorePath,

    #[error("invalid {field} '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("request_timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("account_header must not be empty")]
    EmptyAccountHeader,

    #[error("route name must not be empty")]
    EmptyRouteName,

    #[error("duplicate route name '{0}'")]
    DuplicateRoute(String),

    #[error("route '{name}': path '{path}' must start with '/'")]
    RelativePath { name: String, path: String },

    #[error("route '{name}': {reason}")]
    Pattern { name: String, reason: String },

    #[error("duplicate account id '{0}'")]
    DuplicateAccount(String),
}

/// Check `config` for semantic errors, collecting every one found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.store.route_set.trim().is_empty() {
        errors.push(ValidationError::EmptyRouteSet);
    }
    if config.store.backend == StoreBackend::File && config.store.path.is_none() {
        errors.push(ValidationError::MissingStorePath);
    }

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "bind_address",
            value: config.server.bind_address.clone(),
        });
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.server.account_header.trim().is_empty() {
        errors.push(ValidationError::EmptyAccountHeader);
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    let mut names = HashSet::new();
    for route in &config.routes {
        if route.name.trim().is_empty() {
            errors.push(ValidationError::EmptyRouteName);
        } else if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }

        if !route.path.starts_with('/') {
            errors.push(ValidationError::RelativePath {
                name: route.name.clone(),
                path: route.path.clone(),
            });
            continue;
        }
        if let Err(e) = PathPatternCompiler.compile(&route.to_route()) {
            errors.push(pattern_error(&route.name, e));
        }
    }

    let mut ids = HashSet::new();
    for account in &config.accounts {
        if !ids.insert(account.id.as_str()) {
            errors.push(ValidationError::DuplicateAccount(account.id.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn pattern_error(name: &str, error: PatternError) -> ValidationError {
    ValidationError::Pattern {
        name: name.to_string(),
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::context::Account;
    use crate::config::schema::RouteConfig;
    use std::collections::BTreeMap;

    fn route(name: &str, path: &str) -> RouteConfig {
        RouteConfig {
            name: name.to_string(),
            path: path.to_string(),
            defaults: BTreeMap::new(),
            requirements: BTreeMap::new(),
            access_mode: Default::default(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&AppConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = AppConfig::default();
        config.store.backend = StoreBackend::File;
        config.store.route_set = String::new();
        config.server.bind_address = "not-an-address".to_string();
        config.routes = vec![
            route("a", "/a"),
            route("a", "/a2"),
            route("rel", "rel/path"),
            route("bad", "/bad/{x"),
            route("lead", "/{lang}/about"),
        ];
        config.accounts = vec![Account::anonymous(), Account::anonymous()];

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::EmptyRouteSet));
        assert!(errors.contains(&ValidationError::MissingStorePath));
        assert!(errors.contains(&ValidationError::DuplicateRoute("a".into())));
        assert!(errors.contains(&ValidationError::DuplicateAccount("0".into())));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::RelativePath { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::Pattern { name, .. } if name == "bad")));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::Pattern { name, .. } if name == "lead")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidAddress { field: "bind_address", .. })));
        assert_eq!(errors.len(), 8);
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = AppConfig::default();
        config.observability.metrics_address = "nope".to_string();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
