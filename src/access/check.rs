//! Access check capability model.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::access::context::RequestContext;
use crate::routing::route::Route;

/// Outcome of a single access check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessResult {
    /// The check grants access.
    Allow,
    /// The check does not grant access; other checks may still decide.
    #[default]
    Deny,
    /// Deny and stop evaluating, regardless of earlier grants.
    Kill,
}

impl AccessResult {
    /// `Allow` when `condition` holds, `Deny` otherwise.
    pub fn allow_if(condition: bool) -> Self {
        if condition {
            AccessResult::Allow
        } else {
            AccessResult::Deny
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessResult::Allow => "allow",
            AccessResult::Deny => "deny",
            AccessResult::Kill => "kill",
        }
    }
}

impl fmt::Display for AccessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks that declare up front which requirement keys they handle.
pub trait StaticAccessCheck {
    fn applies_to(&self) -> Vec<String>;
}

/// Checks that decide per route whether they apply.
pub trait DynamicAccessCheck {
    fn applies(&self, route: &Route) -> bool;
}

/// How the registry should index a check.
pub enum CheckCapability<'a> {
    Static(&'a dyn StaticAccessCheck),
    Dynamic(&'a dyn DynamicAccessCheck),
}

/// A service that votes on access to a route.
pub trait AccessCheck: Send + Sync + fmt::Debug {
    /// Whether the check is indexed by requirement key or asked per route.
    fn capability(&self) -> CheckCapability<'_>;

    fn access(&self, route: &Route, request: &RequestContext) -> AccessResult;
}

/// Produces a fresh check instance for a registered service id.
pub type CheckFactory = Arc<dyn Fn() -> Arc<dyn AccessCheck> + Send + Sync>;
