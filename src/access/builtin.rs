//! Stock access checks.
//!
//! | Service id                  | Kind    | Requirement key |
//! |-----------------------------|---------|-----------------|
//! | `access_check.default`      | static  | `_access`       |
//! | `access_check.permission`   | static  | `_permission`   |
//! | `access_check.role`         | static  | `_role`         |
//! | `access_check.own_account`  | dynamic | `{account}`     |

use std::sync::Arc;

use crate::access::check::{AccessCheck, AccessResult, CheckCapability, DynamicAccessCheck, StaticAccessCheck};
use crate::access::context::RequestContext;
use crate::access::registry::AccessCheckRegistry;
use crate::routing::route::Route;

pub const DEFAULT_CHECK: &str = "access_check.default";
pub const PERMISSION_CHECK: &str = "access_check.permission";
pub const ROLE_CHECK: &str = "access_check.role";
pub const OWN_ACCOUNT_CHECK: &str = "access_check.own_account";

/// Register every stock check, in a fixed order.
pub fn register_builtin_checks(registry: &AccessCheckRegistry) {
    registry.register(DEFAULT_CHECK, || Arc::new(DefaultAccessCheck) as Arc<dyn AccessCheck>);
    registry.register(PERMISSION_CHECK, || Arc::new(PermissionAccessCheck) as Arc<dyn AccessCheck>);
    registry.register(ROLE_CHECK, || Arc::new(RoleAccessCheck) as Arc<dyn AccessCheck>);
    registry.register(OWN_ACCOUNT_CHECK, || Arc::new(OwnAccountAccessCheck) as Arc<dyn AccessCheck>);
}

/// `_access: "TRUE"` opens a route; `"FALSE"` closes it outright.
#[derive(Debug, Default)]
pub struct DefaultAccessCheck;

impl StaticAccessCheck for DefaultAccessCheck {
    fn applies_to(&self) -> Vec<String> {
        vec!["_access".to_string()]
    }
}

impl AccessCheck for DefaultAccessCheck {
    fn capability(&self) -> CheckCapability<'_> {
        CheckCapability::Static(self)
    }

    fn access(&self, route: &Route, _request: &RequestContext) -> AccessResult {
        match route.requirement("_access") {
            Some("TRUE") => AccessResult::Allow,
            Some("FALSE") => AccessResult::Kill,
            _ => AccessResult::Deny,
        }
    }
}

/// `_permission: "<name>"`
#[derive(Debug, Default)]
pub struct PermissionAccessCheck;

impl StaticAccessCheck for PermissionAccessCheck {
    fn applies_to(&self) -> Vec<String> {
        vec!["_permission".to_string()]
    }
}

impl AccessCheck for PermissionAccessCheck {
    fn capability(&self) -> CheckCapability<'_> {
        CheckCapability::Static(self)
    }

    fn access(&self, route: &Route, request: &RequestContext) -> AccessResult {
        let granted = route
            .requirement("_permission")
            .is_some_and(|permission| request.account().has_permission(permission));
        AccessResult::allow_if(granted)
    }
}

/// `_role: "a,b"` needs every listed role, `_role: "a+b"` needs one of them.
#[derive(Debug, Default)]
pub struct RoleAccessCheck;

impl StaticAccessCheck for RoleAccessCheck {
    fn applies_to(&self) -> Vec<String> {
        vec!["_role".to_string()]
    }
}

impl AccessCheck for RoleAccessCheck {
    fn capability(&self) -> CheckCapability<'_> {
        CheckCapability::Static(self)
    }

    fn access(&self, route: &Route, request: &RequestContext) -> AccessResult {
        let Some(roles) = route.requirement("_role") else {
            return AccessResult::Deny;
        };
        let account = request.account();

        let granted = if roles.contains(',') {
            roles.split(',').map(str::trim).all(|role| account.has_role(role))
        } else {
            roles.split('+').map(str::trim).any(|role| account.has_role(role))
        };
        AccessResult::allow_if(granted)
    }
}

/// Grants an account access to routes about itself (`/user/{account}/...`).
#[derive(Debug, Default)]
pub struct OwnAccountAccessCheck;

impl DynamicAccessCheck for OwnAccountAccessCheck {
    fn applies(&self, route: &Route) -> bool {
        route.pattern.contains("{account}")
    }
}

impl AccessCheck for OwnAccountAccessCheck {
    fn capability(&self) -> CheckCapability<'_> {
        CheckCapability::Dynamic(self)
    }

    fn access(&self, _route: &Route, request: &RequestContext) -> AccessResult {
        let account = request.account();
        let own = !account.is_anonymous() && request.attribute("account") == Some(account.id.as_str());
        AccessResult::allow_if(own)
    }
}
