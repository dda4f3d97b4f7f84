//! Request context handed to access checks.
//!
//! Carries the normalized system path, the current account, the route the
//! request was resolved to and a bag of string attributes (placeholder
//! values and route defaults).

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::routing::outline::normalize_path;
use crate::routing::route::Route;

/// Attribute key for the normalized request path.
pub const SYSTEM_PATH: &str = "_system_path";

/// Attribute key for the resolved route name.
pub const ROUTE_NAME: &str = "_route";

/// Id of the anonymous account.
pub const ANONYMOUS_ID: &str = "0";

/// The identity a request is evaluated for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub roles: BTreeSet<String>,
    pub permissions: BTreeSet<String>,
}

impl Account {
    pub fn anonymous() -> Self {
        Self {
            id: ANONYMOUS_ID.to_string(),
            name: "anonymous".to_string(),
            roles: BTreeSet::from(["anonymous".to_string()]),
            permissions: BTreeSet::new(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.id == ANONYMOUS_ID
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

/// Known accounts by id; unknown ids resolve to the anonymous account.
#[derive(Debug, Clone, Default)]
pub struct AccountDirectory {
    accounts: HashMap<String, Account>,
}

impl AccountDirectory {
    pub fn new(accounts: impl IntoIterator<Item = Account>) -> Self {
        Self {
            accounts: accounts.into_iter().map(|a| (a.id.clone(), a)).collect(),
        }
    }

    pub fn lookup(&self, id: Option<&str>) -> Account {
        id.and_then(|id| self.accounts.get(id))
            .cloned()
            .unwrap_or_else(Account::anonymous)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Request state visible to access checks.
#[derive(Debug, Clone)]
pub struct RequestContext {
    system_path: String,
    account: Account,
    route: Option<Arc<Route>>,
    attributes: BTreeMap<String, String>,
}

impl RequestContext {
    pub fn new(path: &str, account: Account) -> Self {
        Self {
            system_path: normalize_path(path),
            account,
            route: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Attach the resolved route and copy its defaults and the values
    /// captured from the system path into the attributes.
    pub fn with_route(mut self, route: Arc<Route>) -> Self {
        let params = route
            .parameters(&self.system_path)
            .unwrap_or_else(|| route.defaults.clone());
        self.attributes.extend(params);
        self.route = Some(route);
        self
    }

    /// Context for a named route that was not reached through a path:
    /// defaults overlaid with `parameters`, system path set to the pattern.
    pub fn for_route(route: Arc<Route>, parameters: &BTreeMap<String, String>, account: Account) -> Self {
        let mut attributes = route.defaults.clone();
        attributes.extend(parameters.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self {
            system_path: normalize_path(&route.pattern),
            account,
            route: Some(route),
            attributes,
        }
    }

    pub fn system_path(&self) -> &str {
        &self.system_path
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    /// Read an attribute; the well-known keys map to their fields.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        match key {
            SYSTEM_PATH => Some(self.system_path.as_str()),
            ROUTE_NAME => self.route.as_deref().map(|r| r.name.as_str()),
            _ => self.attributes.get(key).map(String::as_str),
        }
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}
