//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use route_access::access::check::{
    AccessCheck, AccessResult, CheckCapability, DynamicAccessCheck, StaticAccessCheck,
};
use route_access::access::context::RequestContext;
use route_access::access::registry::AccessCheckRegistry;
use route_access::lifecycle::Services;
use route_access::routing::Route;
use route_access::store::MemoryRouteStore;

/// Static check returning a fixed result and counting its calls.
#[derive(Debug)]
pub struct CountingCheck {
    pub keys: Vec<String>,
    pub result: AccessResult,
    pub calls: AtomicUsize,
}

impl CountingCheck {
    pub fn new(keys: &[&str], result: AccessResult) -> Arc<Self> {
        Arc::new(Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            result,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StaticAccessCheck for CountingCheck {
    fn applies_to(&self) -> Vec<String> {
        self.keys.clone()
    }
}

impl AccessCheck for CountingCheck {
    fn capability(&self) -> CheckCapability<'_> {
        CheckCapability::Static(self)
    }

    fn access(&self, _route: &Route, _request: &RequestContext) -> AccessResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
    }
}

/// Dynamic check applying to routes under a prefix, counting `applies` calls.
#[derive(Debug)]
pub struct PrefixCheck {
    pub prefix: &'static str,
    pub result: AccessResult,
    pub asked: AtomicUsize,
}

impl PrefixCheck {
    pub fn new(prefix: &'static str, result: AccessResult) -> Arc<Self> {
        Arc::new(Self {
            prefix,
            result,
            asked: AtomicUsize::new(0),
        })
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

impl DynamicAccessCheck for PrefixCheck {
    fn applies(&self, route: &Route) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        route.pattern.starts_with(self.prefix)
    }
}

impl AccessCheck for PrefixCheck {
    fn capability(&self) -> CheckCapability<'_> {
        CheckCapability::Dynamic(self)
    }

    fn access(&self, _route: &Route, _request: &RequestContext) -> AccessResult {
        self.result
    }
}

/// Registry holding one counting check per result, ids `check.0`, `check.1`, ...
///
/// Each check claims its own key `_check_N`.
pub fn counting_registry(results: &[AccessResult]) -> (Arc<AccessCheckRegistry>, Vec<Arc<CountingCheck>>) {
    let registry = Arc::new(AccessCheckRegistry::new());
    let checks: Vec<_> = results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let key = format!("_check_{i}");
            let check = CountingCheck::new(&[key.as_str()], *result);
            registry.register_instance(format!("check.{i}"), check.clone());
            check
        })
        .collect();
    (registry, checks)
}

/// Services over a fresh memory store and `registry`.
pub fn services(registry: Arc<AccessCheckRegistry>) -> Services {
    Services::with_parts(Arc::new(MemoryRouteStore::new()), registry)
}

pub fn calls(checks: &[Arc<CountingCheck>]) -> Vec<usize> {
    checks.iter().map(|c| c.calls()).collect()
}
