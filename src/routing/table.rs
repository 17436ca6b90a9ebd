//! Route table and its reloadable handle.
//!
//! # Responsibilities
//! - Compile route specs into an immutable table
//! - Reject duplicate ids and duplicate patterns at load
//! - Publish table snapshots to concurrent readers
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) literal lookup via HashMap, O(n) scan over templates
//! - Reload swaps the whole table; readers keep the snapshot they loaded

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

use crate::config::{ConfigError, RouteSpec};
use crate::routing::matcher::{match_route, RouteMatch};
use crate::routing::route::Route;

/// Timeout used by [`RouteTable::load`] for routes that do not set one.
pub const DEFAULT_ROUTE_TIMEOUT: Duration = Duration::from_secs(30);

/// Ordered, immutable set of routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    /// All routes in insertion order.
    routes: Vec<Arc<Route>>,
    /// Literal pattern -> index into `routes`.
    literals: HashMap<String, usize>,
    /// Indices of templated routes, in insertion order.
    templates: Vec<usize>,
}

impl RouteTable {
    /// Compile `specs` in order, preserving it for precedence.
    pub fn load(specs: &[RouteSpec]) -> Result<Self, ConfigError> {
        Self::load_with_default_timeout(specs, DEFAULT_ROUTE_TIMEOUT)
    }

    pub fn load_with_default_timeout(
        specs: &[RouteSpec],
        default_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let mut table = RouteTable::default();
        let mut ids: HashMap<String, usize> = HashMap::new();
        let mut patterns: HashMap<String, usize> = HashMap::new();

        for spec in specs {
            let route = Route::compile(spec, default_timeout)?;

            if ids.contains_key(route.id()) {
                return Err(ConfigError::DuplicateRouteId(route.id().to_string()));
            }
            if let Some(&existing) = patterns.get(route.pattern().as_str()) {
                return Err(ConfigError::DuplicatePattern {
                    id: route.id().to_string(),
                    pattern: route.pattern().as_str().to_string(),
                    existing: table.routes[existing].id().to_string(),
                });
            }

            let index = table.routes.len();
            ids.insert(route.id().to_string(), index);
            patterns.insert(route.pattern().as_str().to_string(), index);

            if route.pattern().is_literal() {
                table.literals.insert(route.pattern().as_str().to_string(), index);
            } else {
                table.templates.push(index);
            }
            table.routes.push(Arc::new(route));
        }

        Ok(table)
    }

    /// Resolve a request path to a route.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch> {
        match_route(self, path)
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Route>> {
        self.routes.iter().find(|r| r.id() == id)
    }

    /// Routes in insertion order.
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub(crate) fn literal(&self, path: &str) -> Option<&Arc<Route>> {
        self.literals.get(path).map(|&i| &self.routes[i])
    }

    pub(crate) fn templates(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.templates.iter().map(|&i| &self.routes[i])
    }
}

/// Shared, atomically replaceable reference to the active [`RouteTable`].
#[derive(Debug)]
pub struct RouteTableHandle {
    current: ArcSwap<RouteTable>,
}

impl RouteTableHandle {
    pub fn new(table: RouteTable) -> Self {
        Self {
            current: ArcSwap::from_pointee(table),
        }
    }

    /// The table active right now. Holders keep using it after a reload.
    pub fn snapshot(&self) -> Arc<RouteTable> {
        self.current.load_full()
    }

    /// Replace the active table in one atomic step.
    pub fn replace(&self, table: RouteTable) {
        let routes = table.len();
        self.current.store(Arc::new(table));
        tracing::info!(routes, "Route table replaced");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: &str, path: &str) -> RouteSpec {
        RouteSpec::new(id, path, "http://localhost:8001")
    }

    #[test]
    fn load_preserves_order() {
        let table = RouteTable::load(&[
            spec("b", "/b"),
            spec("a", "/a/{x}"),
            spec("c", "/c"),
        ])
        .unwrap();

        let ids: Vec<_> = table.routes().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(table.len(), 3);
        assert!(table.get("a").is_some());
        assert!(table.get("z").is_none());
    }

    #[test]
    fn duplicate_id_rejected() {
        let err = RouteTable::load(&[spec("search", "/search"), spec("search", "/other")]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateRouteId(id) if id == "search"));
    }

    #[test]
    fn duplicate_pattern_rejected() {
        let err = RouteTable::load(&[
            spec("one", "/delete-document/{id}"),
            spec("two", "/delete-document/{id}"),
        ])
        .unwrap_err();
        match err {
            ConfigError::DuplicatePattern { id, existing, .. } => {
                assert_eq!(id, "two");
                assert_eq!(existing, "one");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_pattern_rejected() {
        let err = RouteTable::load(&[spec("bad", "/docs/{")]).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedPattern { .. }));
    }

    #[test]
    fn empty_table_matches_nothing() {
        let table = RouteTable::load(&[]).unwrap();
        assert!(table.is_empty());
        assert!(table.match_path("/").is_none());
    }

    #[test]
    fn snapshot_survives_replace() {
        let handle = RouteTableHandle::new(RouteTable::load(&[spec("old", "/docs")]).unwrap());
        let before = handle.snapshot();

        handle.replace(RouteTable::load(&[spec("new", "/docs")]).unwrap());

        assert_eq!(before.match_path("/docs").unwrap().route.id(), "old");
        assert_eq!(handle.snapshot().match_path("/docs").unwrap().route.id(), "new");
    }
}
