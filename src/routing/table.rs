//! Route storage and lookup.
//!
//! # Responsibilities
//! - Store compiled (method, pattern, handler) entries
//! - Reject duplicate registrations at startup
//! - Resolve a request to one entry, a 405 allow list, or no match
//!
//! # Design Decisions
//! - Immutable after startup (thread-safe without locks)
//! - O(n) pattern scan (acceptable for typical route counts)
//! - Best match chosen by specificity, never by insertion order

use std::cmp::Ordering;
use std::sync::Arc;

use axum::http::Method;

use crate::routing::error::RouteError;
use crate::routing::handler::Handler;
use crate::routing::pattern::{PathParams, PathPattern};

/// A registered route.
pub struct RouteEntry {
    method: Method,
    pattern: PathPattern,
    handler: Arc<dyn Handler>,
}

impl RouteEntry {
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

/// Result of resolving (method, path) against the table.
#[derive(Debug)]
pub enum RouteMatch<'a> {
    Found {
        entry: &'a RouteEntry,
        params: PathParams,
    },
    /// The path matches, but only under these methods (sorted, de-duplicated).
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

/// The set of HTTP routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route. Fails if a route with the same method and the same
    /// pattern shape is already present.
    pub fn insert(
        &mut self,
        method: Method,
        pattern: PathPattern,
        handler: Arc<dyn Handler>,
    ) -> Result<(), RouteError> {
        if let Some(existing) = self
            .entries
            .iter()
            .find(|entry| entry.method == method && entry.pattern.same_shape(&pattern))
        {
            return Err(RouteError::Duplicate {
                method,
                pattern: pattern.as_str().to_string(),
                existing: existing.pattern.as_str().to_string(),
            });
        }

        self.entries.push(RouteEntry {
            method,
            pattern,
            handler,
        });
        Ok(())
    }

    /// Resolve a request.
    ///
    /// Every pattern is tested against the path first; the method only
    /// filters the path matches. When several entries match under the same
    /// method the most specific pattern wins.
    pub fn lookup<'a>(&'a self, method: &Method, path: &str) -> RouteMatch<'a> {
        let mut best: Option<(&'a RouteEntry, PathParams)> = None;
        let mut allowed = Vec::new();

        for entry in &self.entries {
            let Some(params) = entry.pattern.matches(path) else {
                continue;
            };

            if entry.method != *method {
                allowed.push(entry.method.clone());
                continue;
            }

            let better = match &best {
                None => true,
                Some((current, _)) => {
                    entry.pattern.specificity_cmp(&current.pattern) == Ordering::Less
                }
            };
            if better {
                best = Some((entry, params));
            }
        }

        match best {
            Some((entry, params)) => RouteMatch::Found { entry, params },
            None if allowed.is_empty() => RouteMatch::NotFound,
            None => {
                allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                allowed.dedup();
                RouteMatch::MethodNotAllowed { allowed }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RequestContext;

    fn tagged(tag: &'static str) -> Arc<dyn Handler> {
        Arc::new(move |ctx: &mut RequestContext| ctx.set_body(tag))
    }

    fn table(routes: &[(Method, &str, &'static str)]) -> RouteTable {
        let mut table = RouteTable::new();
        for (method, pattern, tag) in routes {
            table
                .insert(method.clone(), PathPattern::compile(pattern).unwrap(), tagged(tag))
                .unwrap();
        }
        table
    }

    fn resolved_pattern(table: &RouteTable, method: Method, path: &str) -> Option<String> {
        match table.lookup(&method, path) {
            RouteMatch::Found { entry, .. } => Some(entry.pattern().as_str().to_string()),
            _ => None,
        }
    }

    #[test]
    fn literal_wins_regardless_of_registration_order() {
        let param_first = table(&[
            (Method::GET, "/users/:id", "param"),
            (Method::GET, "/users/profile", "literal"),
        ]);
        let literal_first = table(&[
            (Method::GET, "/users/profile", "literal"),
            (Method::GET, "/users/:id", "param"),
        ]);

        for t in [&param_first, &literal_first] {
            assert_eq!(
                resolved_pattern(t, Method::GET, "/users/profile").as_deref(),
                Some("/users/profile")
            );
            assert_eq!(
                resolved_pattern(t, Method::GET, "/users/123").as_deref(),
                Some("/users/:id")
            );
        }
    }

    #[test]
    fn found_carries_params() {
        let t = table(&[(Method::GET, "/items/:category/id/:item_id", "item")]);
        match t.lookup(&Method::GET, "/items/book/id/456") {
            RouteMatch::Found { params, .. } => {
                assert_eq!(params.get("category").map(String::as_str), Some("book"));
                assert_eq!(params.get("item_id").map(String::as_str), Some("456"));
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn wrong_method_reports_allowed_methods() {
        let t = table(&[
            (Method::POST, "/api/json", "post"),
            (Method::PUT, "/api/:name", "put"),
            (Method::GET, "/other", "get"),
        ]);
        match t.lookup(&Method::GET, "/api/json") {
            RouteMatch::MethodNotAllowed { allowed } => {
                assert_eq!(allowed, vec![Method::POST, Method::PUT]);
            }
            other => panic!("expected 405, got {other:?}"),
        }
    }

    #[test]
    fn unknown_path_is_not_found() {
        let t = table(&[(Method::GET, "/hello", "hello")]);
        assert!(matches!(
            t.lookup(&Method::GET, "/nonexistent"),
            RouteMatch::NotFound
        ));
    }

    #[test]
    fn duplicate_shape_is_rejected() {
        let mut t = table(&[(Method::GET, "/users/:id", "a")]);
        let err = t
            .insert(
                Method::GET,
                PathPattern::compile("/users/:uid").unwrap(),
                tagged("b"),
            )
            .unwrap_err();
        assert!(matches!(err, RouteError::Duplicate { .. }));

        // Same pattern under another method is fine.
        t.insert(
            Method::POST,
            PathPattern::compile("/users/:id").unwrap(),
            tagged("c"),
        )
        .unwrap();
        assert_eq!(t.len(), 2);
    }
}
