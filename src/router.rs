//! Route registration and lookup.
//!
//! The bridge does not decide what a route *means*, the orchestrator does.
//! It only keeps the registered `method + path` pairs and, per request, finds
//! which one matched and which URL parameters it captured.
//!
//! One radix tree per HTTP method, O(path-length) lookup via [`matchit`].
//! Trees store an index into the append-only route list.

use std::collections::HashMap;
use std::fmt;

use matchit::Router as MatchitRouter;
use percent_encoding::percent_decode_str;

use crate::error::Error;
use crate::method::Method;

/// A registered route. Path parameters use `{name}` syntax.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Route {
    method: Method,
    path: String,
}

impl Route {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into() }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

#[derive(Default)]
pub(crate) struct Router {
    routes: Vec<Route>,
    trees: HashMap<Method, MatchitRouter<usize>>,
}

impl Router {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends a route. An identical `method + path` is rejected, as is any
    /// path matchit cannot insert (bad syntax, conflicting wildcard).
    pub(crate) fn register(&mut self, route: Route) -> Result<(), Error> {
        if self.routes.contains(&route) {
            return Err(Error::DuplicateRoute { method: route.method, path: route.path });
        }
        self.trees
            .entry(route.method)
            .or_default()
            .insert(route.path.as_str(), self.routes.len())
            .map_err(|e| Error::InvalidRoute { path: route.path.clone(), reason: e.to_string() })?;
        self.routes.push(route);
        Ok(())
    }

    pub(crate) fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(&Route, HashMap<String, String>)> {
        let tree = self.trees.get(&method)?;
        let matched = tree.at(path).ok()?;
        let route = self.routes.get(*matched.value)?;
        // matchit captures raw path text; values are handed out decoded
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), percent_decode_str(v).decode_utf8_lossy().into_owned()))
            .collect();
        Some((route, params))
    }

    pub(crate) fn routes(&self) -> &[Route] {
        &self.routes
    }
}
