//! Exact-match HTTP router
//!
//! Routes are organized by HTTP method for O(1) method dispatch, then
//! matched by exact path. The table is populated before the server starts
//! accepting connections and never mutated afterwards, so there is no
//! support for parameters or wildcards.

use crate::{Error, Method, Result};
use std::collections::HashMap;

/// Exact-match HTTP router
pub struct Router<T> {
    // Per-method tables for O(1) method dispatch
    get: HashMap<String, T>,
    post: HashMap<String, T>,
    put: HashMap<String, T>,
    delete: HashMap<String, T>,
    patch: HashMap<String, T>,
    head: HashMap<String, T>,
    options: HashMap<String, T>,
}

impl<T> Router<T> {
    /// Create a new router
    pub fn new() -> Self {
        Self {
            get: HashMap::new(),
            post: HashMap::new(),
            put: HashMap::new(),
            delete: HashMap::new(),
            patch: HashMap::new(),
            head: HashMap::new(),
            options: HashMap::new(),
        }
    }

    /// Add a route
    pub fn route(&mut self, method: Method, path: &str, value: T) -> Result<()> {
        if !path.starts_with('/') {
            return Err(Error::InvalidPath(path.to_string()));
        }
        let table = match method {
            Method::Get => &mut self.get,
            Method::Post => &mut self.post,
            Method::Put => &mut self.put,
            Method::Delete => &mut self.delete,
            Method::Patch => &mut self.patch,
            Method::Head => &mut self.head,
            Method::Options => &mut self.options,
            _ => return Err(Error::InvalidMethod(method.to_string())),
        };
        if table.contains_key(path) {
            return Err(Error::DuplicateRoute {
                method: method.to_string(),
                path: path.to_string(),
            });
        }
        table.insert(path.to_string(), value);
        Ok(())
    }

    /// Add a GET route
    pub fn get(&mut self, path: &str, value: T) -> Result<()> {
        self.route(Method::Get, path, value)
    }

    /// Add an OPTIONS route
    pub fn options(&mut self, path: &str, value: T) -> Result<()> {
        self.route(Method::Options, path, value)
    }

    /// Match a request
    pub fn match_route(&self, method: Method, path: &str) -> Option<&T> {
        match method {
            Method::Get => self.get.get(path),
            Method::Post => self.post.get(path),
            Method::Put => self.put.get(path),
            Method::Delete => self.delete.get(path),
            Method::Patch => self.patch.get(path),
            // HEAD is served from the GET table when no HEAD route exists
            Method::Head => self.head.get(path).or_else(|| self.get.get(path)),
            Method::Options => self.options.get(path),
            _ => None,
        }
    }
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}
