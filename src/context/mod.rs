//! Per-request context handed to route handlers.
//!
//! A [`Context`] owns the parsed [`Request`] together with the path
//! parameters the router captured for it.

use std::collections::HashMap;

use crate::Request;

/// Path parameters captured by a `:name` route segment.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct PathParams {
    map: HashMap<String, String>,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.map.insert(key.into(), value.into());
    }

    /// Returns the captured value for `key`, exactly as it appeared in the path.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }
}

/// The request being handled plus its route captures.
#[derive(Debug)]
pub struct Context {
    request: Request,
    params: PathParams,
}

impl Context {
    /// Creates a context with no path parameters.
    pub fn new(request: Request) -> Self {
        Self::with_params(request, PathParams::new())
    }

    pub fn with_params(request: Request, params: PathParams) -> Self {
        Self { request, params }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns the value captured by the `:name` segment of the matched route.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }
}
