//! Method + path template route table.
//!
//! # Resolution
//! - Unknown method → the method-not-allowed fallback
//! - Path normalized (query stripped, charset checked); invalid → not-found fallback
//! - Templates with the request's segment count are compared segment by segment
//! - Several matches: literal segments outrank captures at the first position
//!   where two templates differ; equal shapes resolve to the earliest registration
//! - No match → the not-found fallback
//!
//! Lookups never fail: every miss resolves to one of the two fallback handlers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::http::request::{Method, Params, Request};
use crate::http::response::{HandlerResult, RouteError};
use crate::http::writer::ResponseWriter;
use crate::server::path::{PathTemplate, clean_path, split_segments};

/// A request handler: writes into the response writer or reports a failure.
pub trait Handler: Send + Sync {
    fn call(&self, w: &mut ResponseWriter, req: &Request) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&mut ResponseWriter, &Request) -> HandlerResult + Send + Sync,
{
    fn call(&self, w: &mut ResponseWriter, req: &Request) -> HandlerResult {
        self(w, req)
    }
}

pub type BoxHandler = Arc<dyn Handler>;

/// Boxes a closure as a handler, pinning down its argument types.
pub fn handler_fn<F>(f: F) -> BoxHandler
where
    F: Fn(&mut ResponseWriter, &Request) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn not_found_handler(_w: &mut ResponseWriter, _req: &Request) -> HandlerResult {
    Err(RouteError::not_found("Path Not Found"))
}

pub fn method_not_allowed_handler(_w: &mut ResponseWriter, _req: &Request) -> HandlerResult {
    Err(RouteError::method_not_allowed("Method Not Allowed"))
}

/// Result of resolving a request against the route table.
pub struct MatchedRoute {
    pub handler: BoxHandler,
    pub params: Params,
}

struct Route {
    template: PathTemplate,
    handler: BoxHandler,
}

pub struct Router {
    routes: HashMap<Method, Vec<Route>>,
    not_found: BoxHandler,
    method_not_allowed: BoxHandler,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (method, routes) in &self.routes {
            let paths: Vec<&str> = routes.iter().map(|r| r.template.as_str()).collect();
            map.entry(method, &paths);
        }
        map.finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            not_found: Arc::new(not_found_handler),
            method_not_allowed: Arc::new(method_not_allowed_handler),
        }
    }

    /// Registers `handler` for `method` and `path`.
    ///
    /// Registering the same template twice for a method replaces the
    /// earlier handler but keeps its original position.
    pub fn handle<H>(&mut self, method: Method, path: &str, handler: H)
    where
        H: Handler + 'static,
    {
        self.handle_boxed(method, path, Arc::new(handler));
    }

    pub fn handle_boxed(&mut self, method: Method, path: &str, handler: BoxHandler) {
        let template = PathTemplate::parse(path);
        let routes = self.routes.entry(method).or_default();

        match routes
            .iter_mut()
            .find(|r| r.template.segments() == template.segments())
        {
            Some(existing) => {
                tracing::debug!(%method, path, "Replacing route handler");
                existing.handler = handler;
            }
            None => routes.push(Route { template, handler }),
        }
    }

    pub fn find_route(&self, path: &str, method: Method) -> MatchedRoute {
        let Some(routes) = self.routes.get(&method) else {
            return self.fallback(&self.method_not_allowed);
        };

        let path = clean_path(path);
        if path.is_empty() {
            return self.fallback(&self.not_found);
        }
        let segments = split_segments(path);

        let mut best: Option<(&Route, Params, Vec<bool>)> = None;
        for route in routes {
            let Some(params) = route.template.matches(&segments) else {
                continue;
            };
            let rank = route.template.specificity();
            if best.as_ref().is_none_or(|(_, _, top)| rank > *top) {
                best = Some((route, params, rank));
            }
        }

        match best {
            Some((route, params, _)) => MatchedRoute {
                handler: route.handler.clone(),
                params,
            },
            None => self.fallback(&self.not_found),
        }
    }

    /// Number of registered (method, template) pairs.
    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fallback(&self, handler: &BoxHandler) -> MatchedRoute {
        MatchedRoute {
            handler: handler.clone(),
            params: Params::new(),
        }
    }
}
