use std::sync::Arc;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::http::request::{Method, Params, Request};
use crate::server::listener::Server;
use crate::server::middleware::{Middleware, MiddlewareChain};
use crate::server::router::{BoxHandler, Handler, MatchedRoute, Router};

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 8192;
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Routes, middleware, and connection settings, frozen once serving starts.
///
/// Every connection task holds an `Arc<App>` and only reads from it.
#[derive(Debug)]
pub struct App {
    router: Router,
    middlewares: MiddlewareChain,
    idle_timeout: Option<Duration>,
    max_request_bytes: usize,
    max_body_bytes: usize,
}

impl App {
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }

    pub fn max_request_bytes(&self) -> usize {
        self.max_request_bytes
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Finds the route for `req` and wraps it in the middleware chain.
    ///
    /// The chain is applied per request around whichever handler matched.
    pub fn resolve(&self, req: &Request) -> (BoxHandler, Params) {
        let MatchedRoute { handler, params } = self.router.find_route(&req.path, req.method);
        (self.middlewares.apply(handler), params)
    }
}

/// Registration phase of a server.
///
/// Routes and middleware can only be added here; `build` or `bind` moves
/// them into an immutable [`App`].
pub struct ServerBuilder {
    router: Router,
    middlewares: MiddlewareChain,
    idle_timeout: Option<Duration>,
    max_request_bytes: usize,
    max_body_bytes: usize,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            middlewares: MiddlewareChain::new(),
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn from_config(cfg: &ServerConfig) -> Self {
        Self::new()
            .idle_timeout(cfg.idle_timeout())
            .max_request_bytes(cfg.max_request_bytes)
            .max_body_bytes(cfg.max_body_bytes)
    }

    /// `None` disables the per-request deadline.
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn max_request_bytes(mut self, limit: usize) -> Self {
        self.max_request_bytes = limit;
        self
    }

    /// Largest `Content-Length` accepted; bigger requests get 413.
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn handle<H>(mut self, method: Method, path: &str, handler: H) -> Self
    where
        H: Handler + 'static,
    {
        self.router.handle(method, path, handler);
        self
    }

    pub fn get<H: Handler + 'static>(self, path: &str, handler: H) -> Self {
        self.handle(Method::GET, path, handler)
    }

    pub fn post<H: Handler + 'static>(self, path: &str, handler: H) -> Self {
        self.handle(Method::POST, path, handler)
    }

    pub fn put<H: Handler + 'static>(self, path: &str, handler: H) -> Self {
        self.handle(Method::PUT, path, handler)
    }

    pub fn delete<H: Handler + 'static>(self, path: &str, handler: H) -> Self {
        self.handle(Method::DELETE, path, handler)
    }

    pub fn use_middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.middlewares.use_middleware(middleware);
        self
    }

    pub fn build(self) -> App {
        App {
            router: self.router,
            middlewares: self.middlewares,
            idle_timeout: self.idle_timeout,
            max_request_bytes: self.max_request_bytes,
            max_body_bytes: self.max_body_bytes,
        }
    }

    /// Freezes the configuration and binds the listening socket.
    pub async fn bind(self, addr: impl tokio::net::ToSocketAddrs) -> anyhow::Result<Server> {
        Server::bind(addr, Arc::new(self.build())).await
    }
}
