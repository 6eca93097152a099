//! Serving: route table, middleware, and the connection acceptor.
//!
//! Routes and middleware are registered on a [`ServerBuilder`], which is
//! frozen into an [`App`] when the listener binds. Connection tasks share the
//! `App` read-only.

pub mod app;
pub mod listener;
pub mod middleware;
pub mod path;
pub mod router;

pub use app::{App, ServerBuilder};
pub use listener::{Server, ShutdownHandle};
pub use middleware::{Middleware, MiddlewareChain};
pub use router::{BoxHandler, Handler, MatchedRoute, Router, handler_fn};
