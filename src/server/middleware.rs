use std::fmt;
use std::sync::Arc;

use crate::server::router::BoxHandler;

/// Wraps a handler in another handler.
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: BoxHandler) -> BoxHandler;
}

impl<F> Middleware for F
where
    F: Fn(BoxHandler) -> BoxHandler + Send + Sync,
{
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        self(next)
    }
}

/// Ordered middleware list.
///
/// Request → M1 → M2 → ... → route handler. The first middleware added is
/// the outermost call, so middlewares run in the order they were added.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_middleware<M>(&mut self, middleware: M)
    where
        M: Middleware + 'static,
    {
        self.middlewares.push(Arc::new(middleware));
    }

    /// Wraps `handler` in every middleware, innermost last-added.
    pub fn apply(&self, handler: BoxHandler) -> BoxHandler {
        self.middlewares
            .iter()
            .rev()
            .fold(handler, |next, m| m.wrap(next))
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.len())
            .finish()
    }
}
