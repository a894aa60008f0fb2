//! Middleware layer.
//!
//! Middleware wraps the rest of the pipeline: it receives the request and a
//! [`Next`] handle, may inspect or alter the request, awaits `next.run(req)`,
//! then may inspect or alter the response before returning it.
//!
//! ```text
//! layer 0 ─┐                              ┌─ layer 0
//!          layer 1 ─┐            ┌─ layer 1
//!                   handler ─────┘
//! ```
//!
//! Layers registered first with [`Router::layer`](crate::Router::layer) sit
//! outermost. They see the request first and the response last.
//!
//! Built-in middleware:
//! - [`ModuleSpecifierTransform`]: rewrites module specifiers in HTML and
//!   JavaScript responses.

mod specifier;

pub use specifier::ModuleSpecifierTransform;

use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler};
use crate::request::Request;
use crate::response::Response;

/// A request/response interceptor.
///
/// One instance serves every request concurrently, hence `Send + Sync`.
/// Anything the returned future needs from `self` must be cloned into it.
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> BoxFuture;
}

pub(crate) type Stack = Arc<[Arc<dyn Middleware>]>;

/// The remainder of the pipeline after the current middleware.
pub struct Next {
    stack: Stack,
    index: usize,
    endpoint: BoxedHandler,
}

impl Next {
    pub(crate) fn new(stack: Stack, endpoint: BoxedHandler) -> Self {
        Self { stack, index: 0, endpoint }
    }

    /// Runs the remaining layers and the handler, resolving once the
    /// response for `req` is fully produced.
    pub async fn run(self, req: Request) -> Response {
        match self.stack.get(self.index) {
            Some(layer) => {
                let layer = Arc::clone(layer);
                let next = Self { index: self.index + 1, ..self };
                layer.call(req, next).await
            }
            None => self.endpoint.call(req).await,
        }
    }
}
