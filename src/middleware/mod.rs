//! Middleware pipeline — composable logic wrapped around every route handler.
//!
//! ## Core types
//!
//! - [`Middleware`] — trait implemented by all middleware.
//! - [`Next`] — cursor into the remaining chain; call [`Next::run`] to advance.
//! - [`MiddlewareHandler`] — type-erased, cheaply-cloneable middleware function.
//! - [`from_middleware`] — converts a [`Middleware`] into a [`MiddlewareHandler`].
//! - [`LoggerMiddleware`] — request/response access log.
//! - [`FaultBoundary`] — turns handler errors and panics into `500` JSON responses.
//!
//! The chain carries [`HandlerResult`]s rather than bare responses, so an error
//! returned by a handler travels outwards until the fault boundary renders it.

use std::{future::Future, pin::Pin, sync::Arc};
use tokio::time::Instant;

use crate::context::Context;
use crate::error::{HandlerError, HandlerResult};

mod fault;

pub use fault::FaultBoundary;

/// Boxed future returned by every middleware and handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// A type-erased, reference-counted middleware function.
///
/// The [`Arc`] wrapper makes handlers cheap to clone so that [`Next`] can
/// advance through the chain without copying closures.
pub type MiddlewareHandler = Arc<dyn Fn(Context, Next) -> HandlerFuture + Send + Sync + 'static>;

/// Converts a [`Middleware`] implementation into a [`MiddlewareHandler`].
///
/// ```rust
/// use std::sync::Arc;
/// use pulse::middleware::{LoggerMiddleware, from_middleware};
///
/// let handler = from_middleware(Arc::new(LoggerMiddleware));
/// ```
pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: Context, next: Next| middleware.handle(ctx, next))
}

/// A cursor into the remaining middleware chain for a single request.
///
/// `Next` is consumed by [`run`](Self::run), so each layer can forward a
/// request at most once.
pub struct Next {
    middlewares: Vec<MiddlewareHandler>,
    // Position of the layer the next `run` call invokes.
    index: usize,
}

impl Next {
    /// Creates a `Next` positioned at the start of `middlewares`.
    ///
    /// The last entry is expected to be the endpoint, which ignores its own `Next`.
    pub fn new(middlewares: Vec<MiddlewareHandler>) -> Self {
        Self {
            middlewares,
            index: 0,
        }
    }

    /// Invokes the next layer in the chain.
    ///
    /// Running past the end of the chain is a wiring bug and yields a
    /// [`HandlerError::Fault`].
    pub async fn run(mut self, ctx: Context) -> HandlerResult {
        if self.index < self.middlewares.len() {
            let handler = self.middlewares[self.index].clone();
            self.index += 1;
            handler(ctx, self).await
        } else {
            Err(HandlerError::fault(
                "No response generated by middleware pipeline",
            ))
        }
    }
}

/// The core trait for all middleware.
///
/// Implementors may pass through (`next.run(ctx).await`), short-circuit by
/// returning without calling `next`, or decorate the downstream result.
///
/// Implementations are shared across Tokio tasks, hence `Send + Sync`, and
/// must return a `Send` future.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: Context, next: Next) -> HandlerFuture;
}

/// Logs each request's method, path, status, and duration once it completes.
///
/// ```text
/// GET /cacheme/abc - 200 (1.2ms)
/// ```
///
/// Placed outside the [`FaultBoundary`], it records the final status, 500s included.
/// Non-2xx responses are logged at `warn`.
pub struct LoggerMiddleware;

impl Middleware for LoggerMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> HandlerFuture {
        Box::pin(async move {
            let start = Instant::now();
            let method = ctx.request().method().as_str().to_owned();
            let path = ctx.request().path().to_owned();

            let result = next.run(ctx).await;

            let duration = start.elapsed();
            match &result {
                Ok(response) if response.status().is_success() => {
                    let status = response.status().as_u16();
                    tracing::info!("{} {} - {} ({:?})", method, path, status, duration);
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    tracing::warn!("{} {} - {} ({:?})", method, path, status, duration);
                }
                Err(err) => {
                    tracing::warn!("{} {} - failed: {} ({:?})", method, path, err, duration);
                }
            }

            result
        })
    }
}
