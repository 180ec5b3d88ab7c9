//! The catch-all failure boundary around route handlers.

use std::any::Any;

use tracing::error;

use super::{HandlerFuture, Middleware, Next};
use crate::context::Context;
use crate::error::HandlerError;

/// Converts every handler failure into `500 {"error": "<message>"}`.
///
/// The downstream chain runs on its own Tokio task, which gives two guarantees:
///
/// - a panic inside a handler is caught as a [`JoinError`](tokio::task::JoinError)
///   and reported like any other failure instead of tearing down the connection;
/// - a handler keeps running to completion even if the client disconnects and
///   the connection task is dropped.
///
/// Each failure is logged at `ERROR` with the request line and the full error
/// chain before the response is produced. Failure kinds are not distinguished
/// and nothing is retried.
///
/// Only panics carry a stack trace, printed by the panic hook when
/// `RUST_BACKTRACE` is set. An `Err` is logged through its `Debug` output,
/// which includes the source error.
pub struct FaultBoundary;

impl Middleware for FaultBoundary {
    fn handle(&self, ctx: Context, next: Next) -> HandlerFuture {
        Box::pin(async move {
            let method = ctx.request().method().clone();
            let path = ctx.request().path().to_owned();

            let failure = match tokio::spawn(next.run(ctx)).await {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(err)) => err,
                Err(join_err) => match join_err.try_into_panic() {
                    Ok(payload) => HandlerError::Panic(panic_message(&*payload)),
                    Err(join_err) => HandlerError::fault(join_err.to_string()),
                },
            };

            error!(
                %method,
                %path,
                error = %failure,
                details = ?failure,
                "request handler failed"
            );
            Ok(failure.into_response())
        })
    }
}

// Extracts the message from a panic payload raised by `panic!` with a literal or a format string.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
