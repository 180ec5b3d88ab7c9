//! Handler failures and their single HTTP rendering.

use serde::Serialize;
use thiserror::Error;

use crate::http::{Response, StatusCode};

/// Anything a route handler can fail with.
///
/// Every variant is rendered identically by [`HandlerError::into_response`]:
/// status 500 with `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A failure raised on purpose, e.g. by the `/error` route.
    #[error("{0}")]
    Fault(String),

    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The handler task panicked; carries the panic payload when it was a string.
    #[error("handler panicked: {0}")]
    Panic(String),
}

/// Result type returned by every route handler.
pub type HandlerResult = Result<Response, HandlerError>;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// Renders a JSON `{"error": message}` body with the given status.
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    match Response::json(status, &ErrorBody { error: message }) {
        Ok(response) => response,
        // A struct holding a single &str always serializes; keep a literal fallback anyway.
        Err(_) => Response::json_bytes(status, &br#"{"error":"internal error"}"#[..]),
    }
}

impl HandlerError {
    /// Creates a deliberate fault with the given message.
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault(message.into())
    }

    /// Converts the failure into the `500 {"error": ...}` response.
    pub fn into_response(self) -> Response {
        error_response(StatusCode::InternalServerError, &self.to_string())
    }
}
