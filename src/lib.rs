//! # pulse
//!
//! A small async JSON service built on a from-scratch HTTP/1.1 server, used to
//! demonstrate liveness probes, slow endpoints, centralized error handling and
//! a timeout-based response cache.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pulse::api::{AppState, router};
//! use pulse::config::Config;
//! use pulse::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = Arc::new(router(Arc::new(AppState::new(Config::default()))));
//!     let server = Server::bind("127.0.0.1:5000").await?;
//!     server
//!         .run(move |req| {
//!             let app = Arc::clone(&app);
//!             async move { app.route(req).await }
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod middleware;
pub mod router;
pub mod server;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::TimedCache;
pub use error::{HandlerError, HandlerResult};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use router::Router;
pub use server::{Server, ServerError};
