//! Request routing — map URL patterns and HTTP methods to handler functions.
//!
//! This module provides [`Router`], which dispatches incoming HTTP requests to handler
//! functions based on the request method and URL path. Two pattern styles are supported:
//!
//! | Pattern              | Example match              | Captured params              |
//! |----------------------|----------------------------|------------------------------|
//! | `/health`            | `/health`                  | *(none)*                     |
//! | `/cacheme/:param`    | `/cacheme/abc`             | `param → "abc"`              |
//!
//! Trailing slashes are normalized on both patterns and incoming paths, so `/health/` and
//! `/health` are treated as equivalent. Captured segments are passed through verbatim,
//! without percent-decoding.
//!
//! Routes are matched in registration order; the first route whose method and pattern both
//! match the incoming request wins.
//!
//! Every dispatch runs through the router's middleware chain, and the innermost layer is
//! always a [`FaultBoundary`], so no handler error or panic escapes as anything other than
//! a `500` JSON response.

use std::sync::Arc;

use crate::context::{Context, PathParams};
use crate::error::{HandlerResult, error_response};
use crate::middleware::{
    FaultBoundary, HandlerFuture, Middleware, MiddlewareHandler, Next, from_middleware,
};
use crate::{Method, Request, Response, StatusCode};

/// Type-erased, heap-allocated async handler that processes a [`Context`].
///
/// In practice you never construct this type directly — use [`Router::get`].
pub type Handler = Arc<dyn Fn(Context) -> HandlerFuture + Send + Sync + 'static>;

/// Conversion trait for async handler functions.
///
/// Any `Fn(Context) -> impl Future<Output = HandlerResult> + Send` that is also
/// `Send + Sync + 'static` implements this trait through the blanket impl below.
pub trait IntoHandler: Send + Sync + 'static {
    /// Call the handler with the given context, boxing the returned future.
    fn call(&self, ctx: Context) -> HandlerFuture;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: Context) -> HandlerFuture {
        Box::pin((self)(ctx))
    }
}

// A single path segment, either a literal string or a named capture (`:name`).
#[derive(Debug, Clone)]
enum Segment {
    Static(String),
    Parameter(String),
}

// Compiled representation of a route pattern string.
#[derive(Debug, Clone)]
enum Pattern {
    // Matches one exact path string, e.g. `/health`.
    Exact(String),
    // Matches a fixed number of segments where some may be named captures, e.g. `/cacheme/:param`.
    Parameterized { segments: Vec<Segment> },
}

// Strips one trailing slash from anything but the root path.
fn normalize(path: &str) -> &str {
    if path != "/" {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

impl Pattern {
    /// Parse a route pattern string: any `:name` segment makes it
    /// [`Pattern::Parameterized`], otherwise it is an exact match.
    fn parse(pattern: &str) -> Self {
        let pattern = normalize(pattern);

        if pattern.contains(':') {
            let segments = pattern
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| match s.strip_prefix(':') {
                    Some(name) => Segment::Parameter(name.to_owned()),
                    None => Segment::Static(s.to_owned()),
                })
                .collect();

            return Pattern::Parameterized { segments };
        }

        Pattern::Exact(pattern.to_owned())
    }

    // Try to match `path` against this pattern, returning extracted [`PathParams`] on success.
    fn matches(&self, path: &str) -> Option<PathParams> {
        let path = normalize(path);

        match self {
            Pattern::Exact(p) => (p == path).then(PathParams::new),
            Pattern::Parameterized { segments } => {
                let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
                if segments.len() != path_segments.len() {
                    return None;
                }

                let mut params = PathParams::new();
                for (seg, path_seg) in segments.iter().zip(path_segments) {
                    match seg {
                        Segment::Static(s) if s != path_seg => return None,
                        Segment::Static(_) => {}
                        Segment::Parameter(name) => params.insert(name.as_str(), path_seg),
                    }
                }

                Some(params)
            }
        }
    }
}

// A single registered route binding a method + pattern to a handler.
struct Route {
    method: Method,
    pattern: Pattern,
    handler: Handler,
}

impl Route {
    // Returns `Some(params)` when both the HTTP method and path pattern match, `None` otherwise.
    fn matches(&self, method: &Method, path: &str) -> Option<PathParams> {
        if &self.method == method {
            self.pattern.matches(path)
        } else {
            None
        }
    }
}

/// HTTP request router that dispatches requests to registered handler functions.
///
/// When no route matches, a `404` response with a JSON `{"error": "Not Found"}` body
/// is produced.
///
/// # Examples
///
/// ```rust
/// use pulse::{Router, Response, StatusCode};
/// use pulse::context::Context;
///
/// let mut router = Router::new();
///
/// router.get("/ping", |_ctx: Context| async { Ok(Response::new(StatusCode::Ok)) });
///
/// router.get("/echo/:word", |ctx: Context| async move {
///     let word = ctx.param("word").unwrap_or_default().to_owned();
///     Ok(Response::new(StatusCode::Ok).body(word))
/// });
///
/// assert_eq!(router.len(), 2);
/// ```
pub struct Router {
    routes: Vec<Route>,
    middlewares: Vec<MiddlewareHandler>,
    boundary: MiddlewareHandler,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Create a new, empty `Router` with no registered routes or extra middleware.
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            middlewares: Vec::new(),
            boundary: from_middleware(Arc::new(FaultBoundary)),
        }
    }

    /// Register a handler for `GET` requests matching `path`.
    ///
    /// - `path` — URL pattern string (e.g. `"/health"` or `"/cacheme/:param"`).
    /// - `handler` — Async function that receives a [`Context`] and returns a
    ///   [`HandlerResult`].
    pub fn get(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Method::Get, path, handler);
    }

    // Erase the concrete handler type and store it as a `Handler` trait object.
    fn add_route(&mut self, method: Method, path: &str, handler: impl IntoHandler) {
        let handler: Handler = Arc::new(move |ctx: Context| handler.call(ctx));
        self.routes.push(Route {
            method,
            pattern: Pattern::parse(path),
            handler,
        });
    }

    /// Wrap every route in `middleware`.
    ///
    /// Layers run in registration order, outermost first, and all of them sit
    /// outside the built-in [`FaultBoundary`].
    pub fn layer<M>(&mut self, middleware: M)
    where
        M: Middleware + 'static,
    {
        self.middlewares.push(from_middleware(Arc::new(middleware)));
    }

    /// Return the number of routes registered in this router.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Return `true` if no routes have been registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dispatch `request` to the first matching route and return its response.
    ///
    /// The request passes through the registered layers, then the fault boundary,
    /// then the handler (or the not-found endpoint).
    pub async fn route(&self, request: Request) -> Response {
        let matched = self
            .routes
            .iter()
            .find_map(|route| {
                route
                    .matches(request.method(), request.path())
                    .map(|params| (params, Arc::clone(&route.handler)))
            });

        let (ctx, endpoint) = match matched {
            Some((params, handler)) => (Context::with_params(request, params), endpoint(handler)),
            None => (Context::new(request), not_found()),
        };

        let mut chain = Vec::with_capacity(self.middlewares.len() + 2);
        chain.extend(self.middlewares.iter().cloned());
        chain.push(Arc::clone(&self.boundary));
        chain.push(endpoint);

        match Next::new(chain).run(ctx).await {
            Ok(response) => response,
            // Only reachable when an outer layer fails after the boundary has answered.
            Err(err) => err.into_response(),
        }
    }
}

// Adapts a route handler into the final link of a middleware chain.
fn endpoint(handler: Handler) -> MiddlewareHandler {
    Arc::new(move |ctx: Context, _next: Next| handler(ctx))
}

fn not_found() -> MiddlewareHandler {
    Arc::new(|_ctx: Context, _next: Next| -> HandlerFuture {
        Box::pin(async { Ok(error_response(StatusCode::NotFound, "Not Found")) })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;

    fn make_request(method: &str, path: &str) -> Request {
        let raw = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        let (req, _) = Request::parse(raw.as_bytes()).unwrap();
        req
    }

    fn body_text(response: &Response) -> &str {
        std::str::from_utf8(response.body_bytes()).unwrap()
    }

    // ── Pattern::parse ────────────────────────────────────────────────────────

    #[test]
    fn pattern_parse_root() {
        assert!(matches!(Pattern::parse("/"), Pattern::Exact(s) if s == "/"));
    }

    #[test]
    fn pattern_parse_trailing_slash_stripped() {
        assert!(matches!(Pattern::parse("/health/"), Pattern::Exact(s) if s == "/health"));
    }

    #[test]
    fn pattern_parse_parameterized() {
        match Pattern::parse("/cacheme/:param") {
            Pattern::Parameterized { segments } => {
                assert_eq!(segments.len(), 2);
                assert!(matches!(&segments[0], Segment::Static(s) if s == "cacheme"));
                assert!(matches!(&segments[1], Segment::Parameter(s) if s == "param"));
            }
            other => panic!("expected Parameterized, got {other:?}"),
        }
    }

    // ── Pattern::matches ──────────────────────────────────────────────────────

    #[test]
    fn pattern_exact_match() {
        let pat = Pattern::parse("/health");
        assert!(pat.matches("/health").is_some());
        assert!(pat.matches("/health/").is_some());
        assert!(pat.matches("/heavy").is_none());
    }

    #[test]
    fn pattern_root_only_matches_root() {
        let pat = Pattern::parse("/");
        assert!(pat.matches("/").is_some());
        assert!(pat.matches("/other").is_none());
    }

    #[test]
    fn pattern_param_captures_literal_segment() {
        let pat = Pattern::parse("/cacheme/:param");
        let params = pat.matches("/cacheme/hello%20world").unwrap();
        assert_eq!(params.get("param"), Some("hello%20world"));
    }

    #[test]
    fn pattern_param_wrong_segment_count() {
        let pat = Pattern::parse("/cacheme/:param");
        assert!(pat.matches("/cacheme").is_none());
        assert!(pat.matches("/cacheme/").is_none());
        assert!(pat.matches("/cacheme/a/b").is_none());
    }

    #[test]
    fn pattern_param_wrong_static_segment() {
        let pat = Pattern::parse("/cacheme/:param");
        assert!(pat.matches("/cacheyou/a").is_none());
    }

    // ── Router ────────────────────────────────────────────────────────────────

    #[test]
    fn router_starts_empty() {
        let router = Router::default();
        assert!(router.is_empty());
        assert_eq!(router.len(), 0);
    }

    #[tokio::test]
    async fn router_unmatched_is_json_404() {
        let router = Router::new();
        let res = router.route(make_request("GET", "/")).await;
        assert_eq!(res.status(), StatusCode::NotFound);
        assert_eq!(res.content_type(), Some("application/json"));
        assert_eq!(body_text(&res), r#"{"error":"Not Found"}"#);
    }

    #[tokio::test]
    async fn router_get_does_not_match_post() {
        let mut router = Router::new();
        router.get("/hello", |_ctx: Context| async { Ok(Response::new(StatusCode::Ok)) });
        let res = router.route(make_request("POST", "/hello")).await;
        assert_eq!(res.status(), StatusCode::NotFound);
    }

    #[tokio::test]
    async fn router_first_matching_route_wins() {
        let mut router = Router::new();
        router.get("/path", |_ctx: Context| async { Ok(Response::new(StatusCode::Ok)) });
        router.get("/path", |_ctx: Context| async { Ok(Response::new(StatusCode::BadRequest)) });

        let res = router.route(make_request("GET", "/path")).await;
        assert_eq!(res.status(), StatusCode::Ok);
    }

    #[tokio::test]
    async fn router_parameterized_route_receives_params() {
        let mut router = Router::new();
        router.get("/echo/:word", |ctx: Context| async move {
            let word = ctx.param("word").unwrap_or("").to_owned();
            Ok(Response::new(StatusCode::Ok).body(word))
        });
        let res = router.route(make_request("GET", "/echo/42")).await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(body_text(&res), "42");
    }

    #[tokio::test]
    async fn router_handler_error_hits_boundary() {
        let mut router = Router::new();
        router.get("/fail", |_ctx: Context| async { Err(HandlerError::fault("nope")) });
        let res = router.route(make_request("GET", "/fail")).await;
        assert_eq!(res.status(), StatusCode::InternalServerError);
        assert_eq!(body_text(&res), r#"{"error":"nope"}"#);
    }

    struct Stamp;

    impl Middleware for Stamp {
        fn handle(&self, ctx: Context, next: Next) -> HandlerFuture {
            Box::pin(async move { Ok(next.run(ctx).await?.header("X-Stamp", "1")) })
        }
    }

    #[tokio::test]
    async fn router_layers_see_boundary_output() {
        let mut router = Router::new();
        router.layer(Stamp);
        router.get("/fail", |_ctx: Context| async { Err(HandlerError::fault("nope")) });

        let res = router.route(make_request("GET", "/fail")).await;
        assert_eq!(res.status(), StatusCode::InternalServerError);
        assert_eq!(res.headers().get("x-stamp"), Some("1"));

        let res = router.route(make_request("GET", "/missing")).await;
        assert_eq!(res.status(), StatusCode::NotFound);
        assert_eq!(res.headers().get("x-stamp"), Some("1"));
    }
}
