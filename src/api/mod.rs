//! The service itself: shared state and the route table.
//!
//! | Method & Path          | Handler                      |
//! |------------------------|------------------------------|
//! | `GET /`                | [`handlers::home`]           |
//! | `GET /health`          | [`handlers::health`]         |
//! | `GET /heavy`           | [`handlers::heavy`]          |
//! | `GET /cacheme/:param`  | [`handlers::cacheme`]        |
//! | `GET /error`           | [`handlers::fail`]           |

use std::sync::Arc;

use crate::cache::TimedCache;
use crate::config::Config;
use crate::context::Context;
use crate::middleware::LoggerMiddleware;
use crate::router::Router;

pub mod handlers;

/// State shared by every handler for the life of the process.
///
/// The cache is the only mutable part; it synchronizes internally.
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    pub cache: Arc<TimedCache>,
}

impl AppState {
    /// Creates the state with an empty cache whose default timeout comes from `config`.
    pub fn new(config: Config) -> Self {
        let cache = Arc::new(TimedCache::new(config.cache_default_timeout));
        Self { config, cache }
    }
}

/// Builds the router with every route and the access-log layer.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use pulse::api::{AppState, router};
/// use pulse::config::Config;
///
/// let app = router(Arc::new(AppState::new(Config::testing())));
/// assert_eq!(app.len(), 5);
/// ```
pub fn router(state: Arc<AppState>) -> Router {
    let mut router = Router::new();
    router.layer(LoggerMiddleware);

    router.get("/", handlers::home);
    router.get("/health", handlers::health);

    let heavy_state = Arc::clone(&state);
    router.get("/heavy", move |ctx: Context| {
        handlers::heavy(Arc::clone(&heavy_state), ctx)
    });

    let cache_state = Arc::clone(&state);
    router.get("/cacheme/:param", move |ctx: Context| {
        handlers::cacheme(Arc::clone(&cache_state), ctx)
    });

    router.get("/error", handlers::fail);

    router
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::{Instant, advance};

    use super::handlers::{Greeting, HEAVY_RESULT, Health, HeavyResult, Processed, TEST_ERROR};
    use super::*;
    use crate::http::{Method, Request, Response, StatusCode};

    fn setup() -> (Arc<AppState>, Router) {
        let state = Arc::new(AppState::new(Config::testing()));
        let router = router(Arc::clone(&state));
        (state, router)
    }

    async fn get(router: &Router, path: &str) -> Response {
        router.route(Request::new(Method::Get, path)).await
    }

    fn decode<T: serde::de::DeserializeOwned>(response: &Response) -> T {
        serde_json::from_slice(response.body_bytes()).unwrap()
    }

    #[tokio::test]
    async fn home_greets() {
        let (_, router) = setup();
        let res = get(&router, "/").await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(res.content_type(), Some("application/json"));
        let body: Greeting = decode(&res);
        assert_eq!(body.message, handlers::GREETING);
    }

    #[tokio::test]
    async fn health_is_ok_regardless_of_cache() {
        let (state, router) = setup();
        let expected = Health {
            status: "OK".to_owned(),
        };

        assert_eq!(decode::<Health>(&get(&router, "/health").await), expected);

        get(&router, "/cacheme/warm").await;
        assert_eq!(state.cache.len(), 1);
        let res = get(&router, "/health").await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(decode::<Health>(&res), expected);
        assert_eq!(state.cache.len(), 1);
    }

    #[tokio::test]
    async fn error_route_is_json_500() {
        let (_, router) = setup();
        for _ in 0..3 {
            let res = get(&router, "/error").await;
            assert_eq!(res.status(), StatusCode::InternalServerError);
            let body: serde_json::Value = decode(&res);
            assert_eq!(body["error"], TEST_ERROR);
        }
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (_, router) = setup();
        assert_eq!(get(&router, "/bigjson").await.status(), StatusCode::NotFound);
        assert_eq!(get(&router, "/cacheme").await.status(), StatusCode::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn cacheme_repeats_payload_within_timeout() {
        let (_, router) = setup();
        let first = get(&router, "/cacheme/abc").await;
        assert_eq!(first.status(), StatusCode::Ok);

        let body: Processed = decode(&first);
        assert_eq!(body.result, "Processed abc");
        assert!((1..=1000).contains(&body.random));

        advance(Duration::from_millis(999)).await;
        let second = get(&router, "/cacheme/abc").await;
        assert_eq!(second.body_bytes(), first.body_bytes());
    }

    #[tokio::test(start_paused = true)]
    async fn cacheme_recomputes_after_timeout() {
        let (state, router) = setup();
        get(&router, "/cacheme/abc").await;
        let key = crate::cache::cache_key(handlers::CACHEME_ROUTE, "abc");
        assert!(state.cache.contains(&key));

        advance(state.config.cache_default_timeout).await;
        assert!(!state.cache.contains(&key));

        let again: Processed = decode(&get(&router, "/cacheme/abc").await);
        assert_eq!(again.result, "Processed abc");
        assert!(state.cache.contains(&key));
    }

    #[tokio::test(start_paused = true)]
    async fn cacheme_keys_are_isolated() {
        let (state, router) = setup();
        let a: Processed = decode(&get(&router, "/cacheme/a").await);
        advance(Duration::from_millis(600)).await;
        let b: Processed = decode(&get(&router, "/cacheme/b").await);
        assert_eq!(a.result, "Processed a");
        assert_eq!(b.result, "Processed b");
        assert_eq!(state.cache.len(), 2);

        // `a` expires at 1000ms, `b` at 1600ms
        advance(Duration::from_millis(400)).await;
        assert!(!state.cache.contains(&crate::cache::cache_key(handlers::CACHEME_ROUTE, "a")));
        let b_again: Processed = decode(&get(&router, "/cacheme/b").await);
        assert_eq!(b_again, b);
    }

    #[tokio::test]
    async fn cacheme_echoes_the_literal_segment() {
        let (state, router) = setup();
        let body: Processed = decode(&get(&router, "/cacheme/a%20b").await);
        assert_eq!(body.result, "Processed a%20b");
        assert!(state.cache.contains(&crate::cache::cache_key(handlers::CACHEME_ROUTE, "a%20b")));
        assert!(!state.cache.contains(&crate::cache::cache_key(handlers::CACHEME_ROUTE, "a b")));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_makes_next_request_a_miss() {
        let (state, router) = setup();
        get(&router, "/cacheme/abc").await;
        assert_eq!(state.cache.len(), 1);

        state.cache.clear();
        assert!(state.cache.is_empty());

        get(&router, "/cacheme/abc").await;
        assert_eq!(state.cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn heavy_waits_without_blocking_health() {
        let (state, router) = setup();
        let router = Arc::new(router);
        let delay = state.config.heavy_delay;
        let start = Instant::now();

        let slow = tokio::spawn({
            let router = Arc::clone(&router);
            async move { get(&router, "/heavy").await }
        });
        tokio::task::yield_now().await;

        let res = get(&router, "/health").await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert!(start.elapsed() < delay);

        let heavy = slow.await.unwrap();
        assert!(start.elapsed() >= delay);
        assert_eq!(heavy.status(), StatusCode::Ok);
        assert_eq!(decode::<HeavyResult>(&heavy).result, HEAVY_RESULT);
    }
}
