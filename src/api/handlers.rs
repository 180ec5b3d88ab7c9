//! Route handlers and their JSON payloads.

use std::sync::Arc;

use bytes::Bytes;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::AppState;
use crate::cache::{cache_key, cached};
use crate::context::Context;
use crate::error::{HandlerError, HandlerResult};
use crate::http::{Response, StatusCode};

/// Cache namespace for `/cacheme/:param` entries.
pub const CACHEME_ROUTE: &str = "cacheme";

pub const GREETING: &str = "Hello from pulse!";
pub const HEAVY_RESULT: &str = "Heavy computation done!";
pub const TEST_ERROR: &str = "This is a test error for monitoring/logging purposes";

/// Body of `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Greeting {
    pub message: String,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}

/// Body of `GET /heavy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeavyResult {
    pub result: String,
}

/// Body of `GET /cacheme/:param`. `random` is drawn from `1..=1000` on every cache miss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Processed {
    pub result: String,
    pub random: u32,
}

pub async fn home(_ctx: Context) -> HandlerResult {
    info!("Home endpoint hit");
    Ok(Response::json(
        StatusCode::Ok,
        &Greeting {
            message: GREETING.to_owned(),
        },
    )?)
}

/// Liveness probe; touches neither the cache nor the clock.
pub async fn health(_ctx: Context) -> HandlerResult {
    Ok(Response::json(
        StatusCode::Ok,
        &Health {
            status: "OK".to_owned(),
        },
    )?)
}

/// Sleeps for the configured delay, then answers. The sleep yields to the
/// runtime and holds no lock.
pub async fn heavy(state: Arc<AppState>, _ctx: Context) -> HandlerResult {
    info!(delay = ?state.config.heavy_delay, "Heavy endpoint simulating load");
    tokio::time::sleep(state.config.heavy_delay).await;
    Ok(Response::json(
        StatusCode::Ok,
        &HeavyResult {
            result: HEAVY_RESULT.to_owned(),
        },
    )?)
}

/// Serves the rendered payload for `param` from the cache, computing and
/// storing a fresh one on a miss.
///
/// The stored bytes are returned unchanged, so every hit within the timeout
/// repeats the same `random` value.
pub async fn cacheme(state: Arc<AppState>, ctx: Context) -> HandlerResult {
    let param = ctx
        .param("param")
        .ok_or_else(|| HandlerError::fault("missing path parameter `param`"))?;
    let key = cache_key(CACHEME_ROUTE, param);

    let body = cached(&state.cache, &key, state.cache.default_ttl(), || async move {
        info!("Caching result for: {param}");
        let payload = Processed {
            result: format!("Processed {param}"),
            random: rand::thread_rng().gen_range(1..=1000),
        };
        Ok::<_, HandlerError>(Bytes::from(serde_json::to_vec(&payload)?))
    })
    .await?;

    Ok(Response::json_bytes(StatusCode::Ok, body))
}

/// Always fails, so the fault boundary can be observed end to end.
pub async fn fail(_ctx: Context) -> HandlerResult {
    error!("Intentional error triggered");
    Err(HandlerError::fault(TEST_ERROR))
}
