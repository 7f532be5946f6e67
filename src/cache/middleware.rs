//! Page cache middleware.
//!
//! Wraps individual routes with `route_layer`. Only GET requests that render
//! a plain 200 are stored; responses that set cookies are passed through.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;
use tracing::{debug, instrument, warn};

use super::{PageCache, PageCacheConfig, keys::PageCacheKey, store::CachedResponse};

#[derive(Clone)]
pub struct PageCacheState {
    pub config: PageCacheConfig,
    pub cache: Arc<PageCache>,
}

impl PageCacheState {
    pub fn new(config: PageCacheConfig) -> Self {
        let cache = Arc::new(PageCache::new(&config));
        Self { config, cache }
    }
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn page_cache_layer(
    State(state): State<PageCacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.enabled || request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = PageCacheKey::for_request(&request);
    if let Some(cached) = state.cache.get(&key) {
        debug!(cache = "page", outcome = "hit", "serving cached page");
        return build_response(cached);
    }

    debug!(cache = "page", outcome = "miss", "rendering page");
    let response = next.run(request).await;
    if !should_store(&response) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            warn!(cache = "page", error = %err, "failed to buffer response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    state.cache.insert(
        key,
        CachedResponse {
            status: parts.status,
            headers: parts.headers.clone(),
            body: bytes.clone(),
        },
    );

    Response::from_parts(parts, Body::from(bytes))
}

fn should_store(response: &Response) -> bool {
    response.status() == StatusCode::OK && !response.headers().contains_key(header::SET_COOKIE)
}

fn build_response(cached: CachedResponse) -> Response {
    let mut response = Response::new(Body::from(cached.body));
    *response.status_mut() = cached.status;
    *response.headers_mut() = cached.headers;
    response
}
