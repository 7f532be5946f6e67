use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::info;

use super::{AppState, db_health_response};

pub(super) async fn flush_cache(State(state): State<AppState>) -> Response {
    let dropped = state.page_cache.cache.len();
    state.page_cache.cache.flush();
    info!(
        target = "chorus::http::admin",
        dropped, "page cache flushed"
    );
    StatusCode::NO_CONTENT.into_response()
}

pub(super) async fn health(State(state): State<AppState>) -> Response {
    db_health_response(state.health.ping().await)
}
