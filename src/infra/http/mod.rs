mod admin;
mod auth;
mod follows;
mod middleware;
mod posts;
mod public;
mod state;

pub use auth::{CurrentUser, LOGIN_PATH, Viewer, login_redirect, safe_next};
pub use state::{AppState, Repositories, SessionCookie};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::{
    application::{error::ErrorReport, repos::RepoError},
    cache::page_cache_layer,
};

use self::middleware::{load_viewer, log_responses, set_request_context};

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Public site. Only the home page goes through the page cache.
pub fn build_router(state: AppState, upload_body_limit: usize) -> Router {
    let cached_routes = Router::new()
        .route("/", get(public::index))
        .route_layer(from_fn_with_state(
            state.page_cache.clone(),
            page_cache_layer,
        ));

    let upload_limit = DefaultBodyLimit::max(upload_body_limit);
    let routes = Router::new()
        .route("/group/{slug}/", get(public::group_posts))
        .route("/profile/{username}/", get(public::profile))
        .route("/profile/{username}/follow/", get(follows::follow))
        .route("/profile/{username}/unfollow/", get(follows::unfollow))
        .route("/posts/{id}/", get(public::post_detail))
        .route(
            "/posts/{id}/edit/",
            get(posts::edit_post_page)
                .post(posts::edit_post)
                .layer(upload_limit),
        )
        .route("/posts/{id}/comment/", post(posts::add_comment))
        .route(
            "/create/",
            get(posts::new_post_page)
                .post(posts::create_post)
                .layer(upload_limit),
        )
        .route("/follow/", get(public::follow_index))
        .route(
            "/auth/signup/",
            get(auth::signup_page).post(auth::signup_submit),
        )
        .route("/auth/login/", get(auth::login_page).post(auth::login_submit))
        .route("/auth/logout/", get(auth::logout))
        .route("/about/author/", get(public::about_author))
        .route("/about/tech/", get(public::about_tech))
        .route("/media/{*path}", get(public::serve_media))
        .route("/_health/db", get(public::public_health));

    cached_routes
        .merge(routes)
        .fallback(public::not_found)
        .with_state(state.clone())
        .layer(from_fn(log_responses))
        .layer(from_fn_with_state(state, load_viewer))
        .layer(from_fn(set_request_context))
}

/// Operator listener: cache control and health.
pub fn build_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/cache/flush", post(admin::flush_cache))
        .route("/health", get(admin::health))
        .with_state(state)
        .layer(from_fn(log_responses))
}
