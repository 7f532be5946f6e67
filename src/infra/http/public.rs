use axum::{
    body::Body,
    extract::{Path, RawQuery, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tracing::error;
use uuid::Uuid;

use crate::{
    application::{
        error::{ErrorReport, HttpError},
        feed::FeedError,
        pagination::PageNumber,
    },
    infra::uploads::UploadStorageError,
    presentation::views::{
        AboutAuthorTemplate, AboutTechTemplate, FollowTemplate, GroupTemplate, IndexTemplate,
        LayoutChrome, LayoutContext, PostDetailTemplate, ProfileTemplate,
        render_not_found_response, render_template_response,
    },
};

use super::{
    AppState, db_health_response,
    auth::{CurrentUser, Viewer},
};

pub(super) async fn index(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    RawQuery(query): RawQuery,
) -> Response {
    let chrome = state.chrome.load(viewer.as_ref());
    match state.feed.home(PageNumber::from_query(query.as_deref())).await {
        Ok(content) => {
            let view = LayoutContext::new(chrome, content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

pub(super) async fn group_posts(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(slug): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let chrome = state.chrome.load(viewer.as_ref());
    match state.feed.group(&slug, PageNumber::from_query(query.as_deref())).await {
        Ok(content) => {
            let chrome = chrome.with_title(&content.group.title);
            let view = LayoutContext::new(chrome, content);
            render_template_response(GroupTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

pub(super) async fn profile(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(username): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let chrome = state.chrome.load(viewer.as_ref());
    match state
        .feed
        .profile(&username, viewer.as_ref(), PageNumber::from_query(query.as_deref()))
        .await
    {
        Ok(content) => {
            let chrome = chrome.with_title(format!("Profile of {}", content.author.display_name));
            let view = LayoutContext::new(chrome, content);
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

pub(super) async fn post_detail(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(raw_id): Path<String>,
) -> Response {
    let chrome = state.chrome.load(viewer.as_ref());
    let Ok(id) = Uuid::parse_str(&raw_id) else {
        return render_not_found_response(chrome);
    };

    match state.feed.post_detail(id, viewer.as_ref()).await {
        Ok(content) => {
            let chrome = chrome.with_title(format!("Post {}", content.post.preview));
            let view = LayoutContext::new(chrome, content);
            render_template_response(PostDetailTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

pub(super) async fn follow_index(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    RawQuery(query): RawQuery,
) -> Response {
    let chrome = state.chrome.load(Some(&user));
    match state.feed.following(&user, PageNumber::from_query(query.as_deref())).await {
        Ok(content) => {
            let view = LayoutContext::new(chrome.with_title("Following"), content);
            render_template_response(FollowTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

pub(super) async fn about_author(State(state): State<AppState>, Viewer(viewer): Viewer) -> Response {
    let chrome = state.chrome.load(viewer.as_ref()).with_title("About the author");
    let view = LayoutContext::new(chrome, ());
    render_template_response(AboutAuthorTemplate { view }, StatusCode::OK)
}

pub(super) async fn about_tech(State(state): State<AppState>, Viewer(viewer): Viewer) -> Response {
    let chrome = state.chrome.load(viewer.as_ref()).with_title("Technologies");
    let view = LayoutContext::new(chrome, ());
    render_template_response(AboutTechTemplate { view }, StatusCode::OK)
}

pub(super) async fn serve_media(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.uploads.read(&path).await {
        Ok(bytes) => build_media_response(&path, bytes),
        Err(UploadStorageError::InvalidPath) => media_not_found(SOURCE),
        Err(UploadStorageError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            media_not_found(SOURCE)
        }
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored media"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read media file",
                err.to_string(),
            )
            .into_response()
        }
    }
}

pub(super) async fn public_health(State(state): State<AppState>) -> Response {
    db_health_response(state.health.ping().await)
}

pub(super) async fn not_found(State(state): State<AppState>, Viewer(viewer): Viewer) -> Response {
    render_not_found_response(state.chrome.load(viewer.as_ref()))
}

pub(super) fn feed_error_to_response(err: FeedError, chrome: LayoutChrome) -> Response {
    let reason = match err {
        FeedError::UnknownGroup => "Unknown group",
        FeedError::UnknownUser => "Unknown user",
        FeedError::UnknownPost => "Unknown post",
        err => return HttpError::from(err).into_response(),
    };

    let mut response = render_not_found_response(chrome);
    ErrorReport::from_message(
        "infra::http::feed_error_to_response",
        StatusCode::NOT_FOUND,
        reason,
    )
    .attach(&mut response);
    response
}

fn media_not_found(source: &'static str) -> Response {
    HttpError::new(
        source,
        StatusCode::NOT_FOUND,
        "Media not found",
        "The requested media file is not available",
    )
    .into_response()
}

fn build_media_response(path: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    // Stored names carry a random prefix, so a path never changes content.
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}
