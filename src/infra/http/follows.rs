use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    application::{error::HttpError, follows::FollowError},
    presentation::views::{profile_href, render_not_found_response},
};

use super::{AppState, auth::CurrentUser};

pub(super) async fn follow(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
) -> Response {
    match state.follows.follow(&user, &username).await {
        Ok(_) => Redirect::to(&profile_href(&username)).into_response(),
        Err(err) => follow_error_response(&state, &user, err),
    }
}

pub(super) async fn unfollow(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
) -> Response {
    match state.follows.unfollow(&user, &username).await {
        Ok(_) => Redirect::to(&profile_href(&username)).into_response(),
        Err(err) => follow_error_response(&state, &user, err),
    }
}

fn follow_error_response(
    state: &AppState,
    user: &crate::domain::entities::UserRecord,
    err: FollowError,
) -> Response {
    match err {
        FollowError::UnknownUser => render_not_found_response(state.chrome.load(Some(user))),
        err => HttpError::from(err).into_response(),
    }
}
