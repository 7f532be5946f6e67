use std::convert::Infallible;

use axum::{
    Form,
    extract::{FromRequestParts, Query, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::info;

use crate::{
    application::{
        accounts::{AccountError, INVALID_LOGIN, IssuedSession, SignupForm},
        error::HttpError,
    },
    domain::{entities::UserRecord, error::FieldErrors},
    presentation::views::{
        FormErrorsView, LayoutContext, LoggedOutTemplate, LoginContext, LoginTemplate,
        SignupContext, SignupTemplate, render_template_response,
    },
};

use super::AppState;
use super::state::SessionCookie;

pub const LOGIN_PATH: &str = "/auth/login/";
const REQUIRED: &str = "This field is required.";

/// The signed-in user, if any. Never rejects.
pub struct Viewer(pub Option<UserRecord>);

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(parts.extensions.get::<UserRecord>().cloned()))
    }
}

/// A signed-in user. Anonymous requests are redirected to the login page
/// with the original path carried in `next`.
pub struct CurrentUser(pub UserRecord);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<UserRecord>() {
            Some(user) => Ok(CurrentUser(user.clone())),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|value| value.as_str())
                    .unwrap_or("/");
                Err(Redirect::to(&login_redirect(next)))
            }
        }
    }
}

pub fn login_redirect(next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{LOGIN_PATH}?next={encoded}")
}

/// Only same-site absolute paths are followed after login.
pub fn safe_next(candidate: Option<&str>) -> String {
    match candidate.map(str::trim) {
        Some(path)
            if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

fn session_cookie(settings: &SessionCookie, session: &IssuedSession) -> Cookie<'static> {
    Cookie::build((settings.name.clone(), session.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.secure)
        .expires(session.expires_at)
        .build()
}

fn removal_cookie(settings: &SessionCookie) -> Cookie<'static> {
    Cookie::build(settings.name.clone()).path("/").build()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct NextQuery {
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginForm {
    username: String,
    password: String,
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SignupPayload {
    first_name: String,
    last_name: String,
    username: String,
    email: String,
    password1: String,
    password2: String,
}

impl From<SignupPayload> for SignupForm {
    fn from(payload: SignupPayload) -> Self {
        Self {
            first_name: payload.first_name,
            last_name: payload.last_name,
            username: payload.username,
            email: payload.email,
            password1: payload.password1,
            password2: payload.password2,
        }
    }
}

pub(super) async fn login_page(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Query(query): Query<NextQuery>,
) -> Response {
    let context = LoginContext {
        username: String::new(),
        next: safe_next(query.next.as_deref()),
        errors: FormErrorsView::default(),
    };
    render_login(&state, viewer.as_ref(), context)
}

pub(super) async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref());

    let mut errors = FieldErrors::new();
    if form.username.trim().is_empty() {
        errors.push("username", REQUIRED);
    }
    if form.password.is_empty() {
        errors.push("password", REQUIRED);
    }

    let mut user = None;
    if errors.is_empty() {
        match state.accounts.authenticate(&form.username, &form.password).await {
            Ok(found) => user = Some(found),
            Err(AccountError::InvalidCredentials) => errors.push("__all__", INVALID_LOGIN),
            Err(err) => return HttpError::from(err).into_response(),
        }
    }

    let Some(user) = user else {
        let context = LoginContext {
            username: form.username,
            next,
            errors: FormErrorsView::from(errors),
        };
        return render_login(&state, None, context);
    };

    match state.accounts.open_session(user.id).await {
        Ok(session) => {
            info!(target = "chorus::http::auth", user = %user.username, "signed in");
            let jar = jar.add(session_cookie(&state.session_cookie, &session));
            (jar, Redirect::to(&next)).into_response()
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn signup_page(State(state): State<AppState>, Viewer(viewer): Viewer) -> Response {
    render_signup(&state, viewer.as_ref(), SignupContext::default())
}

pub(super) async fn signup_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(payload): Form<SignupPayload>,
) -> Response {
    let sticky = SignupContext {
        first_name: payload.first_name.clone(),
        last_name: payload.last_name.clone(),
        username: payload.username.clone(),
        email: payload.email.clone(),
        errors: FormErrorsView::default(),
    };

    let user = match state.accounts.signup(payload.into()).await {
        Ok(user) => user,
        Err(AccountError::Invalid(errors)) => {
            let context = SignupContext {
                errors: FormErrorsView::from(errors),
                ..sticky
            };
            return render_signup(&state, None, context);
        }
        Err(err) => return HttpError::from(err).into_response(),
    };

    match state.accounts.open_session(user.id).await {
        Ok(session) => {
            let jar = jar.add(session_cookie(&state.session_cookie, &session));
            (jar, Redirect::to("/")).into_response()
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(&state.session_cookie.name)
        && let Err(err) = state.accounts.close_session(cookie.value()).await
    {
        return HttpError::from(err).into_response();
    }

    let jar = jar.remove(removal_cookie(&state.session_cookie));
    let chrome = state.chrome.load(None).with_title("Logged out");
    let view = LayoutContext::new(chrome, ());
    (jar, render_template_response(LoggedOutTemplate { view }, StatusCode::OK)).into_response()
}

fn render_login(state: &AppState, viewer: Option<&UserRecord>, context: LoginContext) -> Response {
    let chrome = state.chrome.load(viewer).with_title("Log in");
    let view = LayoutContext::new(chrome, context);
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

fn render_signup(
    state: &AppState,
    viewer: Option<&UserRecord>,
    context: SignupContext,
) -> Response {
    let chrome = state.chrome.load(viewer).with_title("Sign up");
    let view = LayoutContext::new(chrome, context);
    render_template_response(SignupTemplate { view }, StatusCode::OK)
}
