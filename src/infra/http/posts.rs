use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::Multipart;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    application::{
        comments::CommentError,
        error::HttpError,
        posts::{EditAccess, EditOutcome, ImageUpload, PostForm, PostFormError},
    },
    domain::{entities::UserRecord, error::FieldErrors},
    presentation::views::{
        LayoutContext, PostDetailTemplate, PostFormContext, PostFormTemplate, post_href,
        profile_href, render_not_found_response, render_template_response,
    },
};

use super::{AppState, auth::CurrentUser, public::feed_error_to_response};

const SOURCE: &str = "infra::http::posts";

pub(super) async fn new_post_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Response {
    match state.posts.new_form().await {
        Ok(context) => render_form(&state, &user, context),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Response {
    let form = match read_post_form(multipart).await {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };

    match state.posts.create(&user, form.clone()).await {
        Ok(_) => Redirect::to(&profile_href(&user.username)).into_response(),
        Err(PostFormError::Invalid(errors)) => {
            rerender_form(&state, &user, None, &form, errors).await
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn edit_post_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(raw_id): Path<String>,
) -> Response {
    let Ok(post_id) = Uuid::parse_str(&raw_id) else {
        return render_not_found_response(state.chrome.load(Some(&user)));
    };

    match state.posts.load_for_edit(post_id, &user).await {
        Ok(EditAccess::Allowed(context)) => render_form(&state, &user, context),
        Ok(EditAccess::NotAuthor(id)) => Redirect::to(&post_href(id)).into_response(),
        Err(PostFormError::UnknownPost) => render_not_found_response(state.chrome.load(Some(&user))),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn edit_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(raw_id): Path<String>,
    multipart: Multipart,
) -> Response {
    let Ok(post_id) = Uuid::parse_str(&raw_id) else {
        return render_not_found_response(state.chrome.load(Some(&user)));
    };
    let form = match read_post_form(multipart).await {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };

    match state.posts.edit(post_id, &user, form.clone()).await {
        Ok(EditOutcome::Saved(post)) => Redirect::to(&post_href(post.id)).into_response(),
        Ok(EditOutcome::NotAuthor(id)) => Redirect::to(&post_href(id)).into_response(),
        Err(PostFormError::Invalid(errors)) => {
            let post = match state.posts.find(post_id).await {
                Ok(post) => post,
                Err(err) => return HttpError::from(err).into_response(),
            };
            let current_image = if form.clear_image {
                None
            } else {
                post.image.clone()
            };
            rerender_form(&state, &user, Some((&post, current_image)), &form, errors).await
        }
        Err(PostFormError::UnknownPost) => render_not_found_response(state.chrome.load(Some(&user))),
        Err(err) => HttpError::from(err).into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CommentPayload {
    text: String,
}

pub(super) async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(raw_id): Path<String>,
    Form(payload): Form<CommentPayload>,
) -> Response {
    let chrome = state.chrome.load(Some(&user));
    let Ok(post_id) = Uuid::parse_str(&raw_id) else {
        return render_not_found_response(chrome);
    };

    match state.comments.add_comment(post_id, &user, &payload.text).await {
        Ok(_) => Redirect::to(&post_href(post_id)).into_response(),
        Err(CommentError::Invalid(errors)) => {
            match state.feed.post_detail(post_id, Some(&user)).await {
                Ok(content) => {
                    let content = content.with_comment_form(payload.text, errors);
                    let chrome = chrome.with_title(format!("Post {}", content.post.preview));
                    let view = LayoutContext::new(chrome, content);
                    render_template_response(PostDetailTemplate { view }, StatusCode::OK)
                }
                Err(err) => feed_error_to_response(err, chrome),
            }
        }
        Err(CommentError::UnknownPost) => render_not_found_response(chrome),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn rerender_form(
    state: &AppState,
    user: &UserRecord,
    editing: Option<(&crate::domain::entities::PostRecord, Option<String>)>,
    form: &PostForm,
    errors: FieldErrors,
) -> Response {
    let (post, current_image) = match editing {
        Some((post, image)) => (Some(post), image),
        None => (None, None),
    };

    match state
        .posts
        .form_context(post, form, current_image.as_deref(), errors)
        .await
    {
        Ok(context) => render_form(state, user, context),
        Err(err) => HttpError::from(err).into_response(),
    }
}

fn render_form(state: &AppState, user: &UserRecord, context: PostFormContext) -> Response {
    let title = if context.is_edit { "Edit post" } else { "New post" };
    let chrome = state.chrome.load(Some(user)).with_title(title);
    let view = LayoutContext::new(chrome, context);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

/// Collect the multipart post form. A file part with an empty filename means
/// no file was chosen.
async fn read_post_form(mut multipart: Multipart) -> Result<PostForm, HttpError> {
    let mut form = PostForm::default();

    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "text" => form.text = field.text().await.map_err(invalid_multipart)?,
            "group" => form.group = Some(field.text().await.map_err(invalid_multipart)?),
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(invalid_multipart)?;
                if !filename.is_empty() {
                    form.image = Some(ImageUpload { filename, bytes });
                }
            }
            "image-clear" => {
                let value = field.text().await.map_err(invalid_multipart)?;
                form.clear_image = !value.is_empty();
            }
            _ => {}
        }
    }

    Ok(form)
}

fn invalid_multipart(err: axum_extra::extract::multipart::MultipartError) -> HttpError {
    HttpError::from_error(
        SOURCE,
        StatusCode::BAD_REQUEST,
        "Invalid form submission",
        &err,
    )
}
