use crate::application::error::{ErrorReport, HttpError};
use crate::application::pagination::Page;
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord};
use crate::domain::error::FieldErrors;
use crate::domain::posts::{human_date, iso_date};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let content = ErrorPageView::not_found();
    let view = LayoutContext::new(chrome.with_title("Page not found"), content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct NavigationView {
    pub entries: Vec<NavigationLinkView>,
}

#[derive(Clone)]
pub struct NavigationLinkView {
    pub label: String,
    pub href: String,
}

#[derive(Clone)]
pub struct BrandView {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct FooterView {
    pub copy: String,
}

/// Who is looking at the page, as far as the header is concerned.
#[derive(Clone, Default)]
pub struct ViewerView {
    pub username: Option<String>,
}

impl ViewerView {
    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: BrandView,
    pub navigation: NavigationView,
    pub footer: FooterView,
    pub viewer: ViewerView,
    pub meta: PageMetaView,
}

impl LayoutChrome {
    pub fn with_title(self, title: impl AsRef<str>) -> Self {
        let title = format!("{} | {}", title.as_ref(), self.brand.title);
        Self {
            meta: PageMetaView { title, ..self.meta },
            ..self
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub brand: BrandView,
    pub navigation: NavigationView,
    pub footer: FooterView,
    pub viewer: ViewerView,
    pub meta: PageMetaView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            brand: chrome.brand,
            navigation: chrome.navigation,
            footer: chrome.footer,
            viewer: chrome.viewer,
            meta: chrome.meta,
            content,
        }
    }
}

#[derive(Clone)]
pub struct GroupBadge {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct PostCard {
    pub id: Uuid,
    pub text: String,
    pub preview: String,
    pub author_username: String,
    pub author_name: String,
    pub author_href: String,
    pub published: String,
    pub iso_date: String,
    pub group: Option<GroupBadge>,
    pub image_url: Option<String>,
    pub detail_href: String,
}

impl From<&PostRecord> for PostCard {
    fn from(post: &PostRecord) -> Self {
        Self {
            id: post.id,
            text: post.text.clone(),
            preview: post.preview(),
            author_username: post.author.username.clone(),
            author_name: post.author.display_name(),
            author_href: profile_href(&post.author.username),
            published: human_date(post.pub_date),
            iso_date: iso_date(post.pub_date),
            group: post.group.as_ref().map(|group| GroupBadge {
                title: group.title.clone(),
                href: group_href(&group.slug),
            }),
            image_url: post.image.as_deref().map(media_href),
            detail_href: post_href(post.id),
        }
    }
}

pub struct PageLinkView {
    pub number: u64,
    pub href: String,
    pub is_current: bool,
}

pub struct PaginationView {
    pub number: u64,
    pub num_pages: u64,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
    pub first_href: String,
    pub last_href: String,
    pub pages: Vec<PageLinkView>,
}

impl PaginationView {
    pub fn from_page<T>(page: &Page<T>, base_path: &str) -> Self {
        let href = |number: u64| format!("{base_path}?page={number}");
        // Show at most two neighbours on either side of the current page.
        let start = page.number.saturating_sub(2).max(1);
        let end = (page.number + 2).min(page.num_pages);
        let pages = (start..=end)
            .map(|number| PageLinkView {
                number,
                href: href(number),
                is_current: number == page.number,
            })
            .collect();

        Self {
            number: page.number,
            num_pages: page.num_pages,
            previous_href: page.previous_number().map(href),
            next_href: page.next_number().map(href),
            first_href: href(1),
            last_href: href(page.num_pages),
            pages,
        }
    }

    pub fn is_paginated(&self) -> bool {
        self.num_pages > 1
    }
}

pub struct FeedContext {
    pub heading: String,
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<FeedContext>,
}

pub struct GroupHeaderView {
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl From<&GroupRecord> for GroupHeaderView {
    fn from(group: &GroupRecord) -> Self {
        Self {
            title: group.title.clone(),
            slug: group.slug.clone(),
            description: group.description.clone(),
        }
    }
}

pub struct GroupContext {
    pub group: GroupHeaderView,
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

#[derive(Template)]
#[template(path = "group.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupContext>,
}

pub struct ProfileAuthorView {
    pub username: String,
    pub display_name: String,
    pub post_count: u64,
    pub followers: u64,
    pub following: u64,
    pub follow_href: String,
    pub unfollow_href: String,
}

pub struct ProfileContext {
    pub author: ProfileAuthorView,
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
    /// The viewer currently follows this author. Always false for anonymous viewers.
    pub following: bool,
    pub is_self: bool,
    pub viewer_authenticated: bool,
}

impl ProfileContext {
    pub fn can_follow(&self) -> bool {
        self.viewer_authenticated && !self.is_self
    }
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileContext>,
}

pub struct FollowFeedContext {
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
    /// No followed author has any post. Distinct from a page past the end.
    pub empty: bool,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<FollowFeedContext>,
}

pub struct CommentView {
    pub author_username: String,
    pub author_href: String,
    pub text: String,
    pub created: String,
    pub iso_date: String,
}

impl From<&CommentRecord> for CommentView {
    fn from(comment: &CommentRecord) -> Self {
        Self {
            author_username: comment.author.username.clone(),
            author_href: profile_href(&comment.author.username),
            text: comment.text.clone(),
            created: human_date(comment.created),
            iso_date: iso_date(comment.created),
        }
    }
}

#[derive(Default)]
pub struct CommentFormView {
    pub text: String,
    pub errors: FormErrorsView,
}

pub struct PostDetailContext {
    pub post: PostCard,
    pub author_post_count: u64,
    pub can_edit: bool,
    pub edit_href: String,
    pub comment_action: String,
    pub comments: Vec<CommentView>,
    pub show_comment_form: bool,
    pub comment_form: CommentFormView,
}

impl PostDetailContext {
    pub fn with_comment_form(self, text: impl Into<String>, errors: FieldErrors) -> Self {
        Self {
            comment_form: CommentFormView {
                text: text.into(),
                errors: FormErrorsView::from(errors),
            },
            ..self
        }
    }
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailContext>,
}

pub struct GroupOptionView {
    pub id: String,
    pub title: String,
    pub selected: bool,
}

pub struct PostFormContext {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOptionView>,
    pub current_image: Option<String>,
    pub errors: FormErrorsView,
}

impl PostFormContext {
    pub fn no_group_selected(&self) -> bool {
        !self.groups.iter().any(|group| group.selected)
    }
}

#[derive(Template)]
#[template(path = "create_post.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormContext>,
}

/// Field errors in a shape templates can query by field name.
#[derive(Default, Clone)]
pub struct FormErrorsView {
    errors: FieldErrors,
}

impl FormErrorsView {
    pub fn field(&self, name: &str) -> Vec<String> {
        self.errors.for_field(name)
    }

    pub fn non_field(&self) -> Vec<String> {
        self.errors.for_field("__all__")
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl From<FieldErrors> for FormErrorsView {
    fn from(errors: FieldErrors) -> Self {
        Self { errors }
    }
}

pub struct LoginContext {
    pub username: String,
    pub next: String,
    pub errors: FormErrorsView,
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginContext>,
}

#[derive(Default)]
pub struct SignupContext {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub errors: FormErrorsView,
}

#[derive(Template)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub view: LayoutContext<SignupContext>,
}

#[derive(Template)]
#[template(path = "auth/logged_out.html")]
pub struct LoggedOutTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "about/author.html")]
pub struct AboutAuthorTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "about/tech.html")]
pub struct AboutTechTemplate {
    pub view: LayoutContext<()>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page not found".to_string(),
            message: "The page you requested does not exist.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Back to home".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

pub fn profile_href(username: &str) -> String {
    format!("/profile/{}/", encode_segment(username))
}

pub fn group_href(slug: &str) -> String {
    format!("/group/{slug}/")
}

pub fn post_href(id: Uuid) -> String {
    format!("/posts/{id}/")
}

pub fn media_href(path: &str) -> String {
    format!("/media/{path}")
}

fn encode_segment(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
