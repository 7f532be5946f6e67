use std::sync::Arc;

use crate::{
    application::{
        accounts::AccountService,
        chrome::ChromeService,
        comments::CommentService,
        feed::FeedService,
        follows::FollowService,
        posts::PostService,
        repos::{
            CommentsRepo, FollowsRepo, GroupsRepo, HealthRepo, PostsRepo, PostsWriteRepo,
            SessionsRepo, UsersRepo,
        },
    },
    cache::{PageCacheConfig, PageCacheState},
    config::SessionSettings,
    infra::uploads::UploadStorage,
};

/// Every store the HTTP surface reads from or writes to.
pub trait Repositories:
    UsersRepo
    + GroupsRepo
    + PostsRepo
    + PostsWriteRepo
    + CommentsRepo
    + FollowsRepo
    + SessionsRepo
    + HealthRepo
    + 'static
{
}

impl<T> Repositories for T where
    T: UsersRepo
        + GroupsRepo
        + PostsRepo
        + PostsWriteRepo
        + CommentsRepo
        + FollowsRepo
        + SessionsRepo
        + HealthRepo
        + 'static
{
}

/// Name and attributes of the session cookie.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub name: String,
    pub secure: bool,
}

impl From<&SessionSettings> for SessionCookie {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            name: settings.cookie_name.clone(),
            secure: settings.secure_cookie,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub follows: Arc<FollowService>,
    pub accounts: Arc<AccountService>,
    pub chrome: Arc<ChromeService>,
    pub uploads: Arc<UploadStorage>,
    pub health: Arc<dyn HealthRepo>,
    pub page_cache: PageCacheState,
    pub session_cookie: SessionCookie,
}

impl AppState {
    /// Wire the application services over a single repository implementation.
    pub fn new<R: Repositories>(
        repos: Arc<R>,
        uploads: Arc<UploadStorage>,
        chrome: ChromeService,
        cache: PageCacheConfig,
        sessions: &SessionSettings,
    ) -> Self {
        let feed = FeedService::new(
            repos.clone(),
            repos.clone(),
            repos.clone(),
            repos.clone(),
            repos.clone(),
        );
        let posts = PostService::new(repos.clone(), repos.clone(), repos.clone(), uploads.clone());
        let comments = CommentService::new(repos.clone(), repos.clone());
        let follows = FollowService::new(repos.clone(), repos.clone());
        let accounts = AccountService::new(repos.clone(), repos.clone(), sessions.ttl);

        Self {
            feed: Arc::new(feed),
            posts: Arc::new(posts),
            comments: Arc::new(comments),
            follows: Arc::new(follows),
            accounts: Arc::new(accounts),
            chrome: Arc::new(chrome),
            uploads,
            health: repos,
            page_cache: PageCacheState::new(cache),
            session_cookie: SessionCookie::from(sessions),
        }
    }
}
