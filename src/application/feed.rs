use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{POSTS_PER_PAGE, Page, PageNumber, PageWindow};
use crate::application::repos::{
    CommentsRepo, FollowsRepo, GroupsRepo, PostScope, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{PostRecord, UserRecord};
use crate::presentation::views::{
    CommentFormView, CommentView, FeedContext, FollowFeedContext, GroupContext, GroupHeaderView,
    PaginationView, PostCard, PostDetailContext, ProfileAuthorView, ProfileContext, group_href,
    post_href, profile_href,
};

const HOME_HEADING: &str = "Latest posts";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group")]
    UnknownGroup,
    #[error("unknown user")]
    UnknownUser,
    #[error("unknown post")]
    UnknownPost,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Builds the paginated feeds and the post detail page.
#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        follows: Arc<dyn FollowsRepo>,
        comments: Arc<dyn CommentsRepo>,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            follows,
            comments,
        }
    }

    /// Count the scope, clamp the requested page against it, then fetch that slice.
    pub async fn load_page(
        &self,
        scope: PostScope,
        requested: PageNumber,
    ) -> Result<Page<PostRecord>, FeedError> {
        let total = self.posts.count_posts(scope).await?;
        let window = PageWindow::resolve(total, requested, POSTS_PER_PAGE);
        let items = if total == 0 {
            Vec::new()
        } else {
            self.posts
                .list_posts(scope, window.offset, window.limit)
                .await?
        };
        Ok(Page::new(items, window))
    }

    pub async fn home(&self, page: PageNumber) -> Result<FeedContext, FeedError> {
        let page = self.load_page(PostScope::All, page).await?;
        Ok(FeedContext {
            heading: HOME_HEADING.to_string(),
            pagination: PaginationView::from_page(&page, "/"),
            posts: cards(&page),
        })
    }

    pub async fn group(&self, slug: &str, page: PageNumber) -> Result<GroupContext, FeedError> {
        let group = self
            .groups
            .find_group_by_slug(slug)
            .await?
            .ok_or(FeedError::UnknownGroup)?;

        let page = self.load_page(PostScope::Group(group.id), page).await?;
        Ok(GroupContext {
            pagination: PaginationView::from_page(&page, &group_href(&group.slug)),
            posts: cards(&page),
            group: GroupHeaderView::from(&group),
        })
    }

    pub async fn profile(
        &self,
        username: &str,
        viewer: Option<&UserRecord>,
        page: PageNumber,
    ) -> Result<ProfileContext, FeedError> {
        let author = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or(FeedError::UnknownUser)?;

        let page = self.load_page(PostScope::Author(author.id), page).await?;
        let counts = self.follows.follow_counts(author.id).await?;
        let following = match viewer {
            Some(viewer) if viewer.id != author.id => {
                self.follows.is_following(viewer.id, author.id).await?
            }
            _ => false,
        };
        let base = profile_href(&author.username);

        Ok(ProfileContext {
            author: ProfileAuthorView {
                username: author.username.clone(),
                display_name: author.display_name(),
                post_count: page.total,
                followers: counts.followers,
                following: counts.following,
                follow_href: format!("{base}follow/"),
                unfollow_href: format!("{base}unfollow/"),
            },
            pagination: PaginationView::from_page(&page, &base),
            posts: cards(&page),
            following,
            is_self: viewer.is_some_and(|viewer| viewer.id == author.id),
            viewer_authenticated: viewer.is_some(),
        })
    }

    pub async fn following(
        &self,
        viewer: &UserRecord,
        page: PageNumber,
    ) -> Result<FollowFeedContext, FeedError> {
        let page = self.load_page(PostScope::FollowedBy(viewer.id), page).await?;
        Ok(FollowFeedContext {
            empty: page.total == 0,
            pagination: PaginationView::from_page(&page, "/follow/"),
            posts: cards(&page),
        })
    }

    pub async fn post_detail(
        &self,
        id: Uuid,
        viewer: Option<&UserRecord>,
    ) -> Result<PostDetailContext, FeedError> {
        let post = self
            .posts
            .find_post(id)
            .await?
            .ok_or(FeedError::UnknownPost)?;

        let author_post_count = self
            .posts
            .count_posts(PostScope::Author(post.author.id))
            .await?;
        let comments = self.comments.list_comments(post.id).await?;

        Ok(PostDetailContext {
            author_post_count,
            can_edit: viewer.is_some_and(|viewer| post.is_authored_by(viewer.id)),
            edit_href: format!("{}edit/", post_href(post.id)),
            comment_action: format!("{}comment/", post_href(post.id)),
            comments: comments.iter().map(CommentView::from).collect(),
            show_comment_form: viewer.is_some(),
            comment_form: CommentFormView::default(),
            post: PostCard::from(&post),
        })
    }
}

fn cards(page: &Page<PostRecord>) -> Vec<PostCard> {
    page.items.iter().map(PostCard::from).collect()
}
