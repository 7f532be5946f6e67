use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{CommentsRepo, CreateCommentParams, PostsRepo, RepoError};
use crate::domain::entities::{CommentRecord, UserRecord};
use crate::domain::error::FieldErrors;
use crate::domain::posts::validate_text;

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("unknown post")]
    UnknownPost,
    #[error("invalid comment: {0}")]
    Invalid(FieldErrors),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct CommentService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl CommentService {
    pub fn new(posts: Arc<dyn PostsRepo>, comments: Arc<dyn CommentsRepo>) -> Self {
        Self { posts, comments }
    }

    /// Store a comment from `author`. Blank text is rejected before anything is written.
    pub async fn add_comment(
        &self,
        post_id: Uuid,
        author: &UserRecord,
        text: &str,
    ) -> Result<CommentRecord, CommentError> {
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(CommentError::UnknownPost)?;

        let text = validate_text("text", text).map_err(|err| {
            let mut errors = FieldErrors::new();
            errors.collect::<()>(Err(err));
            CommentError::Invalid(errors)
        })?;

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id: author.id,
                text,
            })
            .await?;
        Ok(comment)
    }
}
