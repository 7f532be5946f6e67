//! Follow-graph mutations.
//!
//! Both operations always end on the target's profile, whatever happened.
//! Following yourself is accepted and ignored, repeating a follow leaves a
//! single edge, and unfollowing an author you don't follow does nothing.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

const SOURCE: &str = "application::follows::FollowService";

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("unknown user")]
    UnknownUser,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    SelfFollowIgnored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfollowOutcome {
    Removed,
    NotFollowing,
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    pub async fn follow(
        &self,
        viewer: &UserRecord,
        username: &str,
    ) -> Result<FollowOutcome, FollowError> {
        let author = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or(FollowError::UnknownUser)?;

        if author.id == viewer.id {
            debug!(target = SOURCE, user = %viewer.username, "ignoring self-follow");
            return Ok(FollowOutcome::SelfFollowIgnored);
        }

        let created = self.follows.follow(viewer.id, author.id).await?;
        debug!(
            target = SOURCE,
            follower = %viewer.username,
            author = %author.username,
            created,
            "follow edge ensured"
        );

        Ok(if created {
            FollowOutcome::Created
        } else {
            FollowOutcome::AlreadyFollowing
        })
    }

    pub async fn unfollow(
        &self,
        viewer: &UserRecord,
        username: &str,
    ) -> Result<UnfollowOutcome, FollowError> {
        let author = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or(FollowError::UnknownUser)?;

        let removed = self.follows.unfollow(viewer.id, author.id).await?;
        Ok(if removed {
            UnfollowOutcome::Removed
        } else {
            UnfollowOutcome::NotFollowing
        })
    }
}
