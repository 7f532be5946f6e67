//! Group management used by the operator CLI. Groups have no web form.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{CreateGroupParams, GroupsRepo, GroupsWriteRepo, RepoError};
use crate::domain::entities::GroupRecord;
use crate::domain::slug::{SlugAsyncError, SlugError, generate_unique_slug_async, validate_slug};

const SOURCE: &str = "application::groups::GroupService";
const TITLE_MAX_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateGroupCommand {
    pub title: String,
    /// Derived from the title when absent.
    pub slug: Option<String>,
    pub description: String,
}

#[derive(Clone)]
pub struct GroupService {
    reader: Arc<dyn GroupsRepo>,
    writer: Arc<dyn GroupsWriteRepo>,
}

impl GroupService {
    pub fn new(reader: Arc<dyn GroupsRepo>, writer: Arc<dyn GroupsWriteRepo>) -> Self {
        Self { reader, writer }
    }

    pub async fn list(&self) -> Result<Vec<GroupRecord>, GroupError> {
        Ok(self.reader.list_groups().await?)
    }

    pub async fn create(&self, command: CreateGroupCommand) -> Result<GroupRecord, GroupError> {
        let title = command.title.trim().to_string();
        if title.is_empty() {
            return Err(GroupError::Invalid("title must not be empty".into()));
        }
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(GroupError::Invalid(format!(
                "title must be at most {TITLE_MAX_CHARS} characters"
            )));
        }

        let slug = match command.slug.as_deref() {
            Some(raw) => {
                let slug = validate_slug(raw)?;
                if self.reader.find_group_by_slug(&slug).await?.is_some() {
                    return Err(GroupError::Invalid(format!("slug `{slug}` is already taken")));
                }
                slug
            }
            None => {
                let reader = self.reader.clone();
                generate_unique_slug_async(&title, move |candidate| {
                    let reader = reader.clone();
                    let candidate = candidate.to_string();
                    async move {
                        reader
                            .find_group_by_slug(&candidate)
                            .await
                            .map(|existing| existing.is_none())
                    }
                })
                .await
                .map_err(|err| match err {
                    SlugAsyncError::Slug(err) => GroupError::Slug(err),
                    SlugAsyncError::Predicate(err) => GroupError::Repo(err),
                })?
            }
        };

        let group = self
            .writer
            .create_group(CreateGroupParams {
                title,
                slug,
                description: command.description.trim().to_string(),
            })
            .await?;

        info!(target = SOURCE, slug = %group.slug, "group created");
        Ok(group)
    }
}
