//! Creating and editing posts.
//!
//! Only the author may edit a post; anyone else is sent back to the post
//! detail page without the post being touched. The publication date and the
//! author are fixed at creation.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::repos::{
    CreatePostParams, GroupsRepo, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{GroupRecord, PostRecord, UserRecord};
use crate::domain::error::{DomainError, FieldErrors};
use crate::domain::posts::validate_text;
use crate::infra::uploads::{UploadStorage, UploadStorageError};
use crate::presentation::views::{
    FormErrorsView, GroupOptionView, PostFormContext, media_href, post_href,
};

const SOURCE: &str = "application::posts::PostService";
const IMAGE_NAMESPACE: &str = "posts";
const INVALID_GROUP: &str = "Select a valid choice. That choice is not one of the available choices.";
const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
const CLEAR_AND_UPLOAD: &str = "Please either submit a file or check the clear checkbox, not both.";

pub const NEW_POST_ACTION: &str = "/create/";

#[derive(Debug, Error)]
pub enum PostFormError {
    #[error("unknown post")]
    UnknownPost,
    #[error("invalid post: {0}")]
    Invalid(FieldErrors),
    #[error(transparent)]
    Storage(#[from] UploadStorageError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub bytes: Bytes,
}

/// Submitted post form. `group` is the raw select value; empty means no group.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<ImageUpload>,
    pub clear_image: bool,
}

#[derive(Debug)]
pub enum EditOutcome {
    Saved(PostRecord),
    NotAuthor(Uuid),
}

pub enum EditAccess {
    Allowed(PostFormContext),
    NotAuthor(Uuid),
}

struct CleanPost {
    text: String,
    group_id: Option<Uuid>,
    image: Option<ImageUpload>,
    clear_image: bool,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    posts_write: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    uploads: Arc<UploadStorage>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        posts_write: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
        uploads: Arc<UploadStorage>,
    ) -> Self {
        Self {
            posts,
            posts_write,
            groups,
            uploads,
        }
    }

    /// Empty form for a new post.
    pub async fn new_form(&self) -> Result<PostFormContext, PostFormError> {
        self.form_context(None, &PostForm::default(), None, FieldErrors::new())
            .await
    }

    /// Form state to re-render after a rejected submission.
    pub async fn form_context(
        &self,
        editing: Option<&PostRecord>,
        form: &PostForm,
        current_image: Option<&str>,
        errors: FieldErrors,
    ) -> Result<PostFormContext, PostFormError> {
        let groups = self.groups.list_groups().await?;
        let selected = form.group.as_deref().map(str::trim).unwrap_or_default();

        Ok(PostFormContext {
            is_edit: editing.is_some(),
            action: match editing {
                Some(post) => format!("{}edit/", post_href(post.id)),
                None => NEW_POST_ACTION.to_string(),
            },
            text: form.text.clone(),
            groups: group_options(&groups, selected),
            current_image: current_image.map(media_href),
            errors: FormErrorsView::from(errors),
        })
    }

    pub async fn create(
        &self,
        author: &UserRecord,
        form: PostForm,
    ) -> Result<PostRecord, PostFormError> {
        let clean = self.clean(&form).await?;
        let image = match clean.image {
            Some(upload) => Some(self.store_image(upload).await?),
            None => None,
        };

        let created = self
            .posts_write
            .create_post(CreatePostParams {
                author_id: author.id,
                text: clean.text,
                group_id: clean.group_id,
                image: image.clone(),
            })
            .await;
        let post = match created {
            Ok(post) => post,
            Err(err) => {
                self.discard_image(image.as_deref()).await;
                return Err(err.into());
            }
        };

        info!(target = SOURCE, post_id = %post.id, author = %author.username, "post created");
        Ok(post)
    }

    /// Pre-filled edit form, or the post id when `viewer` is not its author.
    pub async fn load_for_edit(
        &self,
        post_id: Uuid,
        viewer: &UserRecord,
    ) -> Result<EditAccess, PostFormError> {
        let post = self.find(post_id).await?;
        if !post.is_authored_by(viewer.id) {
            return Ok(EditAccess::NotAuthor(post.id));
        }

        let form = PostForm {
            text: post.text.clone(),
            group: post.group.as_ref().map(|group| group.id.to_string()),
            image: None,
            clear_image: false,
        };
        let context = self
            .form_context(Some(&post), &form, post.image.as_deref(), FieldErrors::new())
            .await?;
        Ok(EditAccess::Allowed(context))
    }

    pub async fn edit(
        &self,
        post_id: Uuid,
        viewer: &UserRecord,
        form: PostForm,
    ) -> Result<EditOutcome, PostFormError> {
        let post = self.find(post_id).await?;
        if !post.is_authored_by(viewer.id) {
            warn!(
                target = SOURCE,
                post_id = %post.id,
                user = %viewer.username,
                "rejected edit from non-author"
            );
            return Ok(EditOutcome::NotAuthor(post.id));
        }

        let clean = self.clean(&form).await?;
        let (image, uploaded) = match (clean.image, clean.clear_image) {
            (Some(upload), _) => {
                let stored = self.store_image(upload).await?;
                (Some(stored.clone()), Some(stored))
            }
            (None, true) => (None, None),
            (None, false) => (post.image.clone(), None),
        };

        let result = self
            .posts_write
            .update_post(UpdatePostParams {
                id: post.id,
                text: clean.text,
                group_id: clean.group_id,
                image: image.clone(),
            })
            .await;
        let updated = match result {
            Ok(updated) => updated,
            Err(err) => {
                self.discard_image(uploaded.as_deref()).await;
                return Err(err.into());
            }
        };

        if image.as_deref() != post.image.as_deref() {
            self.discard_image(post.image.as_deref()).await;
        }

        info!(target = SOURCE, post_id = %updated.id, "post updated");
        Ok(EditOutcome::Saved(updated))
    }

    pub async fn find(&self, post_id: Uuid) -> Result<PostRecord, PostFormError> {
        self.posts
            .find_post(post_id)
            .await?
            .ok_or(PostFormError::UnknownPost)
    }

    async fn clean(&self, form: &PostForm) -> Result<CleanPost, PostFormError> {
        let mut errors = FieldErrors::new();

        let text = errors.collect(validate_text("text", &form.text));
        let group_id = errors
            .collect(self.resolve_group(form.group.as_deref()).await?)
            .flatten();

        if let Some(upload) = form.image.as_ref() {
            if form.clear_image {
                errors.push("image", CLEAR_AND_UPLOAD);
            } else if let Err(err) = validate_image(upload) {
                errors.collect::<()>(Err(err));
            }
        }

        errors.into_result().map_err(PostFormError::Invalid)?;
        Ok(CleanPost {
            text: text.unwrap_or_default(),
            group_id,
            image: form.image.clone(),
            clear_image: form.clear_image,
        })
    }

    /// Outer error is a repository failure, inner one a bad choice.
    async fn resolve_group(
        &self,
        raw: Option<&str>,
    ) -> Result<Result<Option<Uuid>, DomainError>, RepoError> {
        let raw = raw.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Ok(Ok(None));
        }
        let Ok(id) = Uuid::parse_str(raw) else {
            return Ok(Err(DomainError::validation("group", INVALID_GROUP)));
        };
        Ok(match self.groups.find_group_by_id(id).await? {
            Some(group) => Ok(Some(group.id)),
            None => Err(DomainError::validation("group", INVALID_GROUP)),
        })
    }

    async fn store_image(&self, upload: ImageUpload) -> Result<String, PostFormError> {
        Ok(self
            .uploads
            .store(IMAGE_NAMESPACE, &upload.filename, upload.bytes)
            .await?)
    }

    /// Best-effort removal of a stored image that no post references.
    async fn discard_image(&self, path: Option<&str>) {
        if let Some(path) = path
            && let Err(err) = self.uploads.delete(path).await
        {
            warn!(target = SOURCE, path, error = %err, "failed to remove unused image");
        }
    }
}

fn validate_image(upload: &ImageUpload) -> Result<(), DomainError> {
    match imagesize::blob_size(&upload.bytes) {
        Ok(size) if size.width > 0 && size.height > 0 => Ok(()),
        _ => Err(DomainError::validation("image", INVALID_IMAGE)),
    }
}

fn group_options(groups: &[GroupRecord], selected: &str) -> Vec<GroupOptionView> {
    groups
        .iter()
        .map(|group| {
            let id = group.id.to_string();
            GroupOptionView {
                selected: id == selected,
                title: group.title.clone(),
                id,
            }
        })
        .collect()
}
