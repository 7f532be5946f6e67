#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use chorus::{
    application::{
        accounts::hash_password,
        chrome::ChromeService,
        repos::{
            CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams,
            CreateSessionParams, CreateUserParams, FollowCounts, FollowsRepo, GroupsRepo,
            GroupsWriteRepo, HealthRepo, PostScope, PostsRepo, PostsWriteRepo, RepoError,
            SessionsRepo, UpdatePostParams, UsersRepo,
        },
    },
    cache::PageCacheConfig,
    config::SessionSettings,
    domain::entities::{
        CommentRecord, GroupRecord, GroupRef, PostRecord, SessionRecord, UserRecord,
    },
    infra::{
        http::{AppState, build_admin_router, build_router},
        uploads::UploadStorage,
    },
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

pub const COOKIE_NAME: &str = "chorus_session";
pub const PASSWORD: &str = "correct horse battery";
const UPLOAD_LIMIT: usize = 1024 * 1024;

#[derive(Default)]
struct MemoryData {
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<StoredPost>,
    comments: Vec<StoredComment>,
    follows: Vec<(Uuid, Uuid)>,
    sessions: HashMap<String, SessionRecord>,
    last_stamp: Option<OffsetDateTime>,
}

#[derive(Clone)]
struct StoredPost {
    id: Uuid,
    author_id: Uuid,
    group_id: Option<Uuid>,
    text: String,
    image: Option<String>,
    pub_date: OffsetDateTime,
}

#[derive(Clone)]
struct StoredComment {
    id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    text: String,
    created: OffsetDateTime,
}

impl MemoryData {
    /// Strictly increasing timestamps so ordering is deterministic.
    fn stamp(&mut self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        let next = match self.last_stamp {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.last_stamp = Some(next);
        next
    }

    fn user(&self, id: Uuid) -> Option<&UserRecord> {
        self.users.iter().find(|user| user.id == id)
    }

    fn hydrate(&self, post: &StoredPost) -> Result<PostRecord, RepoError> {
        let author = self.user(post.author_id).ok_or(RepoError::NotFound)?;
        let group = post
            .group_id
            .and_then(|id| self.groups.iter().find(|group| group.id == id))
            .map(GroupRef::from);
        Ok(PostRecord {
            id: post.id,
            text: post.text.clone(),
            pub_date: post.pub_date,
            author: author.as_author(),
            group,
            image: post.image.clone(),
        })
    }

    fn in_scope(&self, post: &StoredPost, scope: PostScope) -> bool {
        match scope {
            PostScope::All => true,
            PostScope::Group(id) => post.group_id == Some(id),
            PostScope::Author(id) => post.author_id == id,
            PostScope::FollowedBy(user_id) => self
                .follows
                .iter()
                .any(|(follower, author)| *follower == user_id && *author == post.author_id),
        }
    }

    fn scoped(&self, scope: PostScope) -> Vec<&StoredPost> {
        let mut posts: Vec<&StoredPost> = self
            .posts
            .iter()
            .filter(|post| self.in_scope(post, scope))
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        posts
    }
}

/// In-memory stand-in for the Postgres repositories.
#[derive(Default)]
pub struct MemoryRepos {
    data: Mutex<MemoryData>,
    fail_post_writes: AtomicBool,
}

impl MemoryRepos {
    /// Makes every later `create_post`/`update_post` return a persistence error.
    pub fn fail_post_writes(&self) {
        self.fail_post_writes.store(true, Ordering::SeqCst);
    }

    fn check_post_write(&self) -> Result<(), RepoError> {
        if self.fail_post_writes.load(Ordering::SeqCst) {
            return Err(RepoError::Persistence("connection reset".to_string()));
        }
        Ok(())
    }

    pub async fn newest_post(&self) -> Option<Uuid> {
        let data = self.data.lock().await;
        data.scoped(PostScope::All).first().map(|post| post.id)
    }

    pub async fn post_image(&self, id: Uuid) -> Option<String> {
        let data = self.data.lock().await;
        data.posts
            .iter()
            .find(|post| post.id == id)
            .and_then(|post| post.image.clone())
    }

    pub async fn session_count(&self) -> usize {
        self.data.lock().await.sessions.len()
    }

    /// Stores a session row that expired an hour ago.
    pub async fn insert_expired_session(&self, user_id: Uuid, prefix: &str) {
        let mut data = self.data.lock().await;
        let created_at = data.stamp() - Duration::hours(2);
        data.sessions.insert(
            prefix.to_string(),
            SessionRecord {
                id: Uuid::new_v4(),
                prefix: prefix.to_string(),
                hashed_secret: vec![0; 32],
                user_id,
                created_at,
                expires_at: created_at + Duration::hours(1),
            },
        );
    }

    pub async fn post_text(&self, id: Uuid) -> Option<String> {
        let data = self.data.lock().await;
        data.posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| post.text.clone())
    }

    pub async fn follow_edges(&self) -> usize {
        self.data.lock().await.follows.len()
    }

    pub async fn comment_count(&self, post_id: Uuid) -> usize {
        let data = self.data.lock().await;
        data.comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .count()
    }
}

#[async_trait]
impl UsersRepo for MemoryRepos {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.data.lock().await.user(id).cloned())
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        let data = self.data.lock().await;
        Ok(data
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut data = self.data.lock().await;
        if data.users.iter().any(|user| user.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: params.username,
            first_name: params.first_name,
            last_name: params.last_name,
            email: params.email,
            password_hash: params.password_hash,
            created_at: data.stamp(),
        };
        data.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl GroupsRepo for MemoryRepos {
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let mut groups = self.data.lock().await.groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn find_group_by_id(&self, id: Uuid) -> Result<Option<GroupRecord>, RepoError> {
        let data = self.data.lock().await;
        Ok(data.groups.iter().find(|group| group.id == id).cloned())
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let data = self.data.lock().await;
        Ok(data.groups.iter().find(|group| group.slug == slug).cloned())
    }
}

#[async_trait]
impl GroupsWriteRepo for MemoryRepos {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut data = self.data.lock().await;
        if data.groups.iter().any(|group| group.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "groups_slug_key".to_string(),
            });
        }
        let group = GroupRecord {
            id: Uuid::new_v4(),
            title: params.title,
            slug: params.slug,
            description: params.description,
        };
        data.groups.push(group.clone());
        Ok(group)
    }
}

#[async_trait]
impl PostsRepo for MemoryRepos {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        Ok(self.data.lock().await.scoped(scope).len() as u64)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let data = self.data.lock().await;
        data.scoped(scope)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|post| data.hydrate(post))
            .collect()
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let data = self.data.lock().await;
        data.posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| data.hydrate(post))
            .transpose()
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepos {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        self.check_post_write()?;
        let mut data = self.data.lock().await;
        let post = StoredPost {
            id: Uuid::new_v4(),
            author_id: params.author_id,
            group_id: params.group_id,
            text: params.text,
            image: params.image,
            pub_date: data.stamp(),
        };
        data.posts.push(post.clone());
        data.hydrate(&post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        self.check_post_write()?;
        let mut data = self.data.lock().await;
        let stored = data
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        stored.text = params.text;
        stored.group_id = params.group_id;
        stored.image = params.image;
        let stored = stored.clone();
        data.hydrate(&stored)
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepos {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut data = self.data.lock().await;
        let author = data
            .user(params.author_id)
            .ok_or(RepoError::NotFound)?
            .as_author();
        let comment = StoredComment {
            id: Uuid::new_v4(),
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created: data.stamp(),
        };
        data.comments.push(comment.clone());
        Ok(CommentRecord {
            id: comment.id,
            post_id: comment.post_id,
            author,
            text: comment.text,
            created: comment.created,
        })
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let data = self.data.lock().await;
        let mut comments: Vec<&StoredComment> = data
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .collect();
        comments.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
        comments
            .into_iter()
            .map(|comment| {
                let author = data
                    .user(comment.author_id)
                    .ok_or(RepoError::NotFound)?
                    .as_author();
                Ok(CommentRecord {
                    id: comment.id,
                    post_id: comment.post_id,
                    author,
                    text: comment.text.clone(),
                    created: comment.created,
                })
            })
            .collect()
    }
}

#[async_trait]
impl FollowsRepo for MemoryRepos {
    async fn follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let mut data = self.data.lock().await;
        if data.follows.contains(&(user_id, author_id)) {
            return Ok(false);
        }
        data.follows.push((user_id, author_id));
        Ok(true)
    }

    async fn unfollow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let mut data = self.data.lock().await;
        let before = data.follows.len();
        data.follows.retain(|edge| *edge != (user_id, author_id));
        Ok(data.follows.len() != before)
    }

    async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        Ok(self.data.lock().await.follows.contains(&(user_id, author_id)))
    }

    async fn follow_counts(&self, user_id: Uuid) -> Result<FollowCounts, RepoError> {
        let data = self.data.lock().await;
        Ok(FollowCounts {
            followers: data.follows.iter().filter(|(_, a)| *a == user_id).count() as u64,
            following: data.follows.iter().filter(|(u, _)| *u == user_id).count() as u64,
        })
    }
}

#[async_trait]
impl SessionsRepo for MemoryRepos {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError> {
        let mut data = self.data.lock().await;
        let session = SessionRecord {
            id: Uuid::new_v4(),
            prefix: params.prefix,
            hashed_secret: params.hashed_secret,
            user_id: params.user_id,
            created_at: data.stamp(),
            expires_at: params.expires_at,
        };
        data.sessions.insert(session.prefix.clone(), session.clone());
        Ok(session)
    }

    async fn find_session(&self, prefix: &str) -> Result<Option<SessionRecord>, RepoError> {
        Ok(self.data.lock().await.sessions.get(prefix).cloned())
    }

    async fn delete_session(&self, prefix: &str) -> Result<(), RepoError> {
        self.data.lock().await.sessions.remove(prefix);
        Ok(())
    }

    async fn delete_expired_sessions(&self, now: OffsetDateTime) -> Result<u64, RepoError> {
        let mut data = self.data.lock().await;
        let before = data.sessions.len();
        data.sessions.retain(|_, session| session.expires_at > now);
        Ok((before - data.sessions.len()) as u64)
    }
}

#[async_trait]
impl HealthRepo for MemoryRepos {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub admin: Router,
    pub state: AppState,
    pub repos: Arc<MemoryRepos>,
    media: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_cache(PageCacheConfig::default())
    }

    pub fn with_cache(cache: PageCacheConfig) -> Self {
        let media = tempfile::tempdir().expect("media dir");
        let uploads = UploadStorage::new(media.path().to_path_buf(), UPLOAD_LIMIT as u64)
            .expect("upload storage");
        let repos = Arc::new(MemoryRepos::default());
        let sessions = SessionSettings {
            cookie_name: COOKIE_NAME.to_string(),
            ttl: Duration::hours(1),
            secure_cookie: false,
        };
        let state = AppState::new(
            repos.clone(),
            Arc::new(uploads),
            ChromeService::new("Chorus", "Test site"),
            cache,
            &sessions,
        );

        Self {
            router: build_router(state.clone(), UPLOAD_LIMIT),
            admin: build_admin_router(state.clone()),
            state,
            repos,
            media,
        }
    }

    /// Files currently stored under the upload namespace `namespace`.
    pub fn media_files(&self, namespace: &str) -> Vec<PathBuf> {
        list_files(&self.media.path().join(namespace))
    }

    /// User with a throwaway password hash; sign in through [`TestApp::login`].
    pub async fn seed_user(&self, username: &str) -> UserRecord {
        self.repos
            .create_user(CreateUserParams {
                username: username.to_string(),
                first_name: String::new(),
                last_name: String::new(),
                email: format!("{username}@example.com"),
                password_hash: "!".to_string(),
            })
            .await
            .expect("seed user")
    }

    /// User whose password is [`PASSWORD`].
    pub async fn seed_user_with_password(&self, username: &str) -> UserRecord {
        let password_hash = hash_password(PASSWORD.to_string())
            .await
            .expect("hash password");
        self.repos
            .create_user(CreateUserParams {
                username: username.to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                email: format!("{username}@example.com"),
                password_hash,
            })
            .await
            .expect("seed user")
    }

    pub async fn seed_group(&self, title: &str, slug: &str) -> GroupRecord {
        self.repos
            .create_group(CreateGroupParams {
                title: title.to_string(),
                slug: slug.to_string(),
                description: format!("About {title}"),
            })
            .await
            .expect("seed group")
    }

    pub async fn seed_post(
        &self,
        author: &UserRecord,
        text: &str,
        group: Option<&GroupRecord>,
    ) -> PostRecord {
        self.repos
            .create_post(CreatePostParams {
                author_id: author.id,
                text: text.to_string(),
                group_id: group.map(|group| group.id),
                image: None,
            })
            .await
            .expect("seed post")
    }

    /// Session cookie header value for `user`.
    pub async fn login(&self, user: &UserRecord) -> String {
        let session = self
            .state
            .accounts
            .open_session(user.id)
            .await
            .expect("open session");
        format!("{COOKIE_NAME}={}", session.token)
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::get(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).expect("request"))
            .await
    }

    pub async fn post_form(
        &self,
        uri: &str,
        cookie: Option<&str>,
        fields: &[(&str, &str)],
    ) -> Response<Body> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let mut builder = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).expect("request"))
            .await
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        cookie: Option<&str>,
        form: &MultipartBody,
    ) -> Response<Body> {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, form.content_type());
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(form.bytes())).expect("request"))
            .await
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    pub async fn admin_post(&self, uri: &str) -> Response<Body> {
        self.admin
            .clone()
            .oneshot(Request::post(uri).body(Body::empty()).expect("request"))
            .await
            .expect("admin response")
    }
}

fn list_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(list_files(&path));
        } else {
            files.push(path);
        }
    }
    files
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header")
}

pub fn post_cards(html: &str) -> usize {
    html.matches("class=\"post-card\"").count()
}

const BOUNDARY: &str = "chorus-test-boundary";

/// Minimal multipart/form-data encoder for form submissions in tests.
#[derive(Default)]
pub struct MultipartBody {
    parts: Vec<u8>,
}

impl MultipartBody {
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.parts.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content: &[u8]) -> Self {
        self.parts.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.parts.extend_from_slice(content);
        self.parts.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    pub fn bytes(&self) -> Vec<u8> {
        let mut body = self.parts.clone();
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }
}

/// 1x1 transparent GIF.
pub const TINY_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0xff, 0xff,
    0xff, 0x00, 0x00, 0x00, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];
