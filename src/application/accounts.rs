//! Accounts and cookie sessions.
//!
//! Session tokens have the shape `cs_{prefix}_{secret}`. Only the SHA-256 of
//! the secret is stored; the prefix is the lookup key.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::repos::{
    CreateSessionParams, CreateUserParams, RepoError, SessionsRepo, UsersRepo,
};
use crate::domain::entities::UserRecord;
use crate::domain::error::FieldErrors;
use crate::domain::users::{validate_email, validate_name, validate_new_password, validate_username};

const SOURCE: &str = "application::accounts::AccountService";
const TOKEN_PREFIX: &str = "cs";
const MIN_SECRET_LEN: usize = 32;
const DUPLICATE_USERNAME: &str = "A user with that username already exists.";
pub const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("invalid account details: {0}")]
    Invalid(FieldErrors),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

/// Raw token for the cookie plus its expiry.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    sessions: Arc<dyn SessionsRepo>,
    session_ttl: Duration,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        sessions: Arc<dyn SessionsRepo>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            session_ttl,
        }
    }

    pub async fn signup(&self, form: SignupForm) -> Result<UserRecord, AccountError> {
        let mut errors = FieldErrors::new();
        let first_name = errors.collect(validate_name("first_name", &form.first_name));
        let last_name = errors.collect(validate_name("last_name", &form.last_name));
        let username = errors.collect(validate_username(&form.username));
        let email = errors.collect(validate_email(&form.email));
        errors.collect(validate_new_password(&form.password1, &form.password2));

        if let Some(username) = username.as_deref()
            && self.users.find_user_by_username(username).await?.is_some()
        {
            errors.push("username", DUPLICATE_USERNAME);
        }

        errors.into_result().map_err(AccountError::Invalid)?;
        let (Some(first_name), Some(last_name), Some(username), Some(email)) =
            (first_name, last_name, username, email)
        else {
            return Err(AccountError::Invalid(FieldErrors::new()));
        };

        let password_hash = hash_password(form.password1).await?;
        let created = self
            .users
            .create_user(CreateUserParams {
                username,
                first_name,
                last_name,
                email,
                password_hash,
            })
            .await;

        match created {
            Ok(user) => {
                info!(target = SOURCE, user = %user.username, "account created");
                Ok(user)
            }
            Err(RepoError::Duplicate { .. }) => {
                let mut errors = FieldErrors::new();
                errors.push("username", DUPLICATE_USERNAME);
                Err(AccountError::Invalid(errors))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserRecord, AccountError> {
        let user = self
            .users
            .find_user_by_username(username.trim())
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if verify_password(password.to_string(), user.password_hash.clone()).await? {
            Ok(user)
        } else {
            Err(AccountError::InvalidCredentials)
        }
    }

    pub async fn open_session(&self, user_id: Uuid) -> Result<IssuedSession, AccountError> {
        let prefix = generate_prefix();
        let secret = generate_secret();
        let token = format!("{TOKEN_PREFIX}_{prefix}_{secret}");
        let now = OffsetDateTime::now_utc();
        let expires_at = now + self.session_ttl;

        let swept = self.sessions.delete_expired_sessions(now).await?;
        if swept > 0 {
            debug!(target = SOURCE, swept, "removed expired sessions");
        }

        self.sessions
            .create_session(CreateSessionParams {
                prefix,
                hashed_secret: hash_secret(&secret),
                user_id,
                expires_at,
            })
            .await?;

        Ok(IssuedSession { token, expires_at })
    }

    /// User behind a session token. Malformed, unknown or expired tokens resolve to `None`.
    pub async fn resolve_session(&self, token: &str) -> Result<Option<UserRecord>, AccountError> {
        let Some(parsed) = parse_token(token) else {
            return Ok(None);
        };
        let Some(session) = self.sessions.find_session(&parsed.prefix).await? else {
            return Ok(None);
        };

        if session.expires_at <= OffsetDateTime::now_utc() {
            debug!(target = SOURCE, prefix = %session.prefix, "session expired");
            self.sessions.delete_session(&session.prefix).await?;
            return Ok(None);
        }

        let hashed_input = hash_secret(&parsed.secret);
        if session.hashed_secret.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Ok(None);
        }

        Ok(self.users.find_user_by_id(session.user_id).await?)
    }

    pub async fn close_session(&self, token: &str) -> Result<(), AccountError> {
        if let Some(parsed) = parse_token(token) {
            self.sessions.delete_session(&parsed.prefix).await?;
        }
        Ok(())
    }
}

/// Argon2 hashing runs on the blocking pool.
pub async fn hash_password(password: String) -> Result<String, AccountError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| AccountError::Hashing(err.to_string()))
    })
    .await
    .map_err(|err| AccountError::Hashing(err.to_string()))?
}

async fn verify_password(password: String, hash: String) -> Result<bool, AccountError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash).map_err(|err| AccountError::Hashing(err.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|err| AccountError::Hashing(err.to_string()))?
}

fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

fn generate_prefix() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

fn generate_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

struct ParsedToken {
    prefix: String,
    secret: String,
}

fn parse_token(token: &str) -> Option<ParsedToken> {
    let mut parts = token.splitn(3, '_');
    if parts.next()? != TOKEN_PREFIX {
        return None;
    }
    let prefix = parts.next()?;
    let secret = parts.next()?;
    if prefix.is_empty() || secret.len() < MIN_SECRET_LEN {
        return None;
    }
    Some(ParsedToken {
        prefix: prefix.to_string(),
        secret: secret.to_string(),
    })
}
