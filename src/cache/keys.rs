use axum::http::Request;
use uuid::Uuid;

use crate::domain::entities::UserRecord;

/// Identifies one cached page.
///
/// Pages differ per viewer (navigation, follow buttons), so the signed-in
/// user is part of the key. Anonymous visitors share entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageCacheKey {
    pub path_and_query: String,
    pub viewer: Option<Uuid>,
}

impl PageCacheKey {
    pub fn new(path_and_query: impl Into<String>, viewer: Option<Uuid>) -> Self {
        Self {
            path_and_query: path_and_query.into(),
            viewer,
        }
    }

    /// Key for `request`, reading the viewer the session middleware attached.
    pub fn for_request<B>(request: &Request<B>) -> Self {
        let path_and_query = request
            .uri()
            .path_and_query()
            .map(|value| value.as_str().to_string())
            .unwrap_or_else(|| request.uri().path().to_string());
        let viewer = request.extensions().get::<UserRecord>().map(|user| user.id);
        Self::new(path_and_query, viewer)
    }
}
