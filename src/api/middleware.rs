//! API middleware
//!
//! Contains:
//! - `AppState`, the services shared by all handlers
//! - Authentication from the `Authorization: Token <jwt>` header
//! - Extractors for the authenticated (or anonymous) user

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::cache::create_cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxArticleRepository, SqlxCommentRepository, SqlxFavoriteRepository, SqlxFollowRepository,
    SqlxTagRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    parse_authorization, ArticleService, CommentService, ProfileService, TagService, TokenService,
    UserService,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub tokens: Arc<TokenService>,
    pub user_service: Arc<UserService>,
    pub profile_service: Arc<ProfileService>,
    pub article_service: Arc<ArticleService>,
    pub comment_service: Arc<CommentService>,
    pub tag_service: Arc<TagService>,
}

impl AppState {
    /// Wire repositories and services over a migrated pool
    pub fn new(pool: DynDatabasePool, config: &Config) -> Self {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let article_repo = SqlxArticleRepository::boxed(pool.clone());
        let tag_repo = SqlxTagRepository::boxed(pool.clone());
        let cache = create_cache(&config.cache);

        let profile_service = Arc::new(ProfileService::new(
            user_repo.clone(),
            SqlxFollowRepository::boxed(pool.clone()),
        ));
        let tag_service = Arc::new(TagService::new(tag_repo.clone(), cache));
        let article_service = Arc::new(ArticleService::new(
            article_repo.clone(),
            tag_repo,
            SqlxFavoriteRepository::boxed(pool.clone()),
            user_repo.clone(),
            profile_service.clone(),
            tag_service.clone(),
        ));
        let comment_service = Arc::new(CommentService::new(
            SqlxCommentRepository::boxed(pool.clone()),
            article_repo,
            user_repo.clone(),
            profile_service.clone(),
        ));

        Self {
            pool,
            tokens: Arc::new(TokenService::from_config(&config.auth)),
            user_service: Arc::new(UserService::new(user_repo)),
            profile_service,
            article_service,
            comment_service,
            tag_service,
        }
    }

    /// Issue a token for `user`
    pub fn issue_token(&self, user: &User) -> Result<String, ApiError> {
        Ok(self.tokens.issue(user)?)
    }

    /// Resolve a raw token to its user
    async fn user_for_token(&self, token: &str) -> Result<User, ApiError> {
        let claims = self.tokens.verify(token)?;
        self.user_service
            .get_by_id(claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthorized("is invalid"))
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// The user behind the request, if a valid token was sent
#[derive(Debug, Clone, Default)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.id)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("is missing"))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts.extensions.get::<AuthenticatedUser>().map(|u| u.0.clone()),
        ))
    }
}

/// Read the token from the `Authorization` header.
///
/// `Ok(None)` when there is no header; `Err` when the header is present but
/// not of the form `Token <jwt>` / `Bearer <jwt>`.
fn extract_token(request: &Request) -> Result<Option<String>, ApiError> {
    let Some(value) = request.headers().get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::unauthorized("is invalid"))?;
    parse_authorization(value)
        .map(|token| Some(token.to_string()))
        .ok_or_else(|| ApiError::unauthorized("is invalid"))
}

/// Authentication middleware: rejects the request with 401 unless a valid
/// token for an existing user is sent.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(&request)?.ok_or_else(|| ApiError::unauthorized("is missing"))?;

    let user = state.user_for_token(&token).await.map_err(|e| {
        tracing::debug!(reason = %e.message, "Rejected token");
        e
    })?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Optional authentication middleware: attaches the user when a valid token
/// is sent, and otherwise continues anonymously.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Ok(Some(token)) = extract_token(&request) {
        match state.user_for_token(&token).await {
            Ok(user) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Err(e) => tracing::debug!(reason = %e.message, "Ignoring token on optional route"),
        }
    }
    next.run(request).await
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_auth(value: &str) -> Request {
        Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_extract_token_scheme_token() {
        let request = request_with_auth("Token abc.def.ghi");
        assert_eq!(extract_token(&request).unwrap(), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_extract_token_scheme_bearer() {
        let request = request_with_auth("Bearer abc.def.ghi");
        assert_eq!(extract_token(&request).unwrap(), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_extract_token_none() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        assert!(extract_token(&request).unwrap().is_none());
    }

    #[test]
    fn test_extract_token_wrong_scheme() {
        let request = request_with_auth("Basic dXNlcjpwYXNz");
        let error = extract_token(&request).unwrap_err();
        assert_eq!(error.field, "token");
        assert_eq!(error.message, "is invalid");
    }

    #[test]
    fn test_maybe_user_id() {
        assert_eq!(MaybeUser::default().id(), None);

        let mut user = User::new("jake".into(), "jake@jake.jake".into(), "hash".into());
        user.id = 3;
        assert_eq!(MaybeUser(Some(user)).id(), Some(3));
    }
}
