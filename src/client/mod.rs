//! Typed client for the conduit API
//!
//! `ConduitClient` wraps every REST endpoint, keeps the token in an
//! `AuthSession`, and owns a `QueryCache` for cached reads and optimistic
//! mutations.

pub mod auth;
pub mod cache;

use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::api::requests::{
    ArticleUpdate, ListArticlesQuery, LoginUser, NewArticle, NewComment, NewUser, UserUpdate,
};
use crate::api::responses::{
    ArticleBody, ArticleEnvelope, ArticleList, CommentBody, CommentEnvelope, CommentList,
    ProfileEnvelope, TagList, UserBody, UserEnvelope,
};
use crate::api::ErrorBody;
use crate::models::Profile;

pub use auth::{resolve, AuthSession, FileTokenStore, Guard, MemoryTokenStore, Navigation, Route, TokenStore};
pub use cache::{key, keys, Optimistic, QueryCache, QueryKey};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {status}: {}", flatten(.errors).join(", "))]
    Api {
        status: StatusCode,
        errors: BTreeMap<String, Vec<String>>,
    },

    #[error("token storage failed: {0}")]
    Session(#[from] anyhow::Error),
}

fn flatten(errors: &BTreeMap<String, Vec<String>>) -> Vec<String> {
    errors
        .iter()
        .flat_map(|(field, messages)| messages.iter().map(move |m| format!("{} {}", field, m)))
        .collect()
}

impl ClientError {
    /// User-readable messages, e.g. `email has already been taken`
    pub fn messages(&self) -> Vec<String> {
        match self {
            ClientError::Api { errors, .. } => flatten(errors),
            other => vec![other.to_string()],
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }
}

pub struct ConduitClient {
    http: reqwest::Client,
    base_url: Url,
    session: AuthSession,
    cache: QueryCache,
}

impl ConduitClient {
    /// `base_url` is the API root, e.g. `http://localhost:8080/api`
    pub fn new(base_url: &str, session: AuthSession) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            session,
            cache: QueryCache::new(),
        })
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ClientError> {
        let mut builder = self.http.request(method, self.endpoint(segments)?);
        if let Some(token) = self.session.token() {
            builder = builder.header(reqwest::header::AUTHORIZATION, format!("Token {}", token));
        }
        Ok(builder)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let errors = match response.json::<ErrorBody>().await {
            Ok(body) => body.errors,
            Err(_) => ErrorBody::single("server", status.canonical_reason().unwrap_or("error")).errors,
        };
        tracing::debug!(%status, ?errors, "API request failed");
        Err(ClientError::Api { status, errors })
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        Ok(self.send(builder).await?.json().await?)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        self.json(self.request(Method::GET, segments)?).await
    }

    async fn with_body<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ClientError> {
        self.json(self.request(method, segments)?.json(body)).await
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// Register and log the session in
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<UserBody, ClientError> {
        let body = UserEnvelope {
            user: NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            },
        };
        let user: UserEnvelope<UserBody> = self.with_body(Method::POST, &["users"], &body).await?;
        self.session.login(&user.user.token)?;
        self.cache.clear();
        self.cache.set(keys::current_user(), &user.user);
        Ok(user.user)
    }

    /// Log in and store the token
    pub async fn login(&self, email: &str, password: &str) -> Result<UserBody, ClientError> {
        let body = UserEnvelope {
            user: LoginUser {
                email: email.to_string(),
                password: password.to_string(),
            },
        };
        let user: UserEnvelope<UserBody> = self.with_body(Method::POST, &["users", "login"], &body).await?;
        self.session.login(&user.user.token)?;
        self.cache.clear();
        self.cache.set(keys::current_user(), &user.user);
        Ok(user.user)
    }

    /// Forget the token and everything cached for this user
    pub fn logout(&self) -> Result<(), ClientError> {
        self.session.logout()?;
        self.cache.clear();
        Ok(())
    }

    pub async fn current_user(&self) -> Result<UserBody, ClientError> {
        let user: UserEnvelope<UserBody> = self.get(&["user"]).await?;
        Ok(user.user)
    }

    pub async fn update_user(&self, update: &UserUpdate) -> Result<UserBody, ClientError> {
        let body = UserEnvelope { user: update };
        let user: UserEnvelope<UserBody> = self.with_body(Method::PUT, &["user"], &body).await?;
        // The token is reissued on every user response
        self.session.login(&user.user.token)?;
        Ok(user.user)
    }

    // ========================================================================
    // Profiles
    // ========================================================================

    pub async fn profile(&self, username: &str) -> Result<Profile, ClientError> {
        let profile: ProfileEnvelope = self.get(&["profiles", username]).await?;
        Ok(profile.profile)
    }

    pub async fn follow(&self, username: &str) -> Result<Profile, ClientError> {
        let profile: ProfileEnvelope = self
            .json(self.request(Method::POST, &["profiles", username, "follow"])?)
            .await?;
        Ok(profile.profile)
    }

    pub async fn unfollow(&self, username: &str) -> Result<Profile, ClientError> {
        let profile: ProfileEnvelope = self
            .json(self.request(Method::DELETE, &["profiles", username, "follow"])?)
            .await?;
        Ok(profile.profile)
    }

    // ========================================================================
    // Articles
    // ========================================================================

    pub async fn list_articles(&self, query: &ListArticlesQuery) -> Result<ArticleList, ClientError> {
        self.json(self.request(Method::GET, &["articles"])?.query(query)).await
    }

    pub async fn feed(&self, limit: Option<i64>, offset: Option<i64>) -> Result<ArticleList, ClientError> {
        let query = ListArticlesQuery {
            limit,
            offset,
            ..Default::default()
        };
        self.json(self.request(Method::GET, &["articles", "feed"])?.query(&query))
            .await
    }

    pub async fn article(&self, slug: &str) -> Result<ArticleBody, ClientError> {
        let article: ArticleEnvelope<ArticleBody> = self.get(&["articles", slug]).await?;
        Ok(article.article)
    }

    pub async fn create_article(&self, article: &NewArticle) -> Result<ArticleBody, ClientError> {
        let body = ArticleEnvelope { article };
        let created: ArticleEnvelope<ArticleBody> = self.with_body(Method::POST, &["articles"], &body).await?;
        self.cache.invalidate_prefix(&keys::articles());
        self.cache.invalidate_prefix(&keys::tags());
        Ok(created.article)
    }

    pub async fn update_article(&self, slug: &str, update: &ArticleUpdate) -> Result<ArticleBody, ClientError> {
        let body = ArticleEnvelope { article: update };
        let updated: ArticleEnvelope<ArticleBody> =
            self.with_body(Method::PUT, &["articles", slug], &body).await?;
        self.cache.remove(&keys::article(slug));
        self.cache.set(keys::article(&updated.article.slug), &updated.article);
        self.cache.invalidate_prefix(&keys::articles());
        Ok(updated.article)
    }

    pub async fn delete_article(&self, slug: &str) -> Result<(), ClientError> {
        self.send(self.request(Method::DELETE, &["articles", slug])?).await?;
        self.cache.remove(&keys::article(slug));
        self.cache.invalidate_prefix(&keys::articles());
        self.cache.invalidate_prefix(&keys::feed());
        Ok(())
    }

    pub async fn favorite(&self, slug: &str) -> Result<ArticleBody, ClientError> {
        let article: ArticleEnvelope<ArticleBody> = self
            .json(self.request(Method::POST, &["articles", slug, "favorite"])?)
            .await?;
        Ok(article.article)
    }

    pub async fn unfavorite(&self, slug: &str) -> Result<ArticleBody, ClientError> {
        let article: ArticleEnvelope<ArticleBody> = self
            .json(self.request(Method::DELETE, &["articles", slug, "favorite"])?)
            .await?;
        Ok(article.article)
    }

    // ========================================================================
    // Comments and tags
    // ========================================================================

    pub async fn comments(&self, slug: &str) -> Result<Vec<CommentBody>, ClientError> {
        let list: CommentList = self.get(&["articles", slug, "comments"]).await?;
        Ok(list.comments)
    }

    pub async fn add_comment(&self, slug: &str, body: &str) -> Result<CommentBody, ClientError> {
        let request = CommentEnvelope {
            comment: NewComment { body: body.to_string() },
        };
        let comment: CommentEnvelope<CommentBody> = self
            .with_body(Method::POST, &["articles", slug, "comments"], &request)
            .await?;
        self.cache.remove(&keys::comments(slug));
        Ok(comment.comment)
    }

    pub async fn delete_comment(&self, slug: &str, id: i64) -> Result<(), ClientError> {
        let id = id.to_string();
        self.send(self.request(Method::DELETE, &["articles", slug, "comments", &id])?)
            .await?;
        self.cache.remove(&keys::comments(slug));
        Ok(())
    }

    pub async fn tags(&self) -> Result<Vec<String>, ClientError> {
        let list: TagList = self.get(&["tags"]).await?;
        Ok(list.tags)
    }

    // ========================================================================
    // Cached queries
    // ========================================================================

    pub async fn query_current_user(&self) -> Result<UserBody, ClientError> {
        self.cache.fetch(keys::current_user(), || self.current_user()).await
    }

    pub async fn query_profile(&self, username: &str) -> Result<Profile, ClientError> {
        self.cache.fetch(keys::profile(username), || self.profile(username)).await
    }

    pub async fn query_article(&self, slug: &str) -> Result<ArticleBody, ClientError> {
        self.cache.fetch(keys::article(slug), || self.article(slug)).await
    }

    pub async fn query_articles(&self, query: &ListArticlesQuery) -> Result<ArticleList, ClientError> {
        let key = key(["articles".to_string(), list_key(query)]);
        self.cache.fetch(key, || self.list_articles(query)).await
    }

    pub async fn query_feed(&self, limit: Option<i64>, offset: Option<i64>) -> Result<ArticleList, ClientError> {
        let page = ListArticlesQuery {
            limit,
            offset,
            ..Default::default()
        };
        let key = key(["feed".to_string(), list_key(&page)]);
        self.cache.fetch(key, || self.feed(limit, offset)).await
    }

    pub async fn query_comments(&self, slug: &str) -> Result<Vec<CommentBody>, ClientError> {
        self.cache.fetch(keys::comments(slug), || self.comments(slug)).await
    }

    pub async fn query_tags(&self) -> Result<Vec<String>, ClientError> {
        self.cache.fetch(keys::tags(), || self.tags()).await
    }

    // ========================================================================
    // Optimistic mutations
    // ========================================================================

    /// Favorite, showing the result before the server confirms it
    pub async fn favorite_optimistic(&self, slug: &str) -> Result<ArticleBody, ClientError> {
        self.toggle_favorite(slug, true).await
    }

    pub async fn unfavorite_optimistic(&self, slug: &str) -> Result<ArticleBody, ClientError> {
        self.toggle_favorite(slug, false).await
    }

    async fn toggle_favorite(&self, slug: &str, favorited: bool) -> Result<ArticleBody, ClientError> {
        let request = async {
            if favorited {
                self.favorite(slug).await
            } else {
                self.unfavorite(slug).await
            }
        };

        self.cache
            .mutate(Optimistic {
                keys: vec![keys::article(slug)],
                predict: |_: &QueryKey, value: Value| {
                    update_as::<ArticleBody>(value, |article| predict_favorite(article, favorited))
                },
                request,
                reconcile: |article: &ArticleBody| reconciled(keys::article(&article.slug), article),
                invalidate: vec![keys::articles(), keys::feed()],
            })
            .await
    }

    pub async fn follow_optimistic(&self, username: &str) -> Result<Profile, ClientError> {
        self.toggle_follow(username, true).await
    }

    pub async fn unfollow_optimistic(&self, username: &str) -> Result<Profile, ClientError> {
        self.toggle_follow(username, false).await
    }

    async fn toggle_follow(&self, username: &str, following: bool) -> Result<Profile, ClientError> {
        let request = async {
            if following {
                self.follow(username).await
            } else {
                self.unfollow(username).await
            }
        };

        self.cache
            .mutate(Optimistic {
                keys: vec![keys::profile(username)],
                predict: |_: &QueryKey, value: Value| {
                    update_as::<Profile>(value, |profile| profile.following = following)
                },
                request,
                reconcile: |profile: &Profile| reconciled(keys::profile(&profile.username), profile),
                invalidate: vec![keys::feed()],
            })
            .await
    }

    /// Update the current user, merging the patch into the cached user first
    pub async fn update_user_optimistic(&self, update: &UserUpdate) -> Result<UserBody, ClientError> {
        self.cache
            .mutate(Optimistic {
                keys: vec![keys::current_user()],
                predict: |_: &QueryKey, value: Value| {
                    update_as::<UserBody>(value, |user| merge_user_patch(user, update))
                },
                request: self.update_user(update),
                reconcile: |user: &UserBody| reconciled(keys::current_user(), user),
                invalidate: vec![],
            })
            .await
    }
}

/// Stable cache key segment for a list query
fn list_key(query: &ListArticlesQuery) -> String {
    serde_json::to_string(query).unwrap_or_default()
}

/// Apply `f` to `value` decoded as `T`; values of another shape pass through
fn update_as<T: Serialize + DeserializeOwned>(value: Value, f: impl FnOnce(&mut T)) -> Value {
    match serde_json::from_value::<T>(value.clone()) {
        Ok(mut typed) => {
            f(&mut typed);
            serde_json::to_value(&typed).unwrap_or(value)
        }
        Err(_) => value,
    }
}

fn reconciled<T: Serialize>(key: QueryKey, value: &T) -> Vec<(QueryKey, Value)> {
    serde_json::to_value(value)
        .map(|value| vec![(key, value)])
        .unwrap_or_default()
}

fn predict_favorite(article: &mut ArticleBody, favorited: bool) {
    if article.favorited != favorited {
        article.favorited = favorited;
        article.favorites_count += if favorited { 1 } else { -1 };
    }
}

fn merge_user_patch(user: &mut UserBody, patch: &UserUpdate) {
    if let Some(email) = &patch.email {
        user.email = email.clone();
    }
    if let Some(username) = &patch.username {
        user.username = username.clone();
    }
    if let Some(bio) = &patch.bio {
        user.bio = (!bio.is_empty()).then(|| bio.clone());
    }
    if let Some(image) = &patch.image {
        user.image = (!image.is_empty()).then(|| image.clone());
    }
}
