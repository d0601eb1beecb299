//! Article service
//!
//! Implements business logic for articles:
//! - Create, update and delete with author-only checks
//! - Slug generation from the title
//! - Global list with tag/author/favorited filters and the follow feed
//! - Favorites
//!
//! Every read returns `ArticleDetails`, decorated for the viewer.

use crate::db::repositories::{
    ArticleRepository, FavoriteRepository, TagRepository, UniqueViolation, UserRepository,
};
use crate::models::{
    normalize_tag_list, Article, ArticleDetails, ArticleFilter, ArticleQuery, CreateArticleInput,
    ListParams, PagedResult, UpdateArticleInput, User,
};
use crate::services::profile::{ProfileService, ProfileServiceError};
use crate::services::tag::TagService;
use crate::services::validation::{self, Invalid};
use anyhow::Context;
use futures::future::try_join_all;
use std::sync::Arc;

/// Slug used when a title has no sluggable characters
const FALLBACK_SLUG: &str = "article";

/// Length of the random suffix appended to taken slugs
const SLUG_SUFFIX_LEN: usize = 6;

/// Inserts retried when another writer takes the chosen slug first
const SLUG_RETRIES: usize = 3;

/// Error types for article service operations
#[derive(Debug, thiserror::Error)]
pub enum ArticleServiceError {
    /// Article not found
    #[error("Article not found: {0}")]
    NotFound(String),

    /// The user is not the article's author
    #[error("Only the author can modify this article")]
    Forbidden,

    /// Validation error
    #[error("{field} {message}")]
    ValidationError {
        field: &'static str,
        message: &'static str,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<Invalid> for ArticleServiceError {
    fn from(e: Invalid) -> Self {
        ArticleServiceError::ValidationError {
            field: e.field,
            message: e.message,
        }
    }
}

impl From<ProfileServiceError> for ArticleServiceError {
    fn from(e: ProfileServiceError) -> Self {
        match e {
            ProfileServiceError::InternalError(e) => ArticleServiceError::InternalError(e),
            other => ArticleServiceError::InternalError(anyhow::anyhow!(other)),
        }
    }
}

pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
    tag_repo: Arc<dyn TagRepository>,
    favorite_repo: Arc<dyn FavoriteRepository>,
    user_repo: Arc<dyn UserRepository>,
    profiles: Arc<ProfileService>,
    tags: Arc<TagService>,
}

impl ArticleService {
    pub fn new(
        repo: Arc<dyn ArticleRepository>,
        tag_repo: Arc<dyn TagRepository>,
        favorite_repo: Arc<dyn FavoriteRepository>,
        user_repo: Arc<dyn UserRepository>,
        profiles: Arc<ProfileService>,
        tags: Arc<TagService>,
    ) -> Self {
        Self {
            repo,
            tag_repo,
            favorite_repo,
            user_repo,
            profiles,
            tags,
        }
    }

    /// Create a new article written by `author`
    ///
    /// # Errors
    /// - `ValidationError` if title, description or body is blank
    pub async fn create(
        &self,
        author: &User,
        input: CreateArticleInput,
    ) -> Result<ArticleDetails, ArticleServiceError> {
        validation::require("title", &input.title)?;
        validation::require("description", &input.description)?;
        validation::require("body", &input.body)?;

        let mut article = Article::new(
            self.unique_slug(&input.title).await?,
            input.title,
            input.description,
            input.body,
            author.id,
        );

        let mut retries = 0;
        let created = loop {
            match self.repo.create(&article).await {
                Ok(created) => break created,
                Err(e) if retries < SLUG_RETRIES && is_slug_taken(&e) => {
                    retries += 1;
                    tracing::debug!(slug = %article.slug, "Slug taken concurrently, picking another");
                    article.slug = self.unique_slug(&article.title).await?;
                }
                Err(e) => return Err(e.context("Failed to create article").into()),
            }
        };

        let tag_list = normalize_tag_list(&input.tag_list);
        if !tag_list.is_empty() {
            self.tag_repo
                .set_article_tags(created.id, &tag_list)
                .await
                .context("Failed to attach tags")?;
        }
        self.tags.invalidate().await;

        tracing::info!(article_id = created.id, slug = %created.slug, author_id = author.id, "Article created");
        self.details(created, Some(author.id)).await
    }

    /// Get an article by slug
    pub async fn get(
        &self,
        slug: &str,
        viewer_id: Option<i64>,
    ) -> Result<ArticleDetails, ArticleServiceError> {
        let article = self.find(slug).await?;
        self.details(article, viewer_id).await
    }

    /// Update an article. Only its author may do this.
    ///
    /// A changed title regenerates the slug; `tag_list`, when present,
    /// replaces the tag set.
    pub async fn update(
        &self,
        slug: &str,
        user_id: i64,
        input: UpdateArticleInput,
    ) -> Result<ArticleDetails, ArticleServiceError> {
        let mut article = self.find(slug).await?;
        if !article.is_authored_by(user_id) {
            return Err(ArticleServiceError::Forbidden);
        }

        if let Some(title) = input.title {
            validation::require("title", &title)?;
            if title != article.title {
                let base = base_slug(&title);
                if base != article.slug {
                    article.slug = self.unique_slug(&title).await?;
                }
                article.title = title;
            }
        }
        if let Some(description) = input.description {
            validation::require("description", &description)?;
            article.description = description;
        }
        if let Some(body) = input.body {
            validation::require("body", &body)?;
            article.body = body;
        }

        let slug_changed = article.slug != slug;
        let mut retries = 0;
        let updated = loop {
            match self.repo.update(&article).await {
                Ok(updated) => break updated,
                Err(e) if slug_changed && retries < SLUG_RETRIES && is_slug_taken(&e) => {
                    retries += 1;
                    article.slug = self.unique_slug(&article.title).await?;
                }
                Err(e) => return Err(e.context("Failed to update article").into()),
            }
        };

        if let Some(tag_list) = input.tag_list {
            self.tag_repo
                .set_article_tags(updated.id, &normalize_tag_list(&tag_list))
                .await
                .context("Failed to replace tags")?;
            self.tags.invalidate().await;
        }

        tracing::info!(article_id = updated.id, slug = %updated.slug, "Article updated");
        self.details(updated, Some(user_id)).await
    }

    /// Delete an article. Only its author may do this.
    pub async fn delete(&self, slug: &str, user_id: i64) -> Result<(), ArticleServiceError> {
        let article = self.find(slug).await?;
        if !article.is_authored_by(user_id) {
            return Err(ArticleServiceError::Forbidden);
        }

        self.repo
            .delete(article.id)
            .await
            .context("Failed to delete article")?;
        self.tags.invalidate().await;

        tracing::info!(article_id = article.id, slug = %article.slug, "Article deleted");
        Ok(())
    }

    /// List articles, newest first
    ///
    /// An unknown author or favoriting user matches nothing.
    pub async fn list(
        &self,
        filter: ArticleFilter,
        params: ListParams,
        viewer_id: Option<i64>,
    ) -> Result<PagedResult<ArticleDetails>, ArticleServiceError> {
        let mut query = ArticleQuery {
            tag: filter.tag.filter(|t| !t.trim().is_empty()),
            ..Default::default()
        };

        if let Some(author) = filter.author {
            match self.user_id_by_name(&author).await? {
                Some(id) => query.author_id = Some(id),
                None => return Ok(PagedResult::default()),
            }
        }
        if let Some(favorited) = filter.favorited {
            match self.user_id_by_name(&favorited).await? {
                Some(id) => query.favorited_by = Some(id),
                None => return Ok(PagedResult::default()),
            }
        }

        self.query(&query, params, viewer_id).await
    }

    /// Articles by authors the user follows, newest first
    pub async fn feed(
        &self,
        user_id: i64,
        params: ListParams,
    ) -> Result<PagedResult<ArticleDetails>, ArticleServiceError> {
        let query = ArticleQuery {
            followed_by: Some(user_id),
            ..Default::default()
        };
        self.query(&query, params, Some(user_id)).await
    }

    /// Favorite an article. Favoriting twice keeps the count unchanged.
    pub async fn favorite(&self, slug: &str, user_id: i64) -> Result<ArticleDetails, ArticleServiceError> {
        let article = self.find(slug).await?;
        self.favorite_repo
            .add(user_id, article.id)
            .await
            .context("Failed to favorite article")?;

        tracing::debug!(article_id = article.id, user_id, "Article favorited");
        self.details(article, Some(user_id)).await
    }

    /// Unfavorite an article. Not having favorited it is a no-op.
    pub async fn unfavorite(&self, slug: &str, user_id: i64) -> Result<ArticleDetails, ArticleServiceError> {
        let article = self.find(slug).await?;
        self.favorite_repo
            .remove(user_id, article.id)
            .await
            .context("Failed to unfavorite article")?;

        tracing::debug!(article_id = article.id, user_id, "Article unfavorited");
        self.details(article, Some(user_id)).await
    }

    /// Find an article by slug or fail with `NotFound`
    pub async fn find(&self, slug: &str) -> Result<Article, ArticleServiceError> {
        self.repo
            .get_by_slug(slug)
            .await
            .context("Failed to get article by slug")?
            .ok_or_else(|| ArticleServiceError::NotFound(slug.to_string()))
    }

    async fn query(
        &self,
        query: &ArticleQuery,
        params: ListParams,
        viewer_id: Option<i64>,
    ) -> Result<PagedResult<ArticleDetails>, ArticleServiceError> {
        let total = self.repo.count(query).await.context("Failed to count articles")?;
        let articles = self
            .repo
            .list(query, &params)
            .await
            .context("Failed to list articles")?;

        let ids: Vec<i64> = articles.iter().map(|a| a.id).collect();
        let mut tags = self
            .tag_repo
            .get_names_by_article_ids(&ids)
            .await
            .context("Failed to load tags")?;

        let items = try_join_all(articles.into_iter().map(|article| {
            let tag_list = tags.remove(&article.id).unwrap_or_default();
            self.decorate(article, tag_list, viewer_id)
        }))
        .await?;

        Ok(PagedResult::new(items, total))
    }

    async fn details(
        &self,
        article: Article,
        viewer_id: Option<i64>,
    ) -> Result<ArticleDetails, ArticleServiceError> {
        let tag_list = self
            .tag_repo
            .get_names_by_article_id(article.id)
            .await
            .context("Failed to load tags")?;
        self.decorate(article, tag_list, viewer_id).await
    }

    async fn decorate(
        &self,
        article: Article,
        tag_list: Vec<String>,
        viewer_id: Option<i64>,
    ) -> Result<ArticleDetails, ArticleServiceError> {
        let author = self
            .user_repo
            .get_by_id(article.author_id)
            .await
            .context("Failed to load author")?
            .ok_or_else(|| anyhow::anyhow!("Author {} of article {} is missing", article.author_id, article.id))?;
        let author = self.profiles.profile_of(&author, viewer_id).await?;

        let favorited = match viewer_id {
            Some(viewer) => self
                .favorite_repo
                .exists(viewer, article.id)
                .await
                .context("Failed to check favorite")?,
            None => false,
        };
        let favorites_count = self
            .favorite_repo
            .count_for_article(article.id)
            .await
            .context("Failed to count favorites")?;

        Ok(ArticleDetails {
            article,
            tag_list,
            favorited,
            favorites_count,
            author,
        })
    }

    async fn user_id_by_name(&self, username: &str) -> Result<Option<i64>, ArticleServiceError> {
        let user = self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?;
        Ok(user.map(|u| u.id))
    }

    /// Slug for `title`, with a random suffix when already taken
    async fn unique_slug(&self, title: &str) -> Result<String, ArticleServiceError> {
        let base = base_slug(title);
        let mut slug = base.clone();

        while self
            .repo
            .exists_by_slug(&slug)
            .await
            .context("Failed to check slug")?
        {
            slug = format!("{}-{}", base, random_suffix());
        }

        Ok(slug)
    }
}

fn is_slug_taken(error: &anyhow::Error) -> bool {
    UniqueViolation::find(error).is_some_and(|v| v.column == "slug")
}

/// Generate a URL-friendly slug from a title
///
/// Transliterates to ASCII, lowercases, and joins alphanumeric runs with
/// single hyphens. Titles without any usable character map to `article`.
pub fn base_slug(title: &str) -> String {
    let slug = slug::slugify(title);
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

fn random_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..SLUG_SUFFIX_LEN].to_string()
}
