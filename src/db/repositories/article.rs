//! Article repository
//!
//! Database operations for articles.
//!
//! This module provides:
//! - `ArticleRepository` trait defining the interface for article data access
//! - `SqlxArticleRepository` implementing the trait for SQLite
//!
//! List queries take an `ArticleQuery` whose filters are already resolved to
//! IDs; unset filters are skipped with `? IS NULL` guards so the SQL stays
//! static.

use super::unique_violation;
use crate::db::DynDatabasePool;
use crate::models::{Article, ArticleQuery, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Create a new article
    async fn create(&self, article: &Article) -> Result<Article>;

    /// Get article by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    /// Get article by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>>;

    /// Check if a slug is already used
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;

    /// Update slug, title, description and body of an article
    async fn update(&self, article: &Article) -> Result<Article>;

    /// Delete an article (comments, favorites and tag links cascade)
    async fn delete(&self, id: i64) -> Result<()>;

    /// List matching articles, newest first
    async fn list(&self, query: &ArticleQuery, params: &ListParams) -> Result<Vec<Article>>;

    /// Count all matching articles, ignoring pagination
    async fn count(&self, query: &ArticleQuery) -> Result<i64>;
}

/// SQLx-based article repository implementation
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    /// Create a new SQLx article repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

const ARTICLE_COLUMNS: &str =
    "a.id, a.slug, a.title, a.description, a.body, a.author_id, a.created_at, a.updated_at";

const ARTICLE_FILTER: &str = r#"
    WHERE (?1 IS NULL OR EXISTS (
            SELECT 1 FROM article_tags at
            JOIN tags t ON t.id = at.tag_id
            WHERE at.article_id = a.id AND t.name = ?1))
      AND (?2 IS NULL OR a.author_id = ?2)
      AND (?3 IS NULL OR EXISTS (
            SELECT 1 FROM favorites f
            WHERE f.article_id = a.id AND f.user_id = ?3))
      AND (?4 IS NULL OR EXISTS (
            SELECT 1 FROM follows fo
            WHERE fo.followee_id = a.author_id AND fo.follower_id = ?4))
"#;

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, article: &Article) -> Result<Article> {
        let result = sqlx::query(
            r#"
            INSERT INTO articles (slug, title, description, body, author_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.slug)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.body)
        .bind(article.author_id)
        .bind(article.created_at)
        .bind(article.updated_at)
        .execute(self.pool.sqlite())
        .await
        .map_err(unique_violation)
        .context("Failed to create article")?;

        Ok(Article {
            id: result.last_insert_rowid(),
            ..article.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM articles a WHERE a.id = ?",
            ARTICLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get article by ID")?;

        row.as_ref().map(row_to_article).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM articles a WHERE a.slug = ?",
            ARTICLE_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get article by slug")?;

        row.as_ref().map(row_to_article).transpose()
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE slug = ?")
            .bind(slug)
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to check slug existence")?;
        Ok(count > 0)
    }

    async fn update(&self, article: &Article) -> Result<Article> {
        let now = Utc::now().trunc_subsecs(3);

        sqlx::query(
            r#"
            UPDATE articles
            SET slug = ?, title = ?, description = ?, body = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&article.slug)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.body)
        .bind(now)
        .bind(article.id)
        .execute(self.pool.sqlite())
        .await
        .map_err(unique_violation)
        .context("Failed to update article")?;

        self.get_by_id(article.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Article not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete article")?;
        Ok(())
    }

    async fn list(&self, query: &ArticleQuery, params: &ListParams) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {} FROM articles a {} ORDER BY a.created_at DESC, a.id DESC LIMIT ?5 OFFSET ?6",
            ARTICLE_COLUMNS, ARTICLE_FILTER
        );

        let rows = sqlx::query(&sql)
            .bind(&query.tag)
            .bind(query.author_id)
            .bind(query.favorited_by)
            .bind(query.followed_by)
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list articles")?;

        rows.iter().map(row_to_article).collect()
    }

    async fn count(&self, query: &ArticleQuery) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM articles a {}", ARTICLE_FILTER);

        let count: i64 = sqlx::query_scalar(&sql)
            .bind(&query.tag)
            .bind(query.author_id)
            .bind(query.favorited_by)
            .bind(query.followed_by)
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count articles")?;
        Ok(count)
    }
}

fn row_to_article(row: &SqliteRow) -> Result<Article> {
    Ok(Article {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        body: row.try_get("body")?,
        author_id: row.try_get("author_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
