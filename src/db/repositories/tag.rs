//! Tag repository
//!
//! Database operations for tags and the article ↔ tag association.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for SQLite

use crate::db::DynDatabasePool;
use crate::models::Tag;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::collections::HashMap;
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Get tag by name
    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// Get an existing tag or create it
    async fn get_or_create(&self, name: &str) -> Result<Tag>;

    /// All tag names, sorted and distinct
    async fn list_names(&self) -> Result<Vec<String>>;

    /// Replace the tag set of an article, keeping the given order
    async fn set_article_tags(&self, article_id: i64, names: &[String]) -> Result<()>;

    /// Tag names of an article in insertion order
    async fn get_names_by_article_id(&self, article_id: i64) -> Result<Vec<String>>;

    /// Tag names for several articles at once
    async fn get_names_by_article_ids(&self, article_ids: &[i64]) -> Result<HashMap<i64, Vec<String>>>;
}

/// SQLx-based tag repository implementation
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let row = sqlx::query("SELECT id, name FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get tag by name")?;

        match row {
            Some(row) => Ok(Some(Tag {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
            })),
            None => Ok(None),
        }
    }

    async fn get_or_create(&self, name: &str) -> Result<Tag> {
        sqlx::query("INSERT OR IGNORE INTO tags (name) VALUES (?)")
            .bind(name)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to create tag")?;

        self.get_by_name(name)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Tag '{}' missing after insert", name))
    }

    async fn list_names(&self) -> Result<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT DISTINCT name FROM tags ORDER BY name")
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list tags")?;
        Ok(names)
    }

    async fn set_article_tags(&self, article_id: i64, names: &[String]) -> Result<()> {
        let mut tag_ids = Vec::with_capacity(names.len());
        for name in names {
            tag_ids.push(self.get_or_create(name).await?.id);
        }

        let mut tx = self
            .pool
            .sqlite()
            .begin()
            .await
            .context("Failed to begin transaction")?;

        sqlx::query("DELETE FROM article_tags WHERE article_id = ?")
            .bind(article_id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear article tags")?;

        for (position, tag_id) in tag_ids.iter().enumerate() {
            sqlx::query(
                "INSERT OR IGNORE INTO article_tags (article_id, tag_id, position) VALUES (?, ?, ?)",
            )
            .bind(article_id)
            .bind(tag_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .context("Failed to add tag to article")?;
        }

        tx.commit().await.context("Failed to commit article tags")?;
        Ok(())
    }

    async fn get_names_by_article_id(&self, article_id: i64) -> Result<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT t.name
            FROM tags t
            INNER JOIN article_tags at ON t.id = at.tag_id
            WHERE at.article_id = ?
            ORDER BY at.position
            "#,
        )
        .bind(article_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to get tags by article")?;
        Ok(names)
    }

    async fn get_names_by_article_ids(&self, article_ids: &[i64]) -> Result<HashMap<i64, Vec<String>>> {
        let mut result: HashMap<i64, Vec<String>> = HashMap::new();
        if article_ids.is_empty() {
            return Ok(result);
        }

        let placeholders = vec!["?"; article_ids.len()].join(", ");
        let sql = format!(
            r#"
            SELECT at.article_id, t.name
            FROM tags t
            INNER JOIN article_tags at ON t.id = at.tag_id
            WHERE at.article_id IN ({})
            ORDER BY at.article_id, at.position
            "#,
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for id in article_ids {
            query = query.bind(id);
        }

        let rows = query
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to get tags for articles")?;

        for row in rows {
            let article_id: i64 = row.try_get("article_id")?;
            let name: String = row.try_get("name")?;
            result.entry(article_id).or_default().push(name);
        }

        Ok(result)
    }
}
