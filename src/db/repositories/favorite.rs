//! Favorite repository
//!
//! Stores which users favorited which articles.

use crate::db::DynDatabasePool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait FavoriteRepository: Send + Sync {
    /// Favorite an article. Favoriting twice keeps a single row.
    async fn add(&self, user_id: i64, article_id: i64) -> Result<()>;

    /// Unfavorite an article. Missing rows are ignored.
    async fn remove(&self, user_id: i64, article_id: i64) -> Result<()>;

    async fn exists(&self, user_id: i64, article_id: i64) -> Result<bool>;

    /// Number of users who favorited the article
    async fn count_for_article(&self, article_id: i64) -> Result<i64>;
}

pub struct SqlxFavoriteRepository {
    pool: DynDatabasePool,
}

impl SqlxFavoriteRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FavoriteRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl FavoriteRepository for SqlxFavoriteRepository {
    async fn add(&self, user_id: i64, article_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO favorites (user_id, article_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(article_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to favorite article")?;
        Ok(())
    }

    async fn remove(&self, user_id: i64, article_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM favorites WHERE user_id = ? AND article_id = ?")
            .bind(user_id)
            .bind(article_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to unfavorite article")?;
        Ok(())
    }

    async fn exists(&self, user_id: i64, article_id: i64) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM favorites WHERE user_id = ? AND article_id = ?",
        )
        .bind(user_id)
        .bind(article_id)
        .fetch_one(self.pool.sqlite())
        .await
        .context("Failed to check favorite")?;
        Ok(count > 0)
    }

    async fn count_for_article(&self, article_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorites WHERE article_id = ?")
            .bind(article_id)
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count favorites")?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        ArticleRepository, SqlxArticleRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Article, User};

    async fn setup() -> (SqlxFavoriteRepository, i64, i64, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let author = users
            .create(&User::new("author".into(), "author@example.com".into(), "hash".into()))
            .await
            .unwrap();
        let reader = users
            .create(&User::new("reader".into(), "reader@example.com".into(), "hash".into()))
            .await
            .unwrap();
        let article = SqlxArticleRepository::new(pool.clone())
            .create(&Article::new(
                "hello".into(),
                "Hello".into(),
                "desc".into(),
                "body".into(),
                author.id,
            ))
            .await
            .unwrap();

        (SqlxFavoriteRepository::new(pool), author.id, reader.id, article.id)
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let (repo, _author, reader, article) = setup().await;

        repo.add(reader, article).await.unwrap();
        repo.add(reader, article).await.unwrap();

        assert!(repo.exists(reader, article).await.unwrap());
        assert_eq!(repo.count_for_article(article).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_count_multiple_users() {
        let (repo, author, reader, article) = setup().await;

        repo.add(reader, article).await.unwrap();
        repo.add(author, article).await.unwrap();

        assert_eq!(repo.count_for_article(article).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_remove() {
        let (repo, _author, reader, article) = setup().await;

        repo.remove(reader, article).await.unwrap();
        repo.add(reader, article).await.unwrap();
        repo.remove(reader, article).await.unwrap();

        assert!(!repo.exists(reader, article).await.unwrap());
        assert_eq!(repo.count_for_article(article).await.unwrap(), 0);
    }
}
