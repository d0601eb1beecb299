//! Comment repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

use crate::db::DynDatabasePool;
use crate::models::Comment;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    /// Get a comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Get comments for an article, newest first
    async fn list_by_article(&self, article_id: i64) -> Result<Vec<Comment>>;

    /// Delete a comment, returning whether a row was removed
    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        let result = sqlx::query(
            r#"
            INSERT INTO comments (body, article_id, author_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&comment.body)
        .bind(comment.article_id)
        .bind(comment.author_id)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create comment")?;

        Ok(Comment {
            id: result.last_insert_rowid(),
            ..comment.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let row = sqlx::query(
            "SELECT id, body, article_id, author_id, created_at, updated_at FROM comments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get comment")?;

        row.as_ref().map(row_to_comment).transpose()
    }

    async fn list_by_article(&self, article_id: i64) -> Result<Vec<Comment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, body, article_id, author_id, created_at, updated_at
            FROM comments
            WHERE article_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(article_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list comments")?;

        rows.iter().map(row_to_comment).collect()
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete comment")?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_comment(row: &SqliteRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        body: row.try_get("body")?,
        article_id: row.try_get("article_id")?,
        author_id: row.try_get("author_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        ArticleRepository, SqlxArticleRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Article, User};
    use chrono::Duration;

    async fn setup() -> (SqlxCommentRepository, i64, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user = SqlxUserRepository::new(pool.clone())
            .create(&User::new("jake".into(), "jake@jake.jake".into(), "hash".into()))
            .await
            .unwrap();
        let article = SqlxArticleRepository::new(pool.clone())
            .create(&Article::new(
                "hello".into(),
                "Hello".into(),
                "desc".into(),
                "body".into(),
                user.id,
            ))
            .await
            .unwrap();

        (SqlxCommentRepository::new(pool), user.id, article.id)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (repo, user, article) = setup().await;

        let created = repo
            .create(&Comment::new("Thank you so much!".into(), article, user))
            .await
            .unwrap();

        assert!(created.id > 0);
        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (repo, user, article) = setup().await;

        let mut older = Comment::new("first".into(), article, user);
        older.created_at = older.created_at - Duration::minutes(5);
        repo.create(&older).await.unwrap();
        repo.create(&Comment::new("second".into(), article, user)).await.unwrap();

        let comments = repo.list_by_article(article).await.unwrap();
        let bodies: Vec<_> = comments.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_delete() {
        let (repo, user, article) = setup().await;
        let created = repo.create(&Comment::new("bye".into(), article, user)).await.unwrap();

        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }
}
