//! Follow repository
//!
//! Stores the asymmetric follower → followee relation.

use crate::db::DynDatabasePool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Record that `follower_id` follows `followee_id`. Already following is a no-op.
    async fn follow(&self, follower_id: i64, followee_id: i64) -> Result<()>;

    /// Remove the relation. Not following is a no-op.
    async fn unfollow(&self, follower_id: i64, followee_id: i64) -> Result<()>;

    /// Check whether `follower_id` follows `followee_id`
    async fn is_following(&self, follower_id: i64, followee_id: i64) -> Result<bool>;
}

pub struct SqlxFollowRepository {
    pool: DynDatabasePool,
}

impl SqlxFollowRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FollowRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl FollowRepository for SqlxFollowRepository {
    async fn follow(&self, follower_id: i64, followee_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO follows (follower_id, followee_id) VALUES (?, ?)")
            .bind(follower_id)
            .bind(followee_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to follow user")?;
        Ok(())
    }

    async fn unfollow(&self, follower_id: i64, followee_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followee_id = ?")
            .bind(follower_id)
            .bind(followee_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to unfollow user")?;
        Ok(())
    }

    async fn is_following(&self, follower_id: i64, followee_id: i64) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ? AND followee_id = ?",
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_one(self.pool.sqlite())
        .await
        .context("Failed to check follow relation")?;
        Ok(count > 0)
    }
}
