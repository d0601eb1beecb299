//! Tag service
//!
//! Serves the global tag list. The list changes only when articles are
//! written, so it is cached and the article service invalidates it.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::TagRepository;
use anyhow::Context;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const CACHE_KEY_TAG_LIST: &str = "tags:all";

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct TagService {
    repo: Arc<dyn TagRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
    /// Bumped by every invalidation; a list read across a bump is not cached
    generation: AtomicU64,
}

impl TagService {
    /// Create a new tag service; entries live as long as the cache's default TTL
    pub fn new(repo: Arc<dyn TagRepository>, cache: Arc<Cache>) -> Self {
        let cache_ttl = cache.default_ttl();
        Self {
            repo,
            cache,
            cache_ttl,
            generation: AtomicU64::new(0),
        }
    }

    /// All tag names, sorted and distinct
    pub async fn list(&self) -> Result<Vec<String>, TagServiceError> {
        if let Ok(Some(cached)) = self.cache.get::<Vec<String>>(CACHE_KEY_TAG_LIST).await {
            return Ok(cached);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let tags = self.repo.list_names().await.context("Failed to list tags")?;

        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("Tag list changed while loading, not caching it");
        } else if let Err(e) = self.cache.set(CACHE_KEY_TAG_LIST, &tags, self.cache_ttl).await {
            tracing::warn!("Failed to cache tag list: {}", e);
        }

        Ok(tags)
    }

    /// Drop the cached tag list
    pub async fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.cache.delete(CACHE_KEY_TAG_LIST).await {
            tracing::warn!("Failed to invalidate tag cache: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::SqlxTagRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::Tag;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Notify;

    async fn setup_test_service() -> (Arc<dyn TagRepository>, TagService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let repo = SqlxTagRepository::boxed(pool);
        let service = TagService::new(repo.clone(), create_cache(&CacheConfig::default()));
        (repo, service)
    }

    #[tokio::test]
    async fn test_list_empty() {
        let (_repo, service) = setup_test_service().await;
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_is_cached_until_invalidated() {
        let (repo, service) = setup_test_service().await;
        repo.get_or_create("dragons").await.unwrap();

        assert_eq!(service.list().await.unwrap(), vec!["dragons"]);

        // Written behind the service's back: still the cached list
        repo.get_or_create("angular").await.unwrap();
        assert_eq!(service.list().await.unwrap(), vec!["dragons"]);

        service.invalidate().await;
        assert_eq!(service.list().await.unwrap(), vec!["angular", "dragons"]);
    }

    /// Pauses the first `list_names` call after it has read the table
    struct PausingTagRepository {
        inner: Arc<dyn TagRepository>,
        paused: AtomicBool,
        read: Notify,
        resume: Notify,
    }

    #[async_trait]
    impl TagRepository for PausingTagRepository {
        async fn get_by_name(&self, name: &str) -> anyhow::Result<Option<Tag>> {
            self.inner.get_by_name(name).await
        }

        async fn get_or_create(&self, name: &str) -> anyhow::Result<Tag> {
            self.inner.get_or_create(name).await
        }

        async fn list_names(&self) -> anyhow::Result<Vec<String>> {
            let names = self.inner.list_names().await?;
            if self.paused.swap(false, Ordering::SeqCst) {
                self.read.notify_one();
                self.resume.notified().await;
            }
            Ok(names)
        }

        async fn set_article_tags(&self, article_id: i64, names: &[String]) -> anyhow::Result<()> {
            self.inner.set_article_tags(article_id, names).await
        }

        async fn get_names_by_article_id(&self, article_id: i64) -> anyhow::Result<Vec<String>> {
            self.inner.get_names_by_article_id(article_id).await
        }

        async fn get_names_by_article_ids(
            &self,
            article_ids: &[i64],
        ) -> anyhow::Result<HashMap<i64, Vec<String>>> {
            self.inner.get_names_by_article_ids(article_ids).await
        }
    }

    #[tokio::test]
    async fn test_list_read_before_invalidation_is_not_cached() {
        let (inner, _) = setup_test_service().await;
        inner.get_or_create("dragons").await.unwrap();

        let repo = Arc::new(PausingTagRepository {
            inner: inner.clone(),
            paused: AtomicBool::new(true),
            read: Notify::new(),
            resume: Notify::new(),
        });
        let service = TagService::new(repo.clone(), create_cache(&CacheConfig::default()));

        let writer = async {
            repo.read.notified().await;
            inner.get_or_create("angular").await.unwrap();
            service.invalidate().await;
            repo.resume.notify_one();
        };
        let (stale, ()) = tokio::join!(service.list(), writer);

        // The in-flight read may answer with the old list, but must not cache it
        assert_eq!(stale.unwrap(), vec!["dragons"]);
        assert_eq!(service.list().await.unwrap(), vec!["angular", "dragons"]);
    }
}
