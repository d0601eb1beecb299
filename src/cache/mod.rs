//! Cache layer
//!
//! In-process caching for hot, rarely changing data such as the tag list.
//!
//! # Usage
//!
//! ```rust,ignore
//! use conduit::cache::{create_cache, CacheLayer};
//! use conduit::config::CacheConfig;
//!
//! let cache = create_cache(&CacheConfig::default());
//! cache.set("key", &"value", Duration::from_secs(60)).await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{CacheConfig, MAX_CACHE_TTL_SECONDS};

pub use memory::{MemoryCache, DEFAULT_MAX_CAPACITY};

/// Cache layer trait
///
/// The methods are generic, so the trait is not object safe; services hold
/// the concrete `Cache` type instead of `dyn CacheLayer`.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Get a value from cache
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Set a value in cache with TTL
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    /// Delete a value from cache
    async fn delete(&self, key: &str) -> Result<()>;
}

/// The cache used by services
pub type Cache = MemoryCache;

/// Create a cache instance based on configuration
pub fn create_cache(config: &CacheConfig) -> Arc<Cache> {
    let ttl = Duration::from_secs(config.ttl_seconds.clamp(1, MAX_CACHE_TTL_SECONDS));
    Arc::new(MemoryCache::with_capacity_and_ttl(DEFAULT_MAX_CAPACITY, ttl))
}
