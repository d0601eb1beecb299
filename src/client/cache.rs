//! Query cache with optimistic mutations
//!
//! Values are stored as JSON under a `QueryKey` (a list of path segments such
//! as `["article", "how-to-train-your-dragon"]`). Each key carries a
//! generation counter: a fetch only stores its result if no mutation or
//! invalidation bumped the generation while it was in flight.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// How long a fetched value is served without refetching
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);

pub type QueryKey = Vec<String>;

/// Build a key from its segments
pub fn key<I, S>(segments: I) -> QueryKey
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    segments.into_iter().map(Into::into).collect()
}

/// Keys used by the client
pub mod keys {
    use super::{key, QueryKey};

    pub fn current_user() -> QueryKey {
        key(["currentUser"])
    }

    pub fn profile(username: &str) -> QueryKey {
        key(["profile", username])
    }

    pub fn article(slug: &str) -> QueryKey {
        key(["article", slug])
    }

    pub fn comments(slug: &str) -> QueryKey {
        key(["comments", slug])
    }

    /// Prefix of every global list query
    pub fn articles() -> QueryKey {
        key(["articles"])
    }

    /// Prefix of every feed query
    pub fn feed() -> QueryKey {
        key(["feed"])
    }

    pub fn tags() -> QueryKey {
        key(["tags"])
    }
}

#[derive(Debug, Default)]
struct Entry {
    value: Option<(Value, Instant)>,
    generation: u64,
}

/// An optimistic mutation
///
/// `predict` is applied to the current value of each key in `keys` that has
/// one. `reconcile` turns the server response into the values to store, and
/// `invalidate` lists key prefixes to drop once the request succeeded.
pub struct Optimistic<Req, P, C> {
    pub keys: Vec<QueryKey>,
    pub predict: P,
    pub request: Req,
    pub reconcile: C,
    pub invalidate: Vec<QueryKey>,
}

pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    stale_time: Duration,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::with_stale_time(DEFAULT_STALE_TIME)
    }

    pub fn with_stale_time(stale_time: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            stale_time,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current raw value, fresh or not
    pub fn get_value(&self, key: &QueryKey) -> Option<Value> {
        self.lock()
            .get(key)
            .and_then(|e| e.value.as_ref())
            .map(|(value, _)| value.clone())
    }

    /// Current value decoded as `T`
    pub fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        self.get_value(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    pub fn set_value(&self, key: QueryKey, value: Value) {
        self.lock().entry(key).or_default().value = Some((value, Instant::now()));
    }

    pub fn set<T: Serialize>(&self, key: QueryKey, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.set_value(key, value),
            Err(e) => tracing::warn!(?key, error = %e, "Value not cached: not serializable"),
        }
    }

    /// Store `value` and cancel in-flight fetches for `key`
    fn replace(&self, key: QueryKey, value: Value) {
        let mut entries = self.lock();
        let entry = entries.entry(key).or_default();
        entry.generation += 1;
        entry.value = Some((value, Instant::now()));
    }

    pub fn remove(&self, key: &QueryKey) {
        if let Some(entry) = self.lock().get_mut(key) {
            entry.value = None;
        }
    }

    /// Cancel in-flight fetches for `key`: their results will not be stored
    pub fn cancel(&self, key: &QueryKey) {
        self.lock().entry(key.clone()).or_default().generation += 1;
    }

    pub fn generation(&self, key: &QueryKey) -> u64 {
        self.lock().get(key).map(|e| e.generation).unwrap_or(0)
    }

    fn fresh_value(&self, key: &QueryKey) -> Option<Value> {
        let entries = self.lock();
        let (value, stored_at) = entries.get(key)?.value.as_ref()?;
        let fresh = (stored_at.elapsed() < self.stale_time).then(|| value.clone());
        fresh
    }

    /// Drop every key starting with `prefix` and cancel its in-flight fetches
    pub fn invalidate_prefix(&self, prefix: &[String]) {
        let mut entries = self.lock();
        for (key, entry) in entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.value = None;
                entry.generation += 1;
            }
        }
    }

    /// Drop everything
    pub fn clear(&self) {
        let mut entries = self.lock();
        for entry in entries.values_mut() {
            entry.value = None;
            entry.generation += 1;
        }
    }

    /// Serve `key` from the cache when fresh, otherwise run `loader`
    /// (retrying once on failure) and store its result unless the key was
    /// mutated or invalidated meanwhile.
    pub async fn fetch<T, E, F, Fut>(&self, key: QueryKey, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.fresh_value(&key) {
            if let Ok(cached) = serde_json::from_value(value) {
                return Ok(cached);
            }
        }

        let generation = self.generation(&key);
        let loaded = match loader().await {
            Ok(value) => value,
            Err(_) => {
                tracing::debug!(?key, "Query failed, retrying once");
                loader().await?
            }
        };

        if self.generation(&key) == generation {
            self.set(key, &loaded);
        } else {
            tracing::debug!(?key, "Discarding result of cancelled query");
        }

        Ok(loaded)
    }

    /// Run an optimistic mutation
    ///
    /// Cancels fetches for the affected keys, writes the predicted values,
    /// and awaits the request. On failure the previous values are restored;
    /// on success the reconciled values are written and the dependent
    /// prefixes invalidated. The last response to arrive wins.
    pub async fn mutate<R, E, Req, P, C>(&self, op: Optimistic<Req, P, C>) -> Result<R, E>
    where
        Req: Future<Output = Result<R, E>>,
        P: Fn(&QueryKey, Value) -> Value,
        C: FnOnce(&R) -> Vec<(QueryKey, Value)>,
    {
        let mut snapshots = Vec::with_capacity(op.keys.len());
        for key in &op.keys {
            self.cancel(key);
            let previous = self.get_value(key);
            if let Some(previous) = previous.clone() {
                self.set_value(key.clone(), (op.predict)(key, previous));
            }
            snapshots.push((key.clone(), previous));
        }

        match op.request.await {
            Ok(response) => {
                // Fetches started before the response landed would overwrite it
                for (key, value) in (op.reconcile)(&response) {
                    self.replace(key, value);
                }
                for prefix in &op.invalidate {
                    self.invalidate_prefix(prefix);
                }
                Ok(response)
            }
            Err(e) => {
                for (key, previous) in snapshots {
                    match previous {
                        Some(value) => self.set_value(key, value),
                        None => self.remove(&key),
                    }
                }
                tracing::debug!("Optimistic update rolled back");
                Err(e)
            }
        }
    }
}
