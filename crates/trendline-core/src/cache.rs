//! Best-effort report cache.
//!
//! Concurrent misses on the same key may each run the computation; the last
//! writer wins. Nothing here is durable.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Key-value storage with per-entry TTL.
///
/// The in-process [`MemoryCacheStore`] is the default; a distributed store
/// only has to implement these four calls.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>>;
    async fn put(&self, key: &str, value: Value, ttl: Duration) -> anyhow::Result<()>;
    async fn forget(&self, key: &str) -> anyhow::Result<bool>;
    async fn flush(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

#[derive(Debug, Default, Clone)]
pub struct MemoryCacheStore {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry. Reads already ignore them.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Expired: evict lazily.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: Value, ttl: Duration) -> anyhow::Result<()> {
        if ttl.is_zero() {
            return Ok(());
        }
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn forget(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn flush(&self) -> anyhow::Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}

/// Memoizes report computations under prefixed, parameter-derived keys.
#[derive(Clone)]
pub struct ReportCache {
    store: Arc<dyn CacheStore>,
    prefix: String,
}

impl ReportCache {
    pub fn new(store: Arc<dyn CacheStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// In-memory cache with the standard `analytics:` prefix.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheStore::new()), "analytics:")
    }

    /// `"{report}:{sha256(canonical params)}"`. Key order inside `params`
    /// (at any depth) does not affect the result.
    pub fn generate_key(report: &str, params: &Value) -> String {
        let canonical = canonicalize(params);
        let digest = Sha256::digest(canonical.to_string().as_bytes());
        format!("{report}:{}", hex::encode(digest))
    }

    /// Return the cached value for `key`, or run `compute` and store its
    /// result. Only `Ok` results are stored. With `refresh` set the read is
    /// skipped and the entry is overwritten.
    pub async fn try_remember<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        refresh: bool,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let full_key = self.full_key(key);

        if !refresh {
            match self.store.get(&full_key).await {
                Ok(Some(raw)) => match serde_json::from_value::<T>(raw) {
                    Ok(hit) => {
                        debug!(cache_key = %full_key, "cache hit");
                        return Ok(hit);
                    }
                    Err(e) => warn!(cache_key = %full_key, error = %e, "discarding undecodable cache entry"),
                },
                Ok(None) => debug!(cache_key = %full_key, "cache miss"),
                Err(e) => warn!(cache_key = %full_key, error = %e, "cache read failed, bypassing"),
            }
        }

        let value = compute().await?;

        match serde_json::to_value(&value) {
            Ok(raw) => {
                if let Err(e) = self.store.put(&full_key, raw, ttl).await {
                    warn!(cache_key = %full_key, error = %e, "cache write failed");
                }
            }
            Err(e) => warn!(cache_key = %full_key, error = %e, "payload not cacheable"),
        }

        Ok(value)
    }

    pub async fn forget(&self, key: &str) -> anyhow::Result<bool> {
        self.store.forget(&self.full_key(key)).await
    }

    /// Administrative: drop every cached report.
    pub async fn flush(&self) -> anyhow::Result<()> {
        self.store.flush().await
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
