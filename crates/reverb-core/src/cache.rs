use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::Result;

/// Opaque key-value store with TTL semantics. Values are arbitrary JSON
/// so callers can persist whole lists or maps in one entry. Missing keys
/// are `None`, never an error.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;
    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()>;
}

/// In-process cache backend. Entries expire lazily on read.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (serde_json::Value, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let mut entries = self.entries.lock().unwrap();
        let expired = matches!(entries.get(key), Some((_, expires_at)) if *expires_at <= Instant::now());
        if expired {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = MemoryCache::new();
        cache
            .set("k", serde_json::json!({"a": 1}), Duration::from_secs(60))
            .await
            .unwrap();
        let value = cache.get("k").await.unwrap();
        assert_eq!(value, Some(serde_json::json!({"a": 1})));
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn zero_ttl_expires_immediately() {
        let cache = MemoryCache::new();
        cache
            .set("k", serde_json::json!("v"), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
