//! Query embedding cache
//!
//! Embedding a question is idempotent, so repeated questions (a user retrying,
//! or a multi-turn UI resubmitting) skip the provider round trip.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

/// Cache entry with TTL
#[derive(Clone)]
struct CacheEntry {
    vector: Vec<f32>,
    expires_at: SystemTime,
}

/// In-memory cache of query vectors
pub struct EmbeddingCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl EmbeddingCache {
    /// Create new cache with default TTL of 1 hour
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(3600))
    }

    /// Create cache with custom TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: 4096,
        }
    }

    /// Get cached vector if present and not expired
    pub fn get(&self, key: &str) -> Option<Vec<f32>> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(key)?;

        if SystemTime::now() < entry.expires_at {
            Some(entry.vector.clone())
        } else {
            None
        }
    }

    pub fn set(&self, key: String, vector: Vec<f32>) {
        let expires_at = SystemTime::now() + self.ttl;

        if let Ok(mut entries) = self.entries.write() {
            if entries.len() >= self.max_entries {
                let now = SystemTime::now();
                entries.retain(|_, entry| now < entry.expires_at);
                if entries.len() >= self.max_entries {
                    entries.clear();
                }
            }
            entries.insert(key, CacheEntry { vector, expires_at });
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate cache key for a query embedding
pub fn embedding_cache_key(model: &str, text: &str) -> String {
    let mut hasher = DefaultHasher::new();
    model.hash(&mut hasher);
    text.hash(&mut hasher);
    format!("embed:{}:{:x}", model, hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_basic() {
        let cache = EmbeddingCache::new();

        cache.set("key1".to_string(), vec![0.1, 0.2]);
        assert_eq!(cache.get("key1"), Some(vec![0.1, 0.2]));
        assert_eq!(cache.get("key2"), None);
    }

    #[test]
    fn test_cache_expiry() {
        let cache = EmbeddingCache::with_ttl(Duration::from_millis(50));

        cache.set("key1".to_string(), vec![1.0]);
        assert!(cache.get("key1").is_some());

        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(cache.get("key1"), None);
    }

    #[test]
    fn test_cache_key_generation() {
        let key1 = embedding_cache_key("model1", "text1");
        let key2 = embedding_cache_key("model1", "text1");
        let key3 = embedding_cache_key("model1", "text2");
        let key4 = embedding_cache_key("model2", "text1");

        assert_eq!(key1, key2);
        assert_ne!(key1, key3);
        assert_ne!(key1, key4);
    }
}
