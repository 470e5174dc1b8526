//! Query result cache with TTL

use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use tokio::time::Instant;

use voice_loop_core::Document;

/// Maps a query hash to recently retrieved contexts.
///
/// Entries expire after the configured TTL; expired entries are evicted on
/// access.
pub struct RetrievalCache {
    entries: Mutex<HashMap<u64, (Instant, Vec<Document>)>>,
    ttl: Duration,
}

impl RetrievalCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Hash a query text into a cache key
    pub fn query_hash(text: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        hasher.finish()
    }

    /// Fresh contexts for the key, if any
    pub fn get(&self, key: u64) -> Option<Vec<Document>> {
        let mut entries = self.entries.lock();
        match entries.get(&key) {
            Some((stored_at, documents)) if stored_at.elapsed() < self.ttl => {
                Some(documents.clone())
            }
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Store contexts for the key
    pub fn insert(&self, key: u64, documents: Vec<Document>) {
        self.entries
            .lock()
            .insert(key, (Instant::now(), documents));
    }

    /// Drop all entries
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of stored entries, expired or not
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Is the cache empty?
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_hit_within_ttl() {
        let cache = RetrievalCache::new(Duration::from_secs(300));
        let key = RetrievalCache::query_hash("opening hours");
        cache.insert(key, vec![Document::new("9 to 5", 0.9)]);

        tokio::time::advance(Duration::from_secs(299)).await;
        let documents = cache.get(key).unwrap();
        assert_eq!(documents[0].text, "9 to 5");
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_evicted() {
        let cache = RetrievalCache::new(Duration::from_secs(300));
        let key = RetrievalCache::query_hash("opening hours");
        cache.insert(key, vec![Document::new("9 to 5", 0.9)]);

        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(cache.get(key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_hash_is_stable_per_text() {
        assert_eq!(
            RetrievalCache::query_hash("hello"),
            RetrievalCache::query_hash("hello")
        );
        assert_ne!(
            RetrievalCache::query_hash("hello"),
            RetrievalCache::query_hash("hello!")
        );
    }
}
