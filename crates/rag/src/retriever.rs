//! TTL-cached retriever wrapper

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use voice_loop_core::{Document, Result, RetrieveOptions, Retriever};

use crate::cache::RetrievalCache;

/// Wraps a retriever with a short-TTL result cache keyed by query text
pub struct CachedRetriever {
    inner: Arc<dyn Retriever>,
    cache: RetrievalCache,
    name: String,
}

impl CachedRetriever {
    pub fn new(inner: Arc<dyn Retriever>, ttl: Duration) -> Self {
        let name = format!("cached:{}", inner.name());
        Self {
            inner,
            cache: RetrievalCache::new(ttl),
            name,
        }
    }
}

#[async_trait]
impl Retriever for CachedRetriever {
    async fn retrieve(&self, query: &str, options: &RetrieveOptions) -> Result<Vec<Document>> {
        let key = RetrievalCache::query_hash(query);
        if let Some(documents) = self.cache.get(key) {
            tracing::debug!(query_hash = key, contexts = documents.len(), "retrieval cache hit");
            return Ok(documents);
        }

        let documents = self.inner.retrieve(query, options).await?;
        self.cache.insert(key, documents.clone());
        Ok(documents)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn clear_cache(&self) {
        self.cache.clear();
        self.inner.clear_cache();
    }
}
