//! Retrieval trait for RAG

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::Result;

/// Retriever interface.
///
/// An absent retriever is equivalent to an empty return; retrieval failures
/// degrade to empty-context generation and are never surfaced to the user.
#[async_trait]
pub trait Retriever: Send + Sync + 'static {
    /// Retrieve relevant documents, sorted by relevance (highest first)
    async fn retrieve(&self, query: &str, options: &RetrieveOptions) -> Result<Vec<Document>>;

    /// Retriever name for logging
    fn name(&self) -> &str;

    /// Clear any cached results
    fn clear_cache(&self) {}
}

/// Retrieval options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveOptions {
    /// Number of documents to return; small for voice (1-4)
    pub top_k: usize,
    /// Minimum similarity score (0.0 - 1.0)
    pub min_score: f32,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_score: 0.0,
        }
    }
}

impl RetrieveOptions {
    /// Set top_k
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

/// Retrieved context document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document content
    pub text: String,
    /// Relevance score (0.0 - 1.0)
    pub score: f32,
    /// Document metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Document {
    /// Create a new document
    pub fn new(text: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            score,
            metadata: HashMap::new(),
        }
    }

    /// Add metadata
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
