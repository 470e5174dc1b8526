//! Retrieval layer
//!
//! Retrieval is invoked once per turn on the user's dispatched text, so
//! repeated questions within a session are served from a short-TTL cache
//! instead of hitting the vector store again. The cache is session-local;
//! nothing is shared across sessions.

mod cache;
mod retriever;

pub use cache::RetrievalCache;
pub use retriever::CachedRetriever;
