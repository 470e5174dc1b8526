//! Language model trait

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::llm_types::{GenerateRequest, GenerateResponse, StreamChunk};
use crate::Result;

/// Boxed token stream produced by a language model
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send + 'static>>;

/// Language model interface.
///
/// Chunks are yielded in generation order; the engine depends on strict
/// ordering and performs no reassembly.
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Generate a full completion
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse>;

    /// Stream tokens as generated.
    ///
    /// Lower latency than `generate()`; the final chunk carries
    /// `is_final == true` and a finish reason.
    fn generate_stream(&self, request: GenerateRequest) -> TokenStream;

    /// Check if the model/backend is reachable
    async fn is_available(&self) -> bool;

    /// Model name for logging
    fn model_name(&self) -> &str;

    /// Context window size in tokens
    fn context_size(&self) -> usize {
        4096
    }
}
