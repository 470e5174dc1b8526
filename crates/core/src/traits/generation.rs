//! Response generation trait
//!
//! The seam between the turn engine and the chat stack (retrieval, prompt
//! construction, LLM streaming). The engine dispatches a turn's user text and
//! consumes a chunk stream; everything behind the seam is replaceable.

use futures::Stream;
use std::pin::Pin;

/// One element of a response stream
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseChunk {
    /// The first token of the response, for latency accounting
    FirstToken { content: String },
    /// A subsequent token
    Chunk { content: String },
    /// The response finished normally
    Complete,
    /// The response failed; `message` is user-visible
    Error { message: String },
}

/// Boxed response chunk stream
pub type ResponseStream = Pin<Box<dyn Stream<Item = ResponseChunk> + Send + 'static>>;

/// Produces a streamed response for a dispatched user turn.
///
/// Implementations must yield chunks in order, ending with exactly one
/// `Complete` or `Error`.
pub trait ResponseGenerator: Send + Sync + 'static {
    /// Stream the response for `text` within the given session
    fn respond_stream(&self, session_id: &str, text: &str) -> ResponseStream;

    /// Generator name for logging
    fn name(&self) -> &str;
}
