//! Error types shared across the workspace

use thiserror::Error;

/// Core error type for provider and engine failures
#[derive(Debug, Error)]
pub enum Error {
    /// An external provider call failed (STT, TTS, LLM, VAD, retrieval)
    #[error("provider error: {0}")]
    Provider(String),

    /// A stream or queue was closed before the operation completed
    #[error("stream closed")]
    StreamClosed,

    /// An operation exceeded its time budget
    #[error("timeout: {0}")]
    Timeout(String),

    /// Session-level failure
    #[error("session error: {0}")]
    Session(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for a provider error with context
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }
}

/// Result alias using the core error type
pub type Result<T> = std::result::Result<T, Error>;
