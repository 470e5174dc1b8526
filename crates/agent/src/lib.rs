//! Chat service and session lifecycle
//!
//! - [`ChatService`]: retrieval, prompt construction, and LLM streaming
//!   behind the engine's `ResponseGenerator` seam
//! - [`ConversationStore`]: per-session history with a soft cap
//! - [`VoiceSession`] / [`SessionManager`]: wiring and lifecycle of the
//!   per-session engine tasks

mod chat;
mod history;
mod session;

use thiserror::Error;

pub use chat::{ChatConfig, ChatService};
pub use history::ConversationStore;
pub use session::{ProviderSet, SessionManager, VoiceSession};

/// Agent-level errors
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] voice_loop_config::ConfigError),

    #[error("invalid session config: {0}")]
    InvalidConfig(String),

    #[error("session stopped")]
    SessionStopped,

    #[error("max sessions reached")]
    Capacity,
}

impl From<voice_loop_pipeline::PipelineError> for AgentError {
    fn from(e: voice_loop_pipeline::PipelineError) -> Self {
        match e {
            voice_loop_pipeline::PipelineError::EngineStopped => AgentError::SessionStopped,
        }
    }
}
