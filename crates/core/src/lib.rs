//! Core traits and types for the voice turn engine
//!
//! This crate provides the foundational types used across all other crates:
//! - Audio frame type (PCM16 byte payloads)
//! - Transcript and VAD event types
//! - Egress message union delivered to the transport
//! - Turn telemetry state
//! - LLM request/response types
//! - Conversation history records
//! - Provider traits (VAD, STT, TTS, LLM, retrieval, response generation)
//! - Error types

pub mod audio;
pub mod conversation;
pub mod error;
pub mod events;
pub mod llm_types;
pub mod telemetry;
pub mod traits;
pub mod transcript;

pub use audio::{AudioFrame, SampleRate};
pub use conversation::{HistoryMessage, TurnRole};
pub use error::{Error, Result};
pub use events::{EgressMessage, VadEvent, VadLabel};
pub use llm_types::{FinishReason, GenerateRequest, GenerateResponse, Message, Role, StreamChunk};
pub use telemetry::TurnState;
pub use transcript::TranscriptResult;

pub use traits::{
    Document, LanguageModel, ResponseChunk, ResponseGenerator, RetrieveOptions, Retriever,
    SpeechClassifier, SpeechToText, TextToSpeech,
};
