//! Per-session turn engine
//!
//! The engine mediates a live conversation between a speaker and a chain of
//! external providers (VAD, STT, LLM, TTS):
//!
//! ```text
//! audio in -> AudioIngress -> { VadGate, SttAudioQueue }
//!                                  |            |
//!                             VAD events   SttStreamer -> transcripts
//!                                  \            /
//!                                 TurnController (state machine)
//!                                       |
//!                               GenerationTask -> TextBuffer -> TtsStreamer
//!                                       |                           |
//!                                       +--------- Egress <---------+
//! ```
//!
//! The controller's event queue is the single serialization point: every
//! state-mutating event is posted there and processed one at a time, so the
//! engine is free of data races regardless of how many upstream tasks post
//! concurrently.

pub mod buffering;
pub mod controller;
pub mod egress;
mod generation;
pub mod ingress;
pub mod stt;
pub mod telemetry;
mod tts;
pub mod vad;

use thiserror::Error;

pub use buffering::TextBuffer;
pub use controller::{AgentState, EngineEvent, TurnController};
pub use egress::Egress;
pub use ingress::{AudioIngress, SttAudioQueue};
pub use stt::SttStreamer;
pub use telemetry::TelemetryHandle;
pub use vad::VadGate;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The controller has stopped and no longer accepts events
    #[error("engine stopped")]
    EngineStopped,
}
