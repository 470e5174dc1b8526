//! VAD events and the egress message union

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::telemetry::TurnState;

/// Coarse VAD label reported to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VadLabel {
    Speaking,
    #[default]
    Silence,
}

/// Edge events produced by the VAD gate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VadEvent {
    /// Speech onset (triggered flag rose)
    SpeechStart {
        /// Speech probability at the edge
        probability: f32,
    },
    /// End of speech, after the configured hangover of silence
    SpeechEnd {
        /// Speech probability at the edge
        probability: f32,
    },
}

/// Messages delivered to the transport, in order.
///
/// The transport layer owns wire encoding; the engine guarantees ordering of
/// these messages relative to the events that produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum EgressMessage {
    /// Throttled VAD status for UI updates, with a telemetry snapshot
    VadUpdate {
        energy: f32,
        state: VadLabel,
        telemetry: TurnState,
    },
    /// User speech onset
    SpeechStart,
    /// User speech end
    SpeechEnd,
    /// STT hypothesis update
    TranscriptUpdate { text: String, is_final: bool },
    /// Agent started working on a response
    BotRespondingStart,
    /// Agent finished the response turn
    BotRespondingEnd,
    /// Raw assistant text as generated; the last event of a turn carries
    /// `is_complete == true` with empty text
    AssistantResponse { text: String, is_complete: bool },
    /// Synthesized audio for playback
    AudioChunk { data: Arc<[u8]> },
    /// No further audio will arrive for the current turn
    AudioStreamEnd,
    /// The transport must discard any buffered agent audio
    Interrupt,
    /// The in-flight response was cancelled by user speech
    BotResponseInterrupted,
    /// Full telemetry snapshot for the current turn
    TelemetryUpdate(TurnState),
    /// User-visible error
    Error { message: String },
}

impl EgressMessage {
    /// Is this message part of the agent's audio stream?
    pub fn is_audio(&self) -> bool {
        matches!(self, EgressMessage::AudioChunk { .. })
    }

    /// Short tag for logging
    pub fn kind(&self) -> &'static str {
        match self {
            EgressMessage::VadUpdate { .. } => "vad_update",
            EgressMessage::SpeechStart => "speech_start",
            EgressMessage::SpeechEnd => "speech_end",
            EgressMessage::TranscriptUpdate { .. } => "transcript_update",
            EgressMessage::BotRespondingStart => "bot_responding_start",
            EgressMessage::BotRespondingEnd => "bot_responding_end",
            EgressMessage::AssistantResponse { .. } => "assistant_response",
            EgressMessage::AudioChunk { .. } => "audio_chunk",
            EgressMessage::AudioStreamEnd => "audio_stream_end",
            EgressMessage::Interrupt => "interrupt",
            EgressMessage::BotResponseInterrupted => "bot_response_interrupted",
            EgressMessage::TelemetryUpdate(_) => "telemetry_update",
            EgressMessage::Error { .. } => "error",
        }
    }
}
