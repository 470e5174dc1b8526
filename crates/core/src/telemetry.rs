//! Per-turn telemetry state
//!
//! Tracks the progress flags and timestamps of the current conversation turn.
//! The flags reset at the beginning of a new turn (when speech is detected).

use serde::{Deserialize, Serialize};

use crate::events::VadLabel;

/// Progress flags and real-time data for the current conversation turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnState {
    // Progress flags
    pub vad_speech_detected: bool,
    pub vad_end_of_speech_detected: bool,
    pub stt_streaming_started: bool,
    pub stt_streaming_ended: bool,
    pub llm_streaming_started: bool,
    pub llm_streaming_ended: bool,
    pub tts_streaming_started: bool,
    pub tts_streaming_ended: bool,
    pub egress_started: bool,
    pub egress_ended: bool,

    // Timestamps (Unix epoch seconds)
    pub vad_end_of_speech_detected_time: Option<f64>,
    pub egress_started_time: Option<f64>,

    // Continuous VAD data (not reset between turns)
    pub vad_energy: f32,
    pub vad_state: VadLabel,

    // Derived metrics
    /// Delay between end of user speech and first agent audio, in seconds.
    /// The headline number for user-perceived responsiveness.
    pub agent_response_delay: Option<f64>,
}

impl TurnState {
    /// Reset all flags and metrics for a new turn.
    ///
    /// `vad_energy` and `vad_state` are continuous and survive the reset.
    pub fn reset(&mut self) {
        let vad_energy = self.vad_energy;
        let vad_state = self.vad_state;
        *self = Self {
            vad_energy,
            vad_state,
            ..Self::default()
        };
    }

    /// Recompute derived metrics from the recorded timestamps
    pub fn calculate_metrics(&mut self) {
        if let (Some(started), Some(speech_end)) =
            (self.egress_started_time, self.vad_end_of_speech_detected_time)
        {
            self.agent_response_delay = Some(started - speech_end);
        }
    }
}
