//! Turn telemetry
//!
//! A shared handle over the current turn's [`TurnState`]. Every mutation that
//! changes a flag pushes a `telemetry_update` snapshot to the egress, so the
//! client always sees the latest turn progress.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use voice_loop_core::{EgressMessage, TurnState, VadLabel};

use crate::egress::Egress;

fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Cloneable handle to the session's turn telemetry
#[derive(Clone)]
pub struct TelemetryHandle {
    state: Arc<Mutex<TurnState>>,
    egress: Egress,
}

impl TelemetryHandle {
    pub fn new(egress: Egress) -> Self {
        Self {
            state: Arc::new(Mutex::new(TurnState::default())),
            egress,
        }
    }

    /// Current snapshot of the turn state
    pub fn snapshot(&self) -> TurnState {
        self.state.lock().clone()
    }

    /// Update the continuous VAD fields; no egress push (frames are frequent)
    pub fn set_vad(&self, energy: f32, speaking: bool) {
        let mut state = self.state.lock();
        state.vad_energy = energy;
        state.vad_state = if speaking {
            VadLabel::Speaking
        } else {
            VadLabel::Silence
        };
    }

    /// Reset for a new turn and mark speech detected
    pub async fn begin_turn(&self) {
        {
            let mut state = self.state.lock();
            state.reset();
            state.vad_speech_detected = true;
        }
        self.push_update().await;
    }

    /// Mark end of user speech and stamp its timestamp
    pub async fn mark_end_of_speech(&self) {
        {
            let mut state = self.state.lock();
            state.vad_end_of_speech_detected = true;
            state.vad_end_of_speech_detected_time = Some(epoch_seconds());
        }
        self.push_update().await;
    }

    /// Clear the generation-side flags at turn dispatch
    pub async fn reset_generation_flags(&self) {
        {
            let mut state = self.state.lock();
            state.llm_streaming_started = false;
            state.llm_streaming_ended = false;
            state.tts_streaming_started = false;
            state.tts_streaming_ended = false;
            state.egress_started = false;
            state.egress_ended = false;
        }
        self.push_update().await;
    }

    pub async fn mark_stt_started(&self) {
        self.set_once(|s| &mut s.stt_streaming_started).await;
    }

    pub async fn mark_stt_ended(&self) {
        self.set_once(|s| &mut s.stt_streaming_ended).await;
    }

    pub async fn mark_llm_started(&self) {
        self.set_once(|s| &mut s.llm_streaming_started).await;
    }

    pub async fn mark_llm_ended(&self) {
        self.set_once(|s| &mut s.llm_streaming_ended).await;
    }

    pub async fn mark_tts_started(&self) {
        self.set_once(|s| &mut s.tts_streaming_started).await;
    }

    pub async fn mark_tts_ended(&self) {
        self.set_once(|s| &mut s.tts_streaming_ended).await;
    }

    /// Mark first agent audio delivered; stamps the timestamp and recomputes
    /// the response delay
    pub async fn mark_egress_started(&self) {
        let changed = {
            let mut state = self.state.lock();
            if state.egress_started {
                false
            } else {
                state.egress_started = true;
                state.egress_started_time = Some(epoch_seconds());
                state.calculate_metrics();
                true
            }
        };
        if changed {
            self.push_update().await;
        }
    }

    pub async fn mark_egress_ended(&self) {
        self.set_once(|s| &mut s.egress_ended).await;
    }

    async fn set_once(&self, field: impl FnOnce(&mut TurnState) -> &mut bool) {
        let changed = {
            let mut state = self.state.lock();
            let flag = field(&mut state);
            if *flag {
                false
            } else {
                *flag = true;
                true
            }
        };
        if changed {
            self.push_update().await;
        }
    }

    async fn push_update(&self) {
        let snapshot = self.snapshot();
        self.egress
            .send(EgressMessage::TelemetryUpdate(snapshot))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_flags_push_once() {
        let egress = Egress::new(16);
        let telemetry = TelemetryHandle::new(egress.clone());

        telemetry.mark_llm_started().await;
        telemetry.mark_llm_started().await;

        // Only the first call changes the flag, so only one update is pushed
        assert_eq!(egress.len(), 1);
        assert!(telemetry.snapshot().llm_streaming_started);
    }

    #[tokio::test]
    async fn test_response_delay_computed() {
        let egress = Egress::new(16);
        let telemetry = TelemetryHandle::new(egress.clone());

        telemetry.begin_turn().await;
        telemetry.mark_end_of_speech().await;
        telemetry.mark_egress_started().await;

        let snapshot = telemetry.snapshot();
        let delay = snapshot.agent_response_delay.unwrap();
        assert!(delay >= 0.0);
    }

    #[tokio::test]
    async fn test_begin_turn_resets_flags() {
        let egress = Egress::new(16);
        let telemetry = TelemetryHandle::new(egress.clone());

        telemetry.mark_llm_started().await;
        telemetry.begin_turn().await;

        let snapshot = telemetry.snapshot();
        assert!(snapshot.vad_speech_detected);
        assert!(!snapshot.llm_streaming_started);
    }
}
