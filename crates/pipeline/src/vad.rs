//! VAD gate
//!
//! Turns per-frame speech probabilities into speech-start/speech-end events
//! with hysteresis: a rising edge fires immediately, a falling edge only
//! after the configured hangover of continuous sub-threshold audio.

use parking_lot::Mutex;
use std::sync::Arc;

use voice_loop_config::VadGateConfig;
use voice_loop_core::{AudioFrame, SpeechClassifier, VadEvent};

#[derive(Default)]
struct GateState {
    triggered: bool,
    probability: f32,
    silence_ms: f64,
}

/// Stateful speech boundary detector over a frame stream
pub struct VadGate {
    classifier: Arc<dyn SpeechClassifier>,
    config: VadGateConfig,
    state: Mutex<GateState>,
}

impl VadGate {
    pub fn new(classifier: Arc<dyn SpeechClassifier>, config: VadGateConfig) -> Self {
        Self {
            classifier,
            config,
            state: Mutex::new(GateState::default()),
        }
    }

    /// Classify one frame and return zero or more boundary events.
    ///
    /// Classifier failures are non-fatal: the frame yields no event.
    pub async fn push(&self, frame: &AudioFrame) -> Vec<VadEvent> {
        let probability = match self.classifier.speech_probability(frame).await {
            Ok(p) => p.clamp(0.0, 1.0),
            Err(e) => {
                tracing::warn!(error = %e, "VAD classification failed, frame skipped");
                return Vec::new();
            }
        };

        let frame_ms = frame.duration().as_secs_f64() * 1000.0;
        let mut state = self.state.lock();
        state.probability = probability;

        let mut events = Vec::new();
        if probability >= self.config.threshold {
            state.silence_ms = 0.0;
            if !state.triggered {
                state.triggered = true;
                tracing::debug!(probability, "speech onset");
                events.push(VadEvent::SpeechStart { probability });
            }
        } else if state.triggered {
            state.silence_ms += frame_ms;
            if state.silence_ms >= self.config.hangover_ms as f64 {
                state.triggered = false;
                state.silence_ms = 0.0;
                tracing::debug!(probability, "end of speech after hangover");
                events.push(VadEvent::SpeechEnd { probability });
            }
        }
        events
    }

    /// Is the gate currently inside a speech segment?
    pub fn triggered(&self) -> bool {
        self.state.lock().triggered
    }

    /// Probability reported for the most recent frame
    pub fn current_probability(&self) -> f32 {
        self.state.lock().probability
    }

    /// Reset gate and classifier state
    pub fn reset(&self) {
        *self.state.lock() = GateState::default();
        self.classifier.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use voice_loop_core::{Error, Result, SampleRate};

    struct ScriptedClassifier {
        script: Mutex<VecDeque<Result<f32>>>,
    }

    impl ScriptedClassifier {
        fn new(script: Vec<Result<f32>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
            })
        }
    }

    #[async_trait]
    impl SpeechClassifier for ScriptedClassifier {
        async fn speech_probability(&self, _frame: &AudioFrame) -> Result<f32> {
            self.script
                .lock()
                .pop_front()
                .unwrap_or(Ok(0.0))
        }

        fn model_info(&self) -> &str {
            "scripted"
        }
    }

    fn frame_20ms() -> AudioFrame {
        AudioFrame::new(vec![0u8; 640], SampleRate::Hz16000)
    }

    fn gate_with(script: Vec<Result<f32>>, hangover_ms: u64) -> VadGate {
        VadGate::new(
            ScriptedClassifier::new(script),
            VadGateConfig {
                threshold: 0.5,
                hangover_ms,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_rising_edge_fires_once() {
        let gate = gate_with(vec![Ok(0.9), Ok(0.9)], 100);
        let frame = frame_20ms();

        let events = gate.push(&frame).await;
        assert_eq!(events, vec![VadEvent::SpeechStart { probability: 0.9 }]);
        assert!(gate.triggered());

        // Continued speech produces no further events
        assert!(gate.push(&frame).await.is_empty());
    }

    #[tokio::test]
    async fn test_hangover_delays_speech_end() {
        // 60ms hangover = 3 frames of 20ms silence
        let mut script = vec![Ok(0.9)];
        script.extend((0..3).map(|_| Ok(0.1)));
        let gate = gate_with(script, 60);
        let frame = frame_20ms();

        gate.push(&frame).await;
        assert!(gate.push(&frame).await.is_empty());
        assert!(gate.push(&frame).await.is_empty());
        let events = gate.push(&frame).await;
        assert_eq!(events, vec![VadEvent::SpeechEnd { probability: 0.1 }]);
        assert!(!gate.triggered());
    }

    #[tokio::test]
    async fn test_speech_resets_hangover() {
        // silence, silence, speech, silence, silence: no SpeechEnd (60ms hangover)
        let script = vec![Ok(0.9), Ok(0.1), Ok(0.1), Ok(0.9), Ok(0.1), Ok(0.1)];
        let gate = gate_with(script, 60);
        let frame = frame_20ms();

        for _ in 0..5 {
            gate.push(&frame).await;
        }
        assert!(gate.push(&frame).await.is_empty());
        assert!(gate.triggered());
    }

    #[tokio::test]
    async fn test_classifier_error_yields_no_event() {
        let gate = gate_with(vec![Err(Error::provider("model crashed")), Ok(0.9)], 100);
        let frame = frame_20ms();

        assert!(gate.push(&frame).await.is_empty());
        assert!(!gate.triggered());

        let events = gate.push(&frame).await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_reset() {
        let gate = gate_with(vec![Ok(0.9)], 100);
        gate.push(&frame_20ms()).await;
        assert!(gate.triggered());

        gate.reset();
        assert!(!gate.triggered());
        assert_eq!(gate.current_probability(), 0.0);
    }
}
