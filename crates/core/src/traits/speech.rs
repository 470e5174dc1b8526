//! Speech processing traits

use crate::audio::AudioFrame;
use crate::transcript::TranscriptResult;
use crate::Result;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed audio frame stream fed to STT
pub type AudioFrameStream = Pin<Box<dyn Stream<Item = AudioFrame> + Send + 'static>>;

/// Boxed transcript stream produced by STT
pub type TranscriptStream = Pin<Box<dyn Stream<Item = Result<TranscriptResult>> + Send + 'static>>;

/// Boxed text-unit stream fed to TTS
pub type TextUnitStream = Pin<Box<dyn Stream<Item = String> + Send + 'static>>;

/// Boxed audio-chunk stream produced by TTS
pub type AudioChunkStream = Pin<Box<dyn Stream<Item = Result<Arc<[u8]>>> + Send + 'static>>;

/// Per-frame speech probability model.
///
/// The hysteresis and hangover logic that turns probabilities into
/// speech-start/speech-end events lives in the engine's VAD gate; the
/// classifier only scores frames.
#[async_trait]
pub trait SpeechClassifier: Send + Sync + 'static {
    /// Probability of speech in this frame (0.0 to 1.0)
    async fn speech_probability(&self, frame: &AudioFrame) -> Result<f32>;

    /// Reset internal state between utterances or sessions
    fn reset(&self) {}

    /// Model info for logging
    fn model_info(&self) -> &str;
}

/// Speech-to-Text interface.
///
/// The provider consumes a frame stream and produces partial transcripts
/// followed by finals; a final is the provider's commitment to a hypothesis
/// for a region of audio and must be signalled at utterance end.
pub trait SpeechToText: Send + Sync + 'static {
    /// Stream transcription as audio arrives.
    ///
    /// Errors end the stream and are fatal to the current STT session.
    fn transcribe_stream(&self, audio: AudioFrameStream) -> TranscriptStream;

    /// Model name for logging
    fn model_name(&self) -> &str;
}

/// Text-to-Speech interface.
///
/// Consumes text units and produces opaque audio chunks at the provider's
/// declared sample rate and encoding, in synthesis order.
pub trait TextToSpeech: Send + Sync + 'static {
    /// Stream synthesis unit-by-unit
    fn synthesize_stream(&self, text: TextUnitStream) -> AudioChunkStream;

    /// Output sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Model name for logging
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleRate;
    use futures::StreamExt;

    struct MockClassifier;

    #[async_trait]
    impl SpeechClassifier for MockClassifier {
        async fn speech_probability(&self, frame: &AudioFrame) -> Result<f32> {
            Ok(if frame.rms() > 0.1 { 0.9 } else { 0.1 })
        }

        fn model_info(&self) -> &str {
            "mock-classifier"
        }
    }

    struct MockStt;

    impl SpeechToText for MockStt {
        fn transcribe_stream(&self, audio: AudioFrameStream) -> TranscriptStream {
            Box::pin(audio.map(|_| Ok(TranscriptResult::partial("..."))))
        }

        fn model_name(&self) -> &str {
            "mock-stt"
        }
    }

    #[tokio::test]
    async fn test_mock_classifier() {
        let classifier = MockClassifier;
        let silence = AudioFrame::new(vec![0u8; 640], SampleRate::Hz16000);
        let prob = classifier.speech_probability(&silence).await.unwrap();
        assert!(prob < 0.5);
    }

    #[tokio::test]
    async fn test_mock_stt_stream() {
        let stt = MockStt;
        let frames = futures::stream::iter(vec![
            AudioFrame::new(vec![0u8; 640], SampleRate::Hz16000),
            AudioFrame::new(vec![0u8; 640], SampleRate::Hz16000),
        ]);
        let transcripts: Vec<_> = stt.transcribe_stream(Box::pin(frames)).collect().await;
        assert_eq!(transcripts.len(), 2);
    }
}
