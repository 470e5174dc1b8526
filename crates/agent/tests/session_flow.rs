//! Integration tests for session wiring (audio in -> response out)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::time::timeout;

use voice_loop_agent::{AgentError, ProviderSet, SessionManager, VoiceSession};
use voice_loop_config::SessionConfig;
use voice_loop_core::traits::llm::TokenStream;
use voice_loop_core::traits::speech::{
    AudioChunkStream, AudioFrameStream, TextUnitStream, TranscriptStream,
};
use voice_loop_core::{
    AudioFrame, Document, EgressMessage, FinishReason, GenerateRequest, GenerateResponse,
    LanguageModel, Result as CoreResult, RetrieveOptions, Retriever, SpeechClassifier,
    SpeechToText, StreamChunk, TextToSpeech, TranscriptResult,
};
use voice_loop_pipeline::AgentState;

struct ByteClassifier;

#[async_trait]
impl SpeechClassifier for ByteClassifier {
    async fn speech_probability(&self, frame: &AudioFrame) -> CoreResult<f32> {
        Ok(if frame.data.first().copied().unwrap_or(0) != 0 {
            0.9
        } else {
            0.05
        })
    }

    fn model_info(&self) -> &str {
        "byte-classifier"
    }
}

struct ThresholdStt;

impl SpeechToText for ThresholdStt {
    fn transcribe_stream(&self, audio: AudioFrameStream) -> TranscriptStream {
        Box::pin(async_stream::stream! {
            let mut audio = audio;
            let mut speech_frames = 0usize;
            let mut emitted = false;
            while let Some(frame) = audio.next().await {
                if frame.data.first().copied().unwrap_or(0) != 0 {
                    speech_frames += 1;
                }
                if !emitted && speech_frames >= 5 {
                    emitted = true;
                    yield Ok(TranscriptResult::final_text("when do you open"));
                }
            }
        })
    }

    fn model_name(&self) -> &str {
        "threshold-stt"
    }
}

struct OneChunkTts;

impl TextToSpeech for OneChunkTts {
    fn synthesize_stream(&self, text: TextUnitStream) -> AudioChunkStream {
        Box::pin(async_stream::stream! {
            let mut text = text;
            let mut any = false;
            while text.next().await.is_some() {
                any = true;
            }
            if any {
                yield Ok(vec![0xAAu8; 32].into());
            }
        })
    }

    fn sample_rate(&self) -> u32 {
        24_000
    }

    fn model_name(&self) -> &str {
        "one-chunk-tts"
    }
}

struct ScriptedLlm;

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn generate(&self, _request: GenerateRequest) -> CoreResult<GenerateResponse> {
        Ok(GenerateResponse::text("We open at nine."))
    }

    fn generate_stream(&self, _request: GenerateRequest) -> TokenStream {
        Box::pin(futures::stream::iter(vec![
            Ok(StreamChunk::text("We open ")),
            Ok(StreamChunk::text("at nine.")),
            Ok(StreamChunk::final_chunk(FinishReason::Stop)),
        ]))
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn model_name(&self) -> &str {
        "scripted-llm"
    }
}

struct StaticRetriever;

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(
        &self,
        _query: &str,
        _options: &RetrieveOptions,
    ) -> CoreResult<Vec<Document>> {
        Ok(vec![Document::new("Branches open at 9am.", 0.9)])
    }

    fn name(&self) -> &str {
        "static"
    }
}

fn providers() -> ProviderSet {
    ProviderSet {
        classifier: Arc::new(ByteClassifier),
        stt: Arc::new(ThresholdStt),
        tts: Arc::new(OneChunkTts),
        llm: Arc::new(ScriptedLlm),
        retriever: Some(Arc::new(StaticRetriever)),
    }
}

fn fast_vad_config() -> SessionConfig {
    let mut config = SessionConfig::default();
    config.vad.hangover_ms = 60;
    config
}

fn speech_frame() -> Vec<u8> {
    vec![1u8; 640]
}

fn silence_frame() -> Vec<u8> {
    vec![0u8; 640]
}

#[tokio::test]
async fn test_session_lifecycle() {
    let session = VoiceSession::new("lifecycle", SessionConfig::default(), providers()).unwrap();

    assert_eq!(session.id(), "lifecycle");
    assert!(session.is_active());
    assert_eq!(session.state(), AgentState::Listening);
    assert!(!session.is_expired(Duration::from_secs(60)));
    assert!(session.age() < Duration::from_secs(60));
    assert_eq!(session.dropped_frames(), 0);

    session.stop().await;
    assert!(!session.is_active());

    // Egress closes once drained
    let egress = session.egress();
    let mut last = egress.recv().await;
    while last.is_some() {
        last = egress.recv().await;
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[tokio::test]
async fn test_audio_drives_a_full_turn() {
    init_tracing();
    let session =
        Arc::new(VoiceSession::new("full-turn", fast_vad_config(), providers()).unwrap());
    let egress = session.egress();

    for _ in 0..5 {
        session.push_audio(speech_frame()).await.unwrap();
    }
    for _ in 0..4 {
        session.push_audio(silence_frame()).await.unwrap();
    }

    let messages = timeout(Duration::from_secs(5), async {
        let mut seen = Vec::new();
        loop {
            match egress.recv().await {
                Some(EgressMessage::TelemetryUpdate(_)) | Some(EgressMessage::VadUpdate { .. }) => {}
                Some(message) => {
                    let end = matches!(message, EgressMessage::BotRespondingEnd);
                    seen.push(message);
                    if end {
                        break;
                    }
                }
                None => break,
            }
        }
        seen
    })
    .await
    .expect("turn did not complete");

    assert_eq!(messages.first(), Some(&EgressMessage::SpeechStart));
    assert!(messages.contains(&EgressMessage::TranscriptUpdate {
        text: "when do you open".into(),
        is_final: true,
    }));
    assert!(messages.contains(&EgressMessage::AssistantResponse {
        text: "We open ".into(),
        is_complete: false,
    }));
    assert!(messages.iter().any(|m| m.is_audio()));
    assert_eq!(messages.last(), Some(&EgressMessage::BotRespondingEnd));

    let mut state = session.state_watch();
    state
        .wait_for(|s| *s == AgentState::Listening)
        .await
        .unwrap();

    session.stop().await;
}

#[tokio::test]
async fn test_client_interrupt_signals() {
    let session =
        VoiceSession::new("client-interrupt", SessionConfig::default(), providers()).unwrap();
    let egress = session.egress();

    session.post_interrupt().await.unwrap();

    let mut seen = Vec::new();
    while seen.len() < 2 {
        match egress.recv().await {
            Some(EgressMessage::TelemetryUpdate(_)) | Some(EgressMessage::VadUpdate { .. }) => {}
            Some(message) => seen.push(message),
            None => break,
        }
    }
    assert_eq!(
        seen,
        vec![EgressMessage::Interrupt, EgressMessage::BotResponseInterrupted]
    );

    session.stop().await;
}

#[tokio::test]
async fn test_push_audio_after_stop_fails() {
    let session = VoiceSession::new("stopped", SessionConfig::default(), providers()).unwrap();
    session.stop().await;

    let result = session.push_audio(speech_frame()).await;
    assert!(matches!(result, Err(AgentError::SessionStopped)));
}

#[tokio::test]
async fn test_manager_capacity_limit() {
    let manager = SessionManager::new(1);
    let first = manager.create(SessionConfig::default(), providers());
    assert!(first.is_ok());

    let second = manager.create(SessionConfig::default(), providers());
    assert!(matches!(second, Err(AgentError::Capacity)));
}

#[tokio::test]
async fn test_manager_remove_stops_session() {
    let manager = SessionManager::new(4);
    let session = manager.create(SessionConfig::default(), providers()).unwrap();
    let id = session.id().to_string();

    manager.remove(&id).await;
    assert!(manager.get(&id).is_none());
    assert!(!session.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_task_removes_idle_sessions() {
    let manager = Arc::new(SessionManager::with_config(
        4,
        Duration::from_millis(0),
        Duration::from_millis(100),
    ));
    let session = manager.create(SessionConfig::default(), providers()).unwrap();
    let id = session.id().to_string();

    let shutdown = manager.start_cleanup_task();
    tokio::time::sleep(Duration::from_millis(250)).await;

    assert!(manager.get(&id).is_none());
    shutdown.send(true).unwrap();
}

#[tokio::test]
async fn test_manager_expiry_cleanup() {
    let manager = SessionManager::with_config(
        4,
        Duration::from_millis(0),
        Duration::from_secs(300),
    );
    let session = manager.create(SessionConfig::default(), providers()).unwrap();
    let id = session.id().to_string();

    // Idle beyond the zero timeout on the next cleanup pass
    tokio::time::sleep(Duration::from_millis(10)).await;
    manager.cleanup_expired().await;

    assert!(manager.get(&id).is_none());
    assert_eq!(manager.count(), 0);
}

#[tokio::test]
async fn test_invalid_sample_rate_rejected() {
    let mut config = SessionConfig::default();
    config.ingress_sample_rate_hz = 12_345;

    let result = VoiceSession::new("bad-rate", config, providers());
    assert!(matches!(result, Err(AgentError::InvalidConfig(_))));
}
