//! Session lifecycle
//!
//! A [`VoiceSession`] wires the per-session engine together: VAD gate and
//! audio ingress, the STT streamer, the turn controller, and the chat stack
//! behind it. The [`SessionManager`] tracks active sessions, enforces a
//! capacity limit, and expires idle sessions.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use voice_loop_config::SessionConfig;
use voice_loop_core::{
    AudioFrame, LanguageModel, Retriever, SampleRate, SpeechClassifier, SpeechToText, TextToSpeech,
};
use voice_loop_pipeline::{
    AgentState, AudioIngress, Egress, EngineEvent, SttAudioQueue, SttStreamer, TelemetryHandle,
    TurnController, VadGate,
};
use voice_loop_rag::CachedRetriever;

use crate::chat::{ChatConfig, ChatService};
use crate::history::ConversationStore;
use crate::AgentError;

/// Provider handles resolved for a session by the configuration layer
#[derive(Clone)]
pub struct ProviderSet {
    pub classifier: Arc<dyn SpeechClassifier>,
    pub stt: Arc<dyn SpeechToText>,
    pub tts: Arc<dyn TextToSpeech>,
    pub llm: Arc<dyn LanguageModel>,
    pub retriever: Option<Arc<dyn Retriever>>,
}

/// One live conversation
pub struct VoiceSession {
    id: String,
    sample_rate: SampleRate,
    ingress: AudioIngress,
    egress: Egress,
    events: mpsc::Sender<EngineEvent>,
    state: watch::Receiver<AgentState>,
    stt_queue: Arc<SttAudioQueue>,
    controller_task: Mutex<Option<JoinHandle<()>>>,
    stt_task: Mutex<Option<JoinHandle<()>>>,
    created_at: Instant,
    last_activity: RwLock<Instant>,
    active: RwLock<bool>,
}

impl VoiceSession {
    /// Create a session and start its engine tasks
    pub fn new(
        id: impl Into<String>,
        config: SessionConfig,
        providers: ProviderSet,
    ) -> Result<Self, AgentError> {
        config.validate()?;
        let id = id.into();
        let sample_rate = SampleRate::from_hz(config.ingress_sample_rate_hz).ok_or_else(|| {
            AgentError::InvalidConfig(format!(
                "unsupported ingress sample rate {} Hz",
                config.ingress_sample_rate_hz
            ))
        })?;

        let egress = Egress::new(config.queues.egress);
        let telemetry = TelemetryHandle::new(egress.clone());

        let history = Arc::new(ConversationStore::new(config.history_max_messages));
        let retriever: Option<Arc<dyn Retriever>> = providers.retriever.map(|inner| {
            Arc::new(CachedRetriever::new(inner, config.retrieval.cache_ttl()))
                as Arc<dyn Retriever>
        });
        let chat = Arc::new(ChatService::new(
            providers.llm,
            retriever,
            history,
            ChatConfig::from(&config),
        ));

        let (controller, events, state) = TurnController::new(
            &id,
            config.clone(),
            chat,
            providers.tts,
            egress.clone(),
            telemetry.clone(),
        );

        let stt_queue = Arc::new(SttAudioQueue::new(config.queues.stt_audio));
        let gate = VadGate::new(providers.classifier, config.vad.clone());
        let ingress = AudioIngress::new(
            gate,
            Arc::clone(&stt_queue),
            events.clone(),
            egress.clone(),
            telemetry,
            config.vad.update_every_frames,
        );

        let controller_task = controller.spawn();
        let stt_task = SttStreamer::new(
            Arc::clone(&stt_queue),
            providers.stt,
            events.clone(),
            egress.clone(),
        )
        .spawn();

        tracing::info!(session_id = %id, agent_id = ?config.agent_id, "session started");

        Ok(Self {
            id,
            sample_rate,
            ingress,
            egress,
            events,
            state,
            stt_queue,
            controller_task: Mutex::new(Some(controller_task)),
            stt_task: Mutex::new(Some(stt_task)),
            created_at: Instant::now(),
            last_activity: RwLock::new(Instant::now()),
            active: RwLock::new(true),
        })
    }

    /// Session id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Feed one raw PCM16 chunk from the transport
    pub async fn push_audio(&self, pcm: impl Into<Arc<[u8]>>) -> Result<(), AgentError> {
        self.touch();
        let frame = AudioFrame::new(pcm, self.sample_rate);
        self.ingress.push_frame(frame).await.map_err(AgentError::from)
    }

    /// Egress handle for the transport to drain
    pub fn egress(&self) -> Egress {
        self.egress.clone()
    }

    /// Current controller state
    pub fn state(&self) -> AgentState {
        *self.state.borrow()
    }

    /// A watch on controller state transitions
    pub fn state_watch(&self) -> watch::Receiver<AgentState> {
        self.state.clone()
    }

    /// Client-initiated interrupt of the in-flight response
    pub async fn post_interrupt(&self) -> Result<(), AgentError> {
        self.events
            .send(EngineEvent::Interrupt)
            .await
            .map_err(|_| AgentError::SessionStopped)
    }

    /// Frames dropped from the STT queue so far
    pub fn dropped_frames(&self) -> u64 {
        self.ingress.dropped_frames()
    }

    /// Stop the session: close the queues, stop the engine tasks, close egress
    pub async fn stop(&self) {
        {
            let mut active = self.active.write();
            if !*active {
                return;
            }
            *active = false;
        }

        self.stt_queue.close();
        let _ = self.events.send(EngineEvent::Shutdown).await;

        let controller = self.controller_task.lock().take();
        if let Some(task) = controller {
            let _ = task.await;
        }
        if let Some(task) = self.stt_task.lock().take() {
            task.abort();
        }
        tracing::info!(session_id = %self.id, "session stopped");
    }

    /// Update the last-activity marker
    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    /// Has the session been idle longer than `timeout`?
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.read().elapsed() > timeout
    }

    /// Is the session running?
    pub fn is_active(&self) -> bool {
        *self.active.read()
    }

    /// Session age
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Tracks active sessions
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<VoiceSession>>>,
    max_sessions: usize,
    session_timeout: Duration,
    cleanup_interval: Duration,
}

impl SessionManager {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            session_timeout: Duration::from_secs(3600),
            cleanup_interval: Duration::from_secs(300),
        }
    }

    pub fn with_config(
        max_sessions: usize,
        session_timeout: Duration,
        cleanup_interval: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            session_timeout,
            cleanup_interval,
        }
    }

    /// Create and register a new session
    pub fn create(
        &self,
        config: SessionConfig,
        providers: ProviderSet,
    ) -> Result<Arc<VoiceSession>, AgentError> {
        let mut sessions = self.sessions.write();
        if sessions.len() >= self.max_sessions {
            return Err(AgentError::Capacity);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(VoiceSession::new(&id, config, providers)?);
        sessions.insert(id, Arc::clone(&session));
        Ok(session)
    }

    /// Get a session by id
    pub fn get(&self, id: &str) -> Option<Arc<VoiceSession>> {
        self.sessions.read().get(id).cloned()
    }

    /// Stop and remove a session
    pub async fn remove(&self, id: &str) {
        let session = self.sessions.write().remove(id);
        if let Some(session) = session {
            session.stop().await;
            tracing::info!(session_id = %id, "removed session");
        }
    }

    /// Stop and remove sessions idle beyond the timeout
    pub async fn cleanup_expired(&self) {
        let expired: Vec<String> = {
            let sessions = self.sessions.read();
            sessions
                .iter()
                .filter(|(_, s)| s.is_expired(self.session_timeout))
                .map(|(id, _)| id.clone())
                .collect()
        };
        for id in expired {
            self.remove(&id).await;
            tracing::info!(session_id = %id, "expired session");
        }
    }

    /// Start a background task that periodically removes expired sessions.
    ///
    /// Returns a shutdown sender used to stop the task.
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = Arc::clone(self);
        let interval = manager.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let before = manager.count();
                        manager.cleanup_expired().await;
                        let after = manager.count();
                        if before != after {
                            tracing::info!(
                                removed = before - after,
                                remaining = after,
                                "session cleanup pass"
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("session cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    /// Active session count
    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// All session ids
    pub fn list(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }
}
