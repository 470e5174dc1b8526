//! Turn controller
//!
//! The single serialization point for session state. All state-mutating
//! events are posted to the controller's queue and processed one at a time;
//! upstream and downstream tasks never touch session state directly.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use voice_loop_config::SessionConfig;
use voice_loop_core::{EgressMessage, ResponseGenerator, TextToSpeech, TranscriptResult};

use crate::egress::Egress;
use crate::generation::GenerationTask;
use crate::telemetry::TelemetryHandle;
use crate::tts::TtsStreamer;

/// Controller state; exactly one at any instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    /// Accumulating user speech
    Listening,
    /// Speech ended before any final transcript arrived
    WaitingForTranscript,
    /// Generation dispatched, no audio yet
    Thinking,
    /// Delivering agent audio
    Speaking,
}

/// Events consumed by the controller
#[derive(Debug)]
pub enum EngineEvent {
    /// VAD detected speech onset
    VadStart,
    /// VAD detected end of speech
    VadEnd,
    /// STT produced a hypothesis
    Transcript(TranscriptResult),
    /// Reserved; raw tokens flow through the generation task directly
    LlmToken(String),
    /// TTS produced an audio chunk for the current turn
    TtsChunk(Arc<[u8]>),
    /// The TTS stream for the current turn ended
    TtsFinished { error: Option<String> },
    /// Cancel the in-flight response and drain pending audio
    Interrupt,
    /// Notify the client that the response was interrupted
    BotResponseInterrupted,
    /// Synthetic: the wait-for-transcript window elapsed
    TranscriptTimeout { epoch: u64 },
    /// Stop the controller
    Shutdown,
}

struct ActiveTurn {
    generation: JoinHandle<()>,
    synthesis: JoinHandle<()>,
}

/// The session state machine
pub struct TurnController {
    session_id: String,
    config: SessionConfig,
    generator: Arc<dyn ResponseGenerator>,
    tts: Arc<dyn TextToSpeech>,
    egress: Egress,
    telemetry: TelemetryHandle,
    events_rx: mpsc::Receiver<EngineEvent>,
    events_tx: mpsc::Sender<EngineEvent>,
    state_tx: watch::Sender<AgentState>,
    state: AgentState,
    /// Confirmed final transcripts for the turn being accumulated
    transcript_buffer: Vec<String>,
    active: Option<ActiveTurn>,
    /// True from the first forwarded audio chunk until interrupt handling or
    /// the next dispatch; covers barge-in into buffered audio after the TTS
    /// stream itself has finished
    audio_pending: bool,
    waiting_epoch: u64,
}

impl TurnController {
    /// Build a controller; returns the event sender for producers and a
    /// watch on the controller state
    pub fn new(
        session_id: impl Into<String>,
        config: SessionConfig,
        generator: Arc<dyn ResponseGenerator>,
        tts: Arc<dyn TextToSpeech>,
        egress: Egress,
        telemetry: TelemetryHandle,
    ) -> (Self, mpsc::Sender<EngineEvent>, watch::Receiver<AgentState>) {
        let (events_tx, events_rx) = mpsc::channel(config.queues.events);
        let (state_tx, state_rx) = watch::channel(AgentState::Listening);
        let controller = Self {
            session_id: session_id.into(),
            config,
            generator,
            tts,
            egress,
            telemetry,
            events_rx,
            events_tx: events_tx.clone(),
            state_tx,
            state: AgentState::Listening,
            transcript_buffer: Vec::new(),
            active: None,
            audio_pending: false,
            waiting_epoch: 0,
        };
        (controller, events_tx, state_rx)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        tracing::info!(session_id = %self.session_id, "turn controller started");
        while let Some(event) = self.events_rx.recv().await {
            if !self.handle_event(event).await {
                break;
            }
        }
        self.abort_active();
        self.egress.close();
        tracing::info!(session_id = %self.session_id, "turn controller stopped");
    }

    /// Process one event; returns false on shutdown
    async fn handle_event(&mut self, event: EngineEvent) -> bool {
        match event {
            EngineEvent::VadStart => self.on_vad_start().await,
            EngineEvent::VadEnd => self.on_vad_end().await,
            EngineEvent::Transcript(transcript) => self.on_transcript(transcript).await,
            EngineEvent::LlmToken(token) => {
                tracing::trace!(len = token.len(), "llm token event ignored");
            }
            EngineEvent::TtsChunk(data) => self.on_tts_chunk(data).await,
            EngineEvent::TtsFinished { error } => self.on_tts_finished(error).await,
            EngineEvent::Interrupt => self.on_interrupt().await,
            EngineEvent::BotResponseInterrupted => {
                self.egress.send(EgressMessage::BotResponseInterrupted).await;
            }
            EngineEvent::TranscriptTimeout { epoch } => self.on_transcript_timeout(epoch),
            EngineEvent::Shutdown => return false,
        }
        true
    }

    fn set_state(&mut self, state: AgentState) {
        if self.state != state {
            tracing::debug!(session_id = %self.session_id, from = ?self.state, to = ?state, "state transition");
            self.state = state;
            let _ = self.state_tx.send(state);
        }
    }

    fn abort_active(&mut self) {
        if let Some(turn) = self.active.take() {
            turn.generation.abort();
            turn.synthesis.abort();
        }
    }

    /// Speech onset. Any onset is a potential barge-in: the TTS stream may
    /// have finished while buffered audio is still being delivered, so the
    /// check covers pending audio as well as live tasks.
    async fn on_vad_start(&mut self) {
        self.telemetry.begin_turn().await;
        if self.active.is_some() || self.audio_pending {
            tracing::info!(session_id = %self.session_id, "speech onset with response in flight, interrupting");
            self.on_interrupt().await;
        }
        self.set_state(AgentState::Listening);
        self.egress.send(EgressMessage::SpeechStart).await;
    }

    async fn on_vad_end(&mut self) {
        self.telemetry.mark_end_of_speech().await;
        self.egress.send(EgressMessage::SpeechEnd).await;

        if !self.transcript_buffer.is_empty() {
            self.dispatch_turn().await;
        } else {
            tracing::info!(session_id = %self.session_id, "speech ended with no transcript yet, waiting");
            self.set_state(AgentState::WaitingForTranscript);
            self.waiting_epoch += 1;
            let epoch = self.waiting_epoch;
            let events = self.events_tx.clone();
            let wait = self.config.timeouts.wait_for_transcript();
            tokio::spawn(async move {
                tokio::time::sleep(wait).await;
                let _ = events.send(EngineEvent::TranscriptTimeout { epoch }).await;
            });
        }
    }

    async fn on_transcript(&mut self, transcript: TranscriptResult) {
        if transcript.text.is_empty() {
            return;
        }
        self.telemetry.mark_stt_started().await;
        self.egress
            .send(EgressMessage::TranscriptUpdate {
                text: transcript.text.clone(),
                is_final: transcript.is_final,
            })
            .await;

        if transcript.is_final {
            self.telemetry.mark_stt_ended().await;
            self.transcript_buffer.push(transcript.text);
            if self.state == AgentState::WaitingForTranscript {
                tracing::info!(session_id = %self.session_id, "final transcript arrived while waiting");
                self.dispatch_turn().await;
            }
        }
    }

    fn on_transcript_timeout(&mut self, epoch: u64) {
        if self.state == AgentState::WaitingForTranscript && epoch == self.waiting_epoch {
            tracing::warn!(session_id = %self.session_id, "timed out waiting for transcript after end of speech");
            self.set_state(AgentState::Listening);
        }
    }

    /// Join accumulated finals and hand the turn to generation + synthesis
    async fn dispatch_turn(&mut self) {
        let text = self.transcript_buffer.join(" ");
        self.transcript_buffer.clear();
        self.waiting_epoch += 1;
        self.audio_pending = false;
        self.set_state(AgentState::Thinking);

        tracing::info!(session_id = %self.session_id, input = %text, "dispatching turn");
        self.telemetry.reset_generation_flags().await;
        self.egress.send(EgressMessage::BotRespondingStart).await;

        let (text_tx, text_rx) = mpsc::channel(self.config.queues.tts_text);
        let synthesis = TtsStreamer {
            tts: Arc::clone(&self.tts),
            text_rx,
            events: self.events_tx.clone(),
            telemetry: self.telemetry.clone(),
        }
        .spawn();
        let generation = GenerationTask {
            generator: Arc::clone(&self.generator),
            session_id: self.session_id.clone(),
            user_text: text,
            policy: self.config.buffer_policy,
            timeouts: self.config.timeouts.clone(),
            text_tx,
            egress: self.egress.clone(),
            telemetry: self.telemetry.clone(),
        }
        .spawn();
        self.active = Some(ActiveTurn {
            generation,
            synthesis,
        });
    }

    async fn on_tts_chunk(&mut self, data: Arc<[u8]>) {
        // A chunk can still be queued when its turn was just cancelled
        if self.active.is_none() {
            tracing::debug!(session_id = %self.session_id, "discarding audio chunk from a cancelled turn");
            return;
        }
        self.set_state(AgentState::Speaking);
        if !self.audio_pending {
            self.audio_pending = true;
            self.telemetry.mark_egress_started().await;
        }
        self.egress.send(EgressMessage::AudioChunk { data }).await;
    }

    async fn on_tts_finished(&mut self, error: Option<String>) {
        let Some(turn) = self.active.take() else {
            tracing::debug!(session_id = %self.session_id, "ignoring synthesis completion from a cancelled turn");
            return;
        };
        if error.is_some() {
            turn.generation.abort();
        }
        if let Some(message) = error {
            self.egress
                .send(EgressMessage::Error {
                    message: format!("Synthesis error: {message}"),
                })
                .await;
        }
        if self.audio_pending {
            self.telemetry.mark_egress_ended().await;
        }
        self.set_state(AgentState::Listening);
        self.egress.send(EgressMessage::AudioStreamEnd).await;
        self.egress.send(EgressMessage::BotRespondingEnd).await;
        metrics::counter!("voice_loop_turns_completed").increment(1);
    }

    /// Cancel the in-flight response: abort tasks, drain pending audio, and
    /// notify the client in the order `interrupt` then
    /// `bot_response_interrupted`. Does not wait for tasks to unwind; the
    /// queues close as their senders drop.
    async fn on_interrupt(&mut self) {
        self.set_state(AgentState::Listening);
        self.transcript_buffer.clear();
        self.abort_active();
        let cleared = self.egress.clear_audio();
        self.audio_pending = false;
        metrics::counter!("voice_loop_turns_interrupted").increment(1);
        tracing::info!(session_id = %self.session_id, cleared_audio = cleared, "response interrupted");
        self.egress.send(EgressMessage::Interrupt).await;
        self.egress.send(EgressMessage::BotResponseInterrupted).await;
    }
}
