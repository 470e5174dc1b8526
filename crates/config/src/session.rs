//! Per-session configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{audio, history, queues, retrieval, turn, vad};
use crate::ConfigError;

/// Policy selecting when accumulated LLM output is flushed to TTS.
///
/// Immutable for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum BufferPolicy {
    /// Flush every token immediately
    None,
    /// Flush at word boundaries
    Low,
    /// Flush after four words or at a sentence terminator
    #[default]
    Medium,
    /// Flush only at sentence terminators
    High,
}

/// VAD gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadGateConfig {
    /// Speech probability threshold; frames at or above are speech
    pub threshold: f32,
    /// Continuous sub-threshold audio required before end-of-speech (ms)
    pub hangover_ms: u64,
    /// Emit a vad_update egress message every N frames
    pub update_every_frames: u64,
}

impl Default for VadGateConfig {
    fn default() -> Self {
        Self {
            threshold: vad::DEFAULT_THRESHOLD,
            hangover_ms: vad::DEFAULT_HANGOVER_MS,
            update_every_frames: vad::UPDATE_EVERY_FRAMES,
        }
    }
}

/// Turn sequencing timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnTimeouts {
    /// Wait for a final transcript after end of speech (ms)
    pub wait_for_transcript_ms: u64,
    /// Abort generation when no new token arrives within this window (ms)
    pub generation_idle_ms: u64,
    /// Overall generation budget (ms)
    pub generation_overall_ms: u64,
}

impl Default for TurnTimeouts {
    fn default() -> Self {
        Self {
            wait_for_transcript_ms: turn::WAIT_FOR_TRANSCRIPT_MS,
            generation_idle_ms: turn::GENERATION_IDLE_TIMEOUT_MS,
            generation_overall_ms: turn::GENERATION_OVERALL_TIMEOUT_MS,
        }
    }
}

impl TurnTimeouts {
    pub fn wait_for_transcript(&self) -> Duration {
        Duration::from_millis(self.wait_for_transcript_ms)
    }

    pub fn generation_idle(&self) -> Duration {
        Duration::from_millis(self.generation_idle_ms)
    }

    pub fn generation_overall(&self) -> Duration {
        Duration::from_millis(self.generation_overall_ms)
    }
}

/// Bounded queue capacities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueCapacities {
    pub events: usize,
    pub stt_audio: usize,
    pub tts_text: usize,
    pub egress: usize,
}

impl Default for QueueCapacities {
    fn default() -> Self {
        Self {
            events: queues::EVENT_QUEUE_CAPACITY,
            stt_audio: queues::STT_AUDIO_QUEUE_CAPACITY,
            tts_text: queues::TTS_TEXT_QUEUE_CAPACITY,
            egress: queues::EGRESS_QUEUE_CAPACITY,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Context chunks requested per turn
    pub top_k: usize,
    /// Cache entry lifetime (seconds)
    pub cache_ttl_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: retrieval::DEFAULT_TOP_K,
            cache_ttl_secs: retrieval::CACHE_TTL_SECS,
        }
    }
}

impl RetrievalConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Configuration resolved for one session at creation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Opaque agent id selecting provider/prompt configuration
    pub agent_id: Option<String>,
    /// System prompt for the agent
    pub system_prompt: String,
    /// Output buffering policy
    pub buffer_policy: BufferPolicy,
    /// Ingress sample rate for VAD/STT (Hz)
    pub ingress_sample_rate_hz: u32,
    /// VAD gate settings
    #[serde(default)]
    pub vad: VadGateConfig,
    /// Turn timeouts
    #[serde(default)]
    pub timeouts: TurnTimeouts,
    /// Queue capacities
    #[serde(default)]
    pub queues: QueueCapacities,
    /// Retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Soft cap on stored history messages
    pub history_max_messages: usize,
    /// Trailing history messages included in the prompt
    pub history_prompt_tail: usize,
    /// Max tokens per generated response
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            agent_id: None,
            system_prompt: "You are a helpful voice assistant. Respond concisely and \
                naturally; keep responses brief as they will be spoken aloud."
                .to_string(),
            buffer_policy: BufferPolicy::default(),
            ingress_sample_rate_hz: audio::INGRESS_SAMPLE_RATE_HZ,
            vad: VadGateConfig::default(),
            timeouts: TurnTimeouts::default(),
            queues: QueueCapacities::default(),
            retrieval: RetrievalConfig::default(),
            history_max_messages: history::MAX_MESSAGES,
            history_prompt_tail: history::PROMPT_TAIL_MESSAGES,
            max_tokens: 256,
            temperature: 0.7,
        }
    }
}

impl SessionConfig {
    /// Set the agent id
    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Set the buffer policy
    pub fn with_buffer_policy(mut self, policy: BufferPolicy) -> Self {
        self.buffer_policy = policy;
        self
    }

    /// Set the system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Validate values that cannot be expressed in the type system
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.vad.threshold) {
            return Err(ConfigError::InvalidValue {
                field: "vad.threshold".to_string(),
                message: format!("must be between 0.0 and 1.0, got {}", self.vad.threshold),
            });
        }
        if self.vad.hangover_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "vad.hangover_ms".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.timeouts.generation_idle_ms > self.timeouts.generation_overall_ms {
            return Err(ConfigError::InvalidValue {
                field: "timeouts.generation_idle_ms".to_string(),
                message: "idle timeout cannot exceed the overall budget".to_string(),
            });
        }
        if self.queues.events == 0 || self.queues.stt_audio == 0 || self.queues.egress == 0 {
            return Err(ConfigError::InvalidValue {
                field: "queues".to_string(),
                message: "queue capacities must be positive".to_string(),
            });
        }
        Ok(())
    }
}
