//! Fixed engine constants
//!
//! Single source of truth for values shared across crates.

/// Turn sequencing
pub mod turn {
    /// How long to wait for a final transcript after end of speech before
    /// giving up on the turn (ms)
    pub const WAIT_FOR_TRANSCRIPT_MS: u64 = 2_000;

    /// Generation is aborted if no new token arrives within this window (ms)
    pub const GENERATION_IDLE_TIMEOUT_MS: u64 = 10_000;

    /// Overall budget for a single generation (ms)
    pub const GENERATION_OVERALL_TIMEOUT_MS: u64 = 30_000;

    /// Characters that end a synthesizable text unit
    pub const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', ';', ':'];

    /// Word count that forces a flush under the MEDIUM buffer policy
    pub const MEDIUM_FLUSH_WORDS: usize = 4;
}

/// Voice activity detection
pub mod vad {
    /// Default speech probability threshold
    pub const DEFAULT_THRESHOLD: f32 = 0.5;

    /// Default hangover: continuous sub-threshold audio required before
    /// declaring end of speech (ms)
    pub const DEFAULT_HANGOVER_MS: u64 = 450;

    /// Emit a vad_update egress message every N frames
    pub const UPDATE_EVERY_FRAMES: u64 = 5;
}

/// Queue capacities
pub mod queues {
    /// Controller event queue
    pub const EVENT_QUEUE_CAPACITY: usize = 256;

    /// STT audio ring; oldest frames are dropped on overflow
    pub const STT_AUDIO_QUEUE_CAPACITY: usize = 256;

    /// Text units buffered between generation and TTS
    pub const TTS_TEXT_QUEUE_CAPACITY: usize = 64;

    /// Ordered egress queue to the transport
    pub const EGRESS_QUEUE_CAPACITY: usize = 1_024;
}

/// Conversation history
pub mod history {
    /// Soft cap on stored messages per session
    pub const MAX_MESSAGES: usize = 50;

    /// Number of trailing messages included in the prompt
    pub const PROMPT_TAIL_MESSAGES: usize = 4;
}

/// Retrieval
pub mod retrieval {
    /// Context chunks requested per turn; small for voice latency
    pub const DEFAULT_TOP_K: usize = 3;

    /// Retrieval cache entry lifetime (seconds)
    pub const CACHE_TTL_SECS: u64 = 300;
}

/// Audio
pub mod audio {
    /// Default ingress sample rate for VAD/STT (Hz)
    pub const INGRESS_SAMPLE_RATE_HZ: u32 = 16_000;
}
