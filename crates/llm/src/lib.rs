//! LLM-facing helpers
//!
//! The model itself lives behind `voice_loop_core::LanguageModel`; this crate
//! owns how a turn's inputs are assembled into the prompt.

mod prompt;

pub use prompt::PromptBuilder;
