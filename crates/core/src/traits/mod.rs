//! Provider traits
//!
//! All external collaborators implement these traits so they can be swapped
//! and mocked:
//!
//! ```text
//! Speech:
//!   - SpeechClassifier: per-frame speech probability (VAD model)
//!   - SpeechToText: audio stream -> transcript stream
//!   - TextToSpeech: text-unit stream -> audio-chunk stream
//!
//! Language models:
//!   - LanguageModel: prompt -> token stream
//!
//! Retrieval:
//!   - Retriever: query -> context documents
//!
//! Generation:
//!   - ResponseGenerator: dispatched user text -> response chunk stream
//!     (retrieval + prompting + LLM behind one seam)
//! ```

pub mod generation;
pub mod llm;
pub mod retriever;
pub mod speech;

pub use generation::{ResponseChunk, ResponseGenerator};
pub use llm::LanguageModel;
pub use retriever::{Document, RetrieveOptions, Retriever};
pub use speech::{SpeechClassifier, SpeechToText, TextToSpeech};
