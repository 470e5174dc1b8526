//! Transcript types produced by STT

use serde::{Deserialize, Serialize};

/// A transcription hypothesis from the STT provider.
///
/// Partial transcripts (`is_final == false`) may be superseded by later
/// hypotheses for the same audio region. A final transcript is the provider's
/// commitment and will not be revised.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResult {
    /// Transcribed text
    pub text: String,
    /// Whether the provider has committed to this hypothesis
    pub is_final: bool,
    /// Provider confidence, if reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl TranscriptResult {
    /// Create a partial (revisable) transcript
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            confidence: None,
        }
    }

    /// Create a final (committed) transcript
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            confidence: None,
        }
    }

    /// Attach a confidence score
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}
