//! Audio frame types and utilities

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Supported audio sample rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SampleRate {
    /// 8kHz - Telephony
    Hz8000,
    /// 16kHz - Standard speech recognition
    #[default]
    Hz16000,
    /// 22.05kHz - TTS output
    Hz22050,
    /// 24kHz - TTS output (newer synthesis models)
    Hz24000,
    /// 44.1kHz - CD quality
    Hz44100,
    /// 48kHz - Professional audio
    Hz48000,
}

impl SampleRate {
    /// Get sample rate as u32
    pub fn as_u32(&self) -> u32 {
        match self {
            SampleRate::Hz8000 => 8000,
            SampleRate::Hz16000 => 16000,
            SampleRate::Hz22050 => 22050,
            SampleRate::Hz24000 => 24000,
            SampleRate::Hz44100 => 44100,
            SampleRate::Hz48000 => 48000,
        }
    }

    /// Look up a supported rate from a raw Hz value
    pub fn from_hz(hz: u32) -> Option<Self> {
        match hz {
            8000 => Some(SampleRate::Hz8000),
            16000 => Some(SampleRate::Hz16000),
            22050 => Some(SampleRate::Hz22050),
            24000 => Some(SampleRate::Hz24000),
            44100 => Some(SampleRate::Hz44100),
            48000 => Some(SampleRate::Hz48000),
            _ => None,
        }
    }

    /// Byte length of a 20ms mono PCM16 chunk at this rate
    pub fn frame_bytes_20ms(&self) -> usize {
        (self.as_u32() as usize * 20 / 1000) * 2
    }
}

/// An immutable chunk of mono PCM16 audio (signed 16-bit little-endian).
///
/// Frames carry no timestamp; ordering is positional within a session.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// Raw PCM16 bytes (little-endian)
    pub data: Arc<[u8]>,
    /// Sample rate
    pub sample_rate: SampleRate,
}

impl std::fmt::Debug for AudioFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFrame")
            .field("bytes", &self.data.len())
            .field("sample_rate", &self.sample_rate)
            .field("duration_ms", &self.duration().as_millis())
            .finish()
    }
}

impl AudioFrame {
    /// Create a new frame from raw PCM16 bytes
    pub fn new(data: impl Into<Arc<[u8]>>, sample_rate: SampleRate) -> Self {
        Self {
            data: data.into(),
            sample_rate,
        }
    }

    /// Byte length of the payload
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Is the payload empty?
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of PCM16 samples in the frame
    pub fn sample_count(&self) -> usize {
        self.data.len() / 2
    }

    /// Duration of the frame at its sample rate
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.sample_count() as f64 / self.sample_rate.as_u32() as f64)
    }

    /// Iterate the payload as i16 samples (little-endian pairs)
    pub fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.data
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
    }

    /// Iterate the payload as f32 samples normalized to [-1.0, 1.0]
    pub fn samples_f32(&self) -> impl Iterator<Item = f32> + '_ {
        const PCM16_NORMALIZE: f32 = 32768.0;
        self.samples().map(move |s| s as f32 / PCM16_NORMALIZE)
    }

    /// RMS energy of the frame, normalized to [0.0, 1.0]
    pub fn rms(&self) -> f32 {
        let count = self.sample_count();
        if count == 0 {
            return 0.0;
        }
        let sum_squares: f32 = self.samples_f32().map(|s| s * s).sum();
        (sum_squares / count as f32).sqrt()
    }
}
