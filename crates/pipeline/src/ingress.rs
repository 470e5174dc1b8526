//! Audio ingress
//!
//! Receives raw PCM frames from the transport, pushes each frame through the
//! VAD gate, and enqueues every frame for STT regardless of the VAD state.
//! Gating STT by VAD loses speech onsets; turn boundaries are applied
//! downstream instead.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

use voice_loop_core::{AudioFrame, EgressMessage, VadEvent, VadLabel};

use crate::controller::EngineEvent;
use crate::egress::Egress;
use crate::telemetry::TelemetryHandle;
use crate::vad::VadGate;
use crate::PipelineError;

/// Bounded frame ring between ingress and the STT streamer.
///
/// Producers never block: on overflow the oldest frame is dropped and a
/// counter incremented.
pub struct SttAudioQueue {
    frames: Mutex<VecDeque<AudioFrame>>,
    capacity: usize,
    dropped: AtomicU64,
    closed: AtomicBool,
    readable: Notify,
}

impl SttAudioQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            readable: Notify::new(),
        }
    }

    /// Enqueue a frame, dropping the oldest one on overflow
    pub fn push(&self, frame: AudioFrame) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        {
            let mut frames = self.frames.lock();
            if frames.len() >= self.capacity {
                frames.pop_front();
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                metrics::counter!("voice_loop_stt_frames_dropped").increment(1);
                if dropped == 1 || dropped % 100 == 0 {
                    tracing::warn!(dropped, "STT audio queue overflow, dropping oldest frame");
                }
            }
            frames.push_back(frame);
        }
        self.readable.notify_one();
    }

    /// Dequeue the next frame in arrival order; `None` once closed and drained
    pub async fn pop(&self) -> Option<AudioFrame> {
        loop {
            let readable = self.readable.notified();
            if let Some(frame) = self.frames.lock().pop_front() {
                return Some(frame);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            readable.await;
        }
    }

    /// Close the queue; queued frames remain poppable
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.readable.notify_waiters();
    }

    /// Total frames dropped to overflow
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Frames currently queued
    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    /// Is the queue empty?
    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }
}

/// Entry point for transport audio
pub struct AudioIngress {
    gate: VadGate,
    stt_queue: Arc<SttAudioQueue>,
    events: mpsc::Sender<EngineEvent>,
    egress: Egress,
    telemetry: TelemetryHandle,
    frames_seen: AtomicU64,
    update_every: u64,
}

impl AudioIngress {
    pub fn new(
        gate: VadGate,
        stt_queue: Arc<SttAudioQueue>,
        events: mpsc::Sender<EngineEvent>,
        egress: Egress,
        telemetry: TelemetryHandle,
        update_every: u64,
    ) -> Self {
        Self {
            gate,
            stt_queue,
            events,
            egress,
            telemetry,
            frames_seen: AtomicU64::new(0),
            update_every: update_every.max(1),
        }
    }

    /// Process one transport frame: VAD, STT enqueue, throttled VAD update
    pub async fn push_frame(&self, frame: AudioFrame) -> Result<(), PipelineError> {
        let events = self.gate.push(&frame).await;
        self.stt_queue.push(frame);

        let speaking = self.gate.triggered();
        let probability = self.gate.current_probability();
        self.telemetry.set_vad(probability, speaking);

        for event in &events {
            let engine_event = match event {
                VadEvent::SpeechStart { .. } => EngineEvent::VadStart,
                VadEvent::SpeechEnd { .. } => EngineEvent::VadEnd,
            };
            self.events
                .send(engine_event)
                .await
                .map_err(|_| PipelineError::EngineStopped)?;
        }

        let n = self.frames_seen.fetch_add(1, Ordering::Relaxed);
        if !events.is_empty() || n % self.update_every == 0 {
            // Status updates are advisory; dropped when the egress is full
            self.egress.try_send(EgressMessage::VadUpdate {
                energy: probability,
                state: if speaking {
                    VadLabel::Speaking
                } else {
                    VadLabel::Silence
                },
                telemetry: self.telemetry.snapshot(),
            });
        }
        Ok(())
    }

    /// Frames dropped from the STT queue so far
    pub fn dropped_frames(&self) -> u64 {
        self.stt_queue.dropped_frames()
    }
}
