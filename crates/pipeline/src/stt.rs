//! STT streamer
//!
//! A long-lived task that owns the session's STT stream: it drains frames
//! from the audio queue, feeds them to the provider, and forwards transcript
//! events to the controller. Provider errors are fatal to the STT stream but
//! not to the session.

use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use voice_loop_core::traits::speech::AudioFrameStream;
use voice_loop_core::{EgressMessage, SpeechToText};

use crate::controller::EngineEvent;
use crate::egress::Egress;
use crate::ingress::SttAudioQueue;

pub struct SttStreamer {
    queue: Arc<SttAudioQueue>,
    stt: Arc<dyn SpeechToText>,
    events: mpsc::Sender<EngineEvent>,
    egress: Egress,
}

impl SttStreamer {
    pub fn new(
        queue: Arc<SttAudioQueue>,
        stt: Arc<dyn SpeechToText>,
        events: mpsc::Sender<EngineEvent>,
        egress: Egress,
    ) -> Self {
        Self {
            queue,
            stt,
            events,
            egress,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        tracing::debug!(model = self.stt.model_name(), "starting STT stream");

        let queue = Arc::clone(&self.queue);
        let frames: AudioFrameStream = Box::pin(async_stream::stream! {
            while let Some(frame) = queue.pop().await {
                yield frame;
            }
        });

        let mut transcripts = self.stt.transcribe_stream(frames);
        let mut count: u64 = 0;
        while let Some(item) = transcripts.next().await {
            match item {
                Ok(transcript) => {
                    count += 1;
                    if transcript.is_final {
                        tracing::info!(text = %transcript.text, "final transcript");
                    } else {
                        tracing::trace!(text = %transcript.text, "partial transcript");
                    }
                    if self
                        .events
                        .send(EngineEvent::Transcript(transcript))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, transcripts = count, "STT stream failed");
                    self.egress
                        .send(EgressMessage::Error {
                            message: format!("Transcription error: {e}"),
                        })
                        .await;
                    break;
                }
            }
        }
        tracing::debug!(transcripts = count, "STT stream ended");
    }
}
