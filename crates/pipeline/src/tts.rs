//! Per-turn TTS streamer
//!
//! Consumes buffered text units until the queue closes, feeds the streaming
//! TTS provider, and posts every audio chunk to the controller in provider
//! order. Synthesis failures end the turn cleanly; the session continues.

use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use voice_loop_core::traits::speech::TextUnitStream;
use voice_loop_core::TextToSpeech;

use crate::controller::EngineEvent;
use crate::telemetry::TelemetryHandle;

pub(crate) struct TtsStreamer {
    pub tts: Arc<dyn TextToSpeech>,
    pub text_rx: mpsc::Receiver<String>,
    pub events: mpsc::Sender<EngineEvent>,
    pub telemetry: TelemetryHandle,
}

impl TtsStreamer {
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let TtsStreamer {
            tts,
            text_rx,
            events,
            telemetry,
        } = self;

        tracing::debug!(model = tts.model_name(), "starting TTS stream");

        let units: TextUnitStream = Box::pin(ReceiverStream::new(text_rx));

        let mut audio = tts.synthesize_stream(units);
        let mut chunks: u64 = 0;
        let mut failure: Option<String> = None;

        while let Some(item) = audio.next().await {
            match item {
                Ok(chunk) => {
                    if chunks == 0 {
                        telemetry.mark_tts_started().await;
                    }
                    chunks += 1;
                    if events.send(EngineEvent::TtsChunk(chunk)).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, chunks, "TTS synthesis failed");
                    failure = Some(e.to_string());
                    break;
                }
            }
        }

        if failure.is_none() {
            telemetry.mark_tts_ended().await;
        }
        tracing::debug!(chunks, "TTS stream ended");
        let _ = events
            .send(EngineEvent::TtsFinished { error: failure })
            .await;
    }
}
