//! Per-turn generation task
//!
//! Consumes the response stream for a dispatched turn, applies the output
//! buffer policy, feeds text units to the synthesis queue, and mirrors raw
//! tokens to the client. Enforces the idle and overall generation budgets.
//!
//! Dropping the text sender is the end-of-stream sentinel for the synthesis
//! queue; it happens on every exit path, including task abort.

use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};

use voice_loop_config::{BufferPolicy, TurnTimeouts};
use voice_loop_core::{EgressMessage, ResponseChunk, ResponseGenerator};

use crate::buffering::TextBuffer;
use crate::egress::Egress;
use crate::telemetry::TelemetryHandle;

pub(crate) struct GenerationTask {
    pub generator: Arc<dyn ResponseGenerator>,
    pub session_id: String,
    pub user_text: String,
    pub policy: BufferPolicy,
    pub timeouts: TurnTimeouts,
    pub text_tx: mpsc::Sender<String>,
    pub egress: Egress,
    pub telemetry: TelemetryHandle,
}

impl GenerationTask {
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let GenerationTask {
            generator,
            session_id,
            user_text,
            policy,
            timeouts,
            text_tx,
            egress,
            telemetry,
        } = self;

        let started = Instant::now();
        let deadline = started + timeouts.generation_overall();
        let idle = timeouts.generation_idle();

        let mut stream = generator.respond_stream(&session_id, &user_text);
        let mut buffer = TextBuffer::new(policy);
        let mut tokens: u64 = 0;

        loop {
            let now = Instant::now();
            if now >= deadline {
                tracing::error!(
                    session_id = %session_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "generation exceeded overall budget"
                );
                egress
                    .send(EgressMessage::Error {
                        message: "Response timeout - please try again".to_string(),
                    })
                    .await;
                break;
            }
            let remaining = deadline - now;
            let window = idle.min(remaining);

            let chunk = match timeout(window, stream.next()).await {
                Err(_) => {
                    let message = if idle <= remaining {
                        tracing::warn!(session_id = %session_id, tokens, "generation stream stalled");
                        "Response stream stalled - please try again"
                    } else {
                        tracing::error!(session_id = %session_id, tokens, "generation exceeded overall budget");
                        "Response timeout - please try again"
                    };
                    egress
                        .send(EgressMessage::Error {
                            message: message.to_string(),
                        })
                        .await;
                    break;
                }
                Ok(None) => {
                    tracing::warn!(session_id = %session_id, tokens, "response stream ended without completion");
                    break;
                }
                Ok(Some(chunk)) => chunk,
            };

            match chunk {
                ResponseChunk::FirstToken { content } | ResponseChunk::Chunk { content } => {
                    if tokens == 0 {
                        telemetry.mark_llm_started().await;
                        tracing::info!(
                            session_id = %session_id,
                            first_token_ms = started.elapsed().as_millis() as u64,
                            "first token received"
                        );
                    }
                    tokens += 1;
                    if content.is_empty() {
                        continue;
                    }
                    for unit in buffer.push(&content) {
                        if text_tx.send(unit).await.is_err() {
                            tracing::debug!(session_id = %session_id, "synthesis queue closed mid-generation");
                            return;
                        }
                    }
                    egress
                        .send(EgressMessage::AssistantResponse {
                            text: content,
                            is_complete: false,
                        })
                        .await;
                }
                ResponseChunk::Complete => {
                    telemetry.mark_llm_ended().await;
                    if let Some(residue) = buffer.finish() {
                        let _ = text_tx.send(residue).await;
                    }
                    egress
                        .send(EgressMessage::AssistantResponse {
                            text: String::new(),
                            is_complete: true,
                        })
                        .await;
                    tracing::info!(
                        session_id = %session_id,
                        tokens,
                        total_ms = started.elapsed().as_millis() as u64,
                        "generation complete"
                    );
                    break;
                }
                ResponseChunk::Error { message } => {
                    tracing::error!(session_id = %session_id, error = %message, "generation failed");
                    egress
                        .send(EgressMessage::Error {
                            message: format!("Processing error: {message}"),
                        })
                        .await;
                    break;
                }
            }
        }
    }
}
