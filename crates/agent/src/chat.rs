//! Chat service
//!
//! Implements the engine's `ResponseGenerator` seam: retrieve context for
//! the dispatched user text, assemble the prompt, stream the LLM response,
//! and keep the conversation history current. Retrieval failures degrade to
//! empty-context generation and are never surfaced to the user.

use futures::StreamExt;
use std::sync::Arc;
use tokio::time::Instant;

use voice_loop_config::SessionConfig;
use voice_loop_core::traits::generation::ResponseStream;
use voice_loop_core::{
    GenerateRequest, HistoryMessage, LanguageModel, ResponseChunk, ResponseGenerator,
    RetrieveOptions, Retriever,
};
use voice_loop_llm::PromptBuilder;

use crate::history::ConversationStore;

/// Chat-side knobs resolved from the session configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub system_prompt: String,
    pub top_k: usize,
    pub history_tail: usize,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl From<&SessionConfig> for ChatConfig {
    fn from(config: &SessionConfig) -> Self {
        Self {
            system_prompt: config.system_prompt.clone(),
            top_k: config.retrieval.top_k,
            history_tail: config.history_prompt_tail,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// Retrieval + prompt + LLM streaming for one session
pub struct ChatService {
    llm: Arc<dyn LanguageModel>,
    retriever: Option<Arc<dyn Retriever>>,
    history: Arc<ConversationStore>,
    config: ChatConfig,
}

impl ChatService {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        retriever: Option<Arc<dyn Retriever>>,
        history: Arc<ConversationStore>,
        config: ChatConfig,
    ) -> Self {
        Self {
            llm,
            retriever,
            history,
            config,
        }
    }
}

impl ResponseGenerator for ChatService {
    fn respond_stream(&self, session_id: &str, text: &str) -> ResponseStream {
        let llm = Arc::clone(&self.llm);
        let retriever = self.retriever.clone();
        let history = Arc::clone(&self.history);
        let config = self.config.clone();
        let session_id = session_id.to_string();
        let text = text.to_string();

        Box::pin(async_stream::stream! {
            let started = Instant::now();

            let contexts = match &retriever {
                Some(retriever) => {
                    let options = RetrieveOptions::default().with_top_k(config.top_k);
                    match retriever.retrieve(&text, &options).await {
                        Ok(documents) => documents,
                        Err(e) => {
                            tracing::warn!(
                                session_id = %session_id,
                                error = %e,
                                "retrieval failed, continuing without context"
                            );
                            Vec::new()
                        }
                    }
                }
                None => Vec::new(),
            };
            tracing::debug!(
                session_id = %session_id,
                contexts = contexts.len(),
                retrieval_ms = started.elapsed().as_millis() as u64,
                "retrieval done"
            );

            let tail = history.tail(&session_id, config.history_tail);
            history.append(&session_id, HistoryMessage::user(&text));

            let prompt = PromptBuilder::new(&config.system_prompt)
                .with_contexts(&contexts)
                .with_history(&tail)
                .build(&text);

            let request = GenerateRequest::new(prompt)
                .with_streaming(true)
                .with_max_tokens(config.max_tokens)
                .with_temperature(config.temperature);

            let mut stream = llm.generate_stream(request);
            let mut response = String::new();
            let mut first = true;
            let mut failed = false;

            while let Some(item) = stream.next().await {
                match item {
                    Ok(chunk) => {
                        if !chunk.delta.is_empty() {
                            response.push_str(&chunk.delta);
                            if first {
                                first = false;
                                tracing::info!(
                                    session_id = %session_id,
                                    first_token_ms = started.elapsed().as_millis() as u64,
                                    "first token received"
                                );
                                yield ResponseChunk::FirstToken { content: chunk.delta };
                            } else {
                                yield ResponseChunk::Chunk { content: chunk.delta };
                            }
                        }
                        if chunk.is_final {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(session_id = %session_id, error = %e, "LLM stream failed");
                        yield ResponseChunk::Error { message: e.to_string() };
                        failed = true;
                        break;
                    }
                }
            }

            if !failed {
                if !response.is_empty() {
                    history.append(&session_id, HistoryMessage::assistant(&response));
                }
                tracing::info!(
                    session_id = %session_id,
                    chars = response.len(),
                    total_ms = started.elapsed().as_millis() as u64,
                    "chat response complete"
                );
                yield ResponseChunk::Complete;
            }
        })
    }

    fn name(&self) -> &str {
        "chat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use voice_loop_core::traits::llm::TokenStream;
    use voice_loop_core::{
        Document, Error, FinishReason, GenerateResponse, Result, StreamChunk,
    };

    struct RecordingLlm {
        prompts: Mutex<Vec<String>>,
        tokens: Vec<&'static str>,
    }

    #[async_trait]
    impl LanguageModel for RecordingLlm {
        async fn generate(&self, _request: GenerateRequest) -> Result<GenerateResponse> {
            Ok(GenerateResponse::text(self.tokens.concat()))
        }

        fn generate_stream(&self, request: GenerateRequest) -> TokenStream {
            self.prompts.lock().push(request.messages[0].content.clone());
            let mut chunks: Vec<Result<StreamChunk>> = self
                .tokens
                .iter()
                .map(|t| Ok(StreamChunk::text(*t)))
                .collect();
            chunks.push(Ok(StreamChunk::final_chunk(FinishReason::Stop)));
            Box::pin(futures::stream::iter(chunks))
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "recording-llm"
        }
    }

    struct StaticRetriever;

    #[async_trait]
    impl Retriever for StaticRetriever {
        async fn retrieve(
            &self,
            _query: &str,
            _options: &RetrieveOptions,
        ) -> Result<Vec<Document>> {
            Ok(vec![Document::new("We open at nine.", 0.9)])
        }

        fn name(&self) -> &str {
            "static"
        }
    }

    struct FailingRetriever;

    #[async_trait]
    impl Retriever for FailingRetriever {
        async fn retrieve(
            &self,
            _query: &str,
            _options: &RetrieveOptions,
        ) -> Result<Vec<Document>> {
            Err(Error::provider("vector store down"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn chat_config() -> ChatConfig {
        ChatConfig::from(&SessionConfig::default())
    }

    #[tokio::test]
    async fn test_stream_shape_and_history() {
        let llm = Arc::new(RecordingLlm {
            prompts: Mutex::new(Vec::new()),
            tokens: vec!["Nine", " am."],
        });
        let history = Arc::new(ConversationStore::new(10));
        let chat = ChatService::new(
            llm.clone(),
            Some(Arc::new(StaticRetriever)),
            history.clone(),
            chat_config(),
        );

        let chunks: Vec<_> = chat.respond_stream("s1", "when do you open").collect().await;

        assert_eq!(
            chunks,
            vec![
                ResponseChunk::FirstToken { content: "Nine".into() },
                ResponseChunk::Chunk { content: " am.".into() },
                ResponseChunk::Complete,
            ]
        );

        // User message and assistant response recorded in order
        let tail = history.tail("s1", 10);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].content, "when do you open");
        assert_eq!(tail[1].content, "Nine am.");

        // Retrieved context and user text appear in the prompt
        let prompts = llm.prompts.lock();
        assert!(prompts[0].contains("We open at nine."));
        assert!(prompts[0].ends_with("Current user message: when do you open"));
    }

    #[tokio::test]
    async fn test_retrieval_failure_degrades_silently() {
        let llm = Arc::new(RecordingLlm {
            prompts: Mutex::new(Vec::new()),
            tokens: vec!["Hello."],
        });
        let history = Arc::new(ConversationStore::new(10));
        let chat = ChatService::new(
            llm.clone(),
            Some(Arc::new(FailingRetriever)),
            history,
            chat_config(),
        );

        let chunks: Vec<_> = chat.respond_stream("s1", "hi").collect().await;
        assert_eq!(*chunks.last().unwrap(), ResponseChunk::Complete);
        assert!(!chunks
            .iter()
            .any(|c| matches!(c, ResponseChunk::Error { .. })));

        // No context block when retrieval failed
        assert!(!llm.prompts.lock()[0].contains("Context:"));
    }

    #[tokio::test]
    async fn test_history_tail_excludes_current_turn() {
        let llm = Arc::new(RecordingLlm {
            prompts: Mutex::new(Vec::new()),
            tokens: vec!["Sure."],
        });
        let history = Arc::new(ConversationStore::new(10));
        history.append("s1", HistoryMessage::user("earlier question"));
        history.append("s1", HistoryMessage::assistant("earlier answer"));

        let chat = ChatService::new(llm.clone(), None, history, chat_config());
        let _: Vec<_> = chat.respond_stream("s1", "follow-up").collect().await;

        let prompts = llm.prompts.lock();
        assert!(prompts[0].contains("User: earlier question"));
        assert!(prompts[0].contains("Assistant: earlier answer"));
        // The current turn is carried in the user-message slot, not history
        assert!(!prompts[0].contains("User: follow-up"));
    }
}
