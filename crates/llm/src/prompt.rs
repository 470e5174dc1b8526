//! Prompt assembly
//!
//! Combines, in a fixed order: the agent's system prompt, the retrieved
//! context block (when non-empty), a compact tail of conversation history,
//! and the current user text. The layout is deterministic: identical inputs
//! produce an identical prompt.

use voice_loop_core::{Document, HistoryMessage, TurnRole};

/// Builds the generation prompt for one turn
pub struct PromptBuilder<'a> {
    system_prompt: &'a str,
    contexts: &'a [Document],
    history: &'a [HistoryMessage],
}

impl<'a> PromptBuilder<'a> {
    pub fn new(system_prompt: &'a str) -> Self {
        Self {
            system_prompt,
            contexts: &[],
            history: &[],
        }
    }

    /// Retrieved context chunks, most relevant first
    pub fn with_contexts(mut self, contexts: &'a [Document]) -> Self {
        self.contexts = contexts;
        self
    }

    /// Trailing conversation history, oldest first
    pub fn with_history(mut self, history: &'a [HistoryMessage]) -> Self {
        self.history = history;
        self
    }

    /// Assemble the prompt for the given user text
    pub fn build(&self, user_text: &str) -> String {
        let mut prompt = String::from(self.system_prompt);

        if !self.contexts.is_empty() {
            prompt.push_str("\n\nContext:\n");
            let blocks: Vec<&str> = self.contexts.iter().map(|d| d.text.as_str()).collect();
            prompt.push_str(&blocks.join("\n\n"));
        }

        if !self.history.is_empty() {
            prompt.push_str("\n\nConversation so far:\n");
            for message in self.history {
                let speaker = match message.role {
                    TurnRole::User => "User",
                    TurnRole::Assistant => "Assistant",
                    TurnRole::System => "System",
                };
                prompt.push_str(speaker);
                prompt.push_str(": ");
                prompt.push_str(&message.content);
                prompt.push('\n');
            }
        }

        prompt.push_str("\n\nCurrent user message: ");
        prompt.push_str(user_text);
        prompt
    }
}
