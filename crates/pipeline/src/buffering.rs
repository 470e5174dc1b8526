//! Output buffering between the LLM and TTS
//!
//! Accumulates generated tokens and flushes complete units downstream
//! according to the session's [`BufferPolicy`]:
//!
//! - `NONE`: flush every token immediately
//! - `LOW`: flush the prefix up to and including the last whitespace
//! - `MEDIUM`: flush the first four words once a fourth separator exists,
//!   otherwise flush up to and including the last sentence terminator
//! - `HIGH`: flush only at sentence terminators
//!
//! Whatever remains at stream completion is flushed as the final residue.
//! The concatenation of all flushed units always equals the concatenation
//! of all pushed tokens.

use voice_loop_config::constants::turn::{MEDIUM_FLUSH_WORDS, SENTENCE_TERMINATORS};
use voice_loop_config::BufferPolicy;

/// Token accumulator applying a flush policy
#[derive(Debug)]
pub struct TextBuffer {
    policy: BufferPolicy,
    buffer: String,
}

impl TextBuffer {
    pub fn new(policy: BufferPolicy) -> Self {
        Self {
            policy,
            buffer: String::new(),
        }
    }

    /// Append a token and return every unit the policy releases, in order
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);
        let mut units = Vec::new();
        while let Some(unit) = self.next_unit() {
            units.push(unit);
        }
        units
    }

    /// Flush the remaining residue at stream completion
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }

    /// Text currently held back
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    fn next_unit(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        match self.policy {
            BufferPolicy::None => Some(std::mem::take(&mut self.buffer)),
            BufferPolicy::Low => self.split_at_last_whitespace(),
            BufferPolicy::Medium => self
                .split_after_word(MEDIUM_FLUSH_WORDS)
                .or_else(|| self.split_at_last_terminator()),
            BufferPolicy::High => self.split_at_last_terminator(),
        }
    }

    /// Remove and return `buffer[..end]`
    fn split_off_head(&mut self, end: usize) -> String {
        let rest = self.buffer.split_off(end);
        std::mem::replace(&mut self.buffer, rest)
    }

    fn split_at_last_whitespace(&mut self) -> Option<String> {
        let pos = self.buffer.rfind(char::is_whitespace)?;
        let end = pos + char_width(&self.buffer, pos);
        Some(self.split_off_head(end))
    }

    fn split_at_last_terminator(&mut self) -> Option<String> {
        let pos = self.buffer.rfind(|c| SENTENCE_TERMINATORS.contains(&c))?;
        let end = pos + char_width(&self.buffer, pos);
        Some(self.split_off_head(end))
    }

    /// Split just after the separator that ends the nth word, if present
    fn split_after_word(&mut self, n: usize) -> Option<String> {
        let mut words = 0usize;
        let mut in_word = false;
        for (idx, c) in self.buffer.char_indices() {
            if c.is_whitespace() {
                if in_word {
                    words += 1;
                    in_word = false;
                    if words == n {
                        return Some(self.split_off_head(idx + c.len_utf8()));
                    }
                }
            } else {
                in_word = true;
            }
        }
        None
    }
}

fn char_width(s: &str, pos: usize) -> usize {
    s[pos..].chars().next().map_or(1, |c| c.len_utf8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_all(buffer: &mut TextBuffer, tokens: &[&str]) -> Vec<String> {
        let mut units = Vec::new();
        for token in tokens {
            units.extend(buffer.push(token));
        }
        if let Some(residue) = buffer.finish() {
            units.push(residue);
        }
        units
    }

    #[test]
    fn test_none_flushes_every_token() {
        let mut buffer = TextBuffer::new(BufferPolicy::None);
        assert_eq!(buffer.push("Hi"), vec!["Hi"]);
        assert_eq!(buffer.push(" there"), vec![" there"]);
        assert!(buffer.finish().is_none());
    }

    #[test]
    fn test_low_flushes_at_word_boundaries() {
        let mut buffer = TextBuffer::new(BufferPolicy::Low);
        assert!(buffer.push("hel").is_empty());
        assert_eq!(buffer.push("lo wor"), vec!["hello "]);
        assert_eq!(buffer.pending(), "wor");
        assert_eq!(buffer.push("ld "), vec!["world "]);
        assert!(buffer.finish().is_none());
    }

    #[test]
    fn test_medium_four_word_rule_then_terminator() {
        let mut buffer = TextBuffer::new(BufferPolicy::Medium);
        let units = push_all(
            &mut buffer,
            &["one ", "two ", "three ", "four ", "five, ", "six."],
        );
        assert_eq!(units, vec!["one two three four ", "five, six."]);
    }

    #[test]
    fn test_medium_terminator_rule_alone() {
        let mut buffer = TextBuffer::new(BufferPolicy::Medium);
        assert!(buffer.push("Sure").is_empty());
        assert_eq!(buffer.push("!"), vec!["Sure!"]);
    }

    #[test]
    fn test_medium_units_end_in_terminator_or_residue() {
        let mut buffer = TextBuffer::new(BufferPolicy::Medium);
        let units = push_all(&mut buffer, &["It opens at nine. Come ", "early"]);
        let (residue, flushed) = units.split_last().unwrap();
        for unit in flushed {
            let last = unit.trim_end().chars().last().unwrap_or(' ');
            assert!(
                SENTENCE_TERMINATORS.contains(&last) || unit.ends_with(char::is_whitespace),
                "unexpected unit boundary: {unit:?}"
            );
        }
        assert_eq!(residue, "Come early");
    }

    #[test]
    fn test_high_flushes_only_at_terminators() {
        let mut buffer = TextBuffer::new(BufferPolicy::High);
        assert!(buffer.push("One two three four five ").is_empty());
        assert_eq!(buffer.push("six. seven"), vec!["One two three four five six."]);
        assert_eq!(buffer.finish(), Some(" seven".to_string()));
    }

    #[test]
    fn test_residue_flushed_on_finish() {
        let mut buffer = TextBuffer::new(BufferPolicy::Medium);
        assert!(buffer.push("no boundary here").is_empty());
        assert_eq!(buffer.finish(), Some("no boundary here".to_string()));
        assert!(buffer.finish().is_none());
    }

    #[test]
    fn test_concatenation_preserved_across_chunkings() {
        let text = "The branch opens at nine; parking is free. Bring your documents, \
                    ideally originals! Anything else?";
        for policy in [
            BufferPolicy::None,
            BufferPolicy::Low,
            BufferPolicy::Medium,
            BufferPolicy::High,
        ] {
            // One pass
            let mut one_pass = TextBuffer::new(policy);
            let whole = push_all(&mut one_pass, &[text]).concat();
            assert_eq!(whole, text, "one-pass lost text under {policy:?}");

            // Character-by-character
            let tokens: Vec<String> = text.chars().map(String::from).collect();
            let token_refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
            let mut chunked = TextBuffer::new(policy);
            let rejoined = push_all(&mut chunked, &token_refs).concat();
            assert_eq!(rejoined, text, "chunked pass lost text under {policy:?}");
        }
    }
}
