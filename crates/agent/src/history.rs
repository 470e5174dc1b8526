//! Per-session conversation history

use dashmap::DashMap;

use voice_loop_core::HistoryMessage;

/// Ordered message log keyed by session id, with a soft cap per session.
///
/// When the cap is exceeded the oldest messages are discarded.
pub struct ConversationStore {
    conversations: DashMap<String, Vec<HistoryMessage>>,
    max_messages: usize,
}

impl ConversationStore {
    pub fn new(max_messages: usize) -> Self {
        Self {
            conversations: DashMap::new(),
            max_messages: max_messages.max(1),
        }
    }

    /// Append a message to a session's log
    pub fn append(&self, session_id: &str, message: HistoryMessage) {
        let mut entry = self
            .conversations
            .entry(session_id.to_string())
            .or_default();
        entry.push(message);
        let len = entry.len();
        if len > self.max_messages {
            entry.drain(..len - self.max_messages);
        }
    }

    /// The last `n` messages for a session, oldest first
    pub fn tail(&self, session_id: &str, n: usize) -> Vec<HistoryMessage> {
        self.conversations
            .get(session_id)
            .map(|messages| {
                let start = messages.len().saturating_sub(n);
                messages[start..].to_vec()
            })
            .unwrap_or_default()
    }

    /// Number of stored messages for a session
    pub fn len(&self, session_id: &str) -> usize {
        self.conversations
            .get(session_id)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Is the session's log empty?
    pub fn is_empty(&self, session_id: &str) -> bool {
        self.len(session_id) == 0
    }

    /// Drop a session's log
    pub fn remove(&self, session_id: &str) {
        self.conversations.remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_tail() {
        let store = ConversationStore::new(10);
        store.append("s1", HistoryMessage::user("one"));
        store.append("s1", HistoryMessage::assistant("two"));
        store.append("s1", HistoryMessage::user("three"));

        let tail = store.tail("s1", 2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].content, "two");
        assert_eq!(tail[1].content, "three");
    }

    #[test]
    fn test_soft_cap_drops_oldest() {
        let store = ConversationStore::new(3);
        for i in 0..5 {
            store.append("s1", HistoryMessage::user(format!("msg {i}")));
        }

        assert_eq!(store.len("s1"), 3);
        assert_eq!(store.tail("s1", 10)[0].content, "msg 2");
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = ConversationStore::new(10);
        store.append("s1", HistoryMessage::user("for s1"));

        assert!(store.is_empty("s2"));
        assert_eq!(store.len("s1"), 1);
    }

    #[test]
    fn test_remove() {
        let store = ConversationStore::new(10);
        store.append("s1", HistoryMessage::user("hello"));
        store.remove("s1");
        assert!(store.is_empty("s1"));
    }
}
