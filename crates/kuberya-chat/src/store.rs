//! Append-only message log for the open conversation.

use kuberya_core::types::Message;

/// Ordered messages of the currently open conversation.
///
/// Never reorders and never deduplicates. Reads always return every
/// message in append order.
#[derive(Debug, Default, Clone)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Drop every message. Returns how many were discarded.
    pub fn reset(&mut self) -> usize {
        let discarded = self.messages.len();
        self.messages.clear();
        discarded
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Most recent user message, if any.
    pub fn last_user(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_user())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuberya_core::types::Author;

    #[test]
    fn test_append_preserves_order() {
        let mut store = MessageStore::new();
        store.append(Message::user("one", vec![]));
        store.append(Message::assistant("two"));
        store.append(Message::user("three", vec![]));

        let texts: Vec<&str> = store.all().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_append_does_not_deduplicate() {
        let mut store = MessageStore::new();
        let msg = Message::user("same", vec![]);
        store.append(msg.clone());
        store.append(msg);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_reset_empties_and_counts() {
        let mut store = MessageStore::new();
        store.append(Message::user("a", vec![]));
        store.append(Message::assistant("b"));
        assert_eq!(store.reset(), 2);
        assert!(store.is_empty());
        assert_eq!(store.reset(), 0);
    }

    #[test]
    fn test_last_user_skips_assistant() {
        let mut store = MessageStore::new();
        assert!(store.last_user().is_none());
        store.append(Message::user("question", vec![]));
        store.append(Message::assistant("answer"));
        assert_eq!(store.last().unwrap().author, Author::Assistant);
        assert_eq!(store.last_user().unwrap().text, "question");
    }
}
