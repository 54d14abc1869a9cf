//! The append-only record of a conversation.

use std::slice;

use agenthub_model::ModelMessage;

/// An ordered, append-only log of conversation messages.
///
/// Message order is the single source of truth for conversational
/// causality. The log never reorders or deduplicates anything, and there
/// is no way to remove a message once appended.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageLog {
    messages: Vec<ModelMessage>,
}

impl MessageLog {
    /// Creates an empty log.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message at the end of the log.
    #[inline]
    pub fn append(&mut self, message: ModelMessage) {
        trace!("appending message: {message:?}");
        self.messages.push(message);
    }

    /// Returns the ordered messages for sending to the model.
    #[inline]
    pub fn snapshot(&self) -> Vec<ModelMessage> {
        self.messages.clone()
    }

    /// Returns the messages without copying them.
    #[inline]
    pub fn messages(&self) -> &[ModelMessage] {
        &self.messages
    }

    /// Iterates over the messages in order.
    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, ModelMessage> {
        self.messages.iter()
    }

    /// Returns the most recent message.
    #[inline]
    pub fn last(&self) -> Option<&ModelMessage> {
        self.messages.last()
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if nothing has been appended yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Consumes the log and returns the messages.
    #[inline]
    pub fn into_messages(self) -> Vec<ModelMessage> {
        self.messages
    }
}

impl<'a> IntoIterator for &'a MessageLog {
    type Item = &'a ModelMessage;
    type IntoIter = slice::Iter<'a, ModelMessage>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use agenthub_model::{AssistantMessage, ToolCallResult};

    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut log = MessageLog::new();
        log.append(ModelMessage::user("first"));
        log.append(ModelMessage::Assistant(AssistantMessage::default()));
        log.append(ModelMessage::user("first"));

        let contents: Vec<_> = log.iter().map(|msg| msg.content()).collect();
        assert_eq!(contents, vec![Some("first"), None, Some("first")]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_snapshot_is_idempotent() {
        let mut log = MessageLog::new();
        log.append(ModelMessage::user("hi"));
        log.append(ModelMessage::Tool(ToolCallResult {
            id: "c1".to_owned(),
            name: "finish".to_owned(),
            content: "done".to_owned(),
        }));

        let first = log.snapshot();
        let second = log.snapshot();
        assert_eq!(first, second);
        assert_eq!(first, log.messages());
    }
}
