//! Append-only conversation log shared (read-only) with agents.

use std::ops::Deref;
use std::sync::Arc;

use parley_protocol::Message;

use crate::error::HistoryError;

/// Ordered log of committed messages. Only the orchestrator of the owning
/// session appends to it; agents see [`HistorySnapshot`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    messages: Arc<Vec<Message>>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a log from a persisted sequence. Each round contributes one
    /// message per side, so an odd-length sequence cannot be resumed.
    pub fn from_messages(messages: Vec<Message>) -> Result<Self, HistoryError> {
        if messages.len() % 2 != 0 {
            return Err(HistoryError::UnpairedRound {
                len: messages.len(),
            });
        }
        Ok(Self {
            messages: Arc::new(messages),
        })
    }

    /// Appends `messages` in order. Snapshots taken earlier keep their
    /// contents: the shared buffer is copied if any snapshot still holds it.
    pub fn append(&mut self, messages: impl IntoIterator<Item = Message>) {
        Arc::make_mut(&mut self.messages).extend(messages);
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            messages: Arc::clone(&self.messages),
        }
    }

    /// Snapshot of the log followed by `pending` messages that are not (yet)
    /// committed. The log itself is left untouched.
    pub fn snapshot_with(&self, pending: impl IntoIterator<Item = Message>) -> HistorySnapshot {
        let mut messages = self.messages.as_ref().clone();
        messages.extend(pending);
        HistorySnapshot {
            messages: Arc::new(messages),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of complete rounds in the log.
    pub fn rounds(&self) -> u32 {
        u32::try_from(self.messages.len() / 2).unwrap_or(u32::MAX)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        Arc::try_unwrap(self.messages).unwrap_or_else(|shared| (*shared).clone())
    }
}

/// Immutable point-in-time view of a [`ConversationHistory`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistorySnapshot {
    messages: Arc<Vec<Message>>,
}

impl HistorySnapshot {
    pub fn to_vec(&self) -> Vec<Message> {
        self.messages.to_vec()
    }
}

impl Deref for HistorySnapshot {
    type Target = [Message];

    fn deref(&self) -> &Self::Target {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    fn round(n: u32) -> [Message; 2] {
        [
            Message::new("user", format!("question {n}")),
            Message::new("support", format!("answer {n}")),
        ]
    }

    #[test]
    fn snapshot_does_not_see_later_appends() {
        let mut history = ConversationHistory::new();
        history.append(round(1));
        let before = history.snapshot();

        history.append(round(2));

        assert_eq!(before.len(), 2);
        assert_eq!(history.len(), 4);
        assert_eq!(before[1].content(), "answer 1");
        assert_eq!(history.snapshot()[3].content(), "answer 2");
    }

    #[test]
    fn pending_view_leaves_log_unchanged() {
        let mut history = ConversationHistory::new();
        history.append(round(1));

        let view = history.snapshot_with([Message::new("user", "question 2")]);

        assert_eq!(view.len(), 3);
        assert_eq!(view[2], Message::new("user", "question 2"));
        assert_eq!(history.len(), 2);
        assert_eq!(history.snapshot().len(), 2);
    }

    #[test]
    fn snapshots_without_appends_are_identical() {
        let mut history = ConversationHistory::new();
        history.append(round(1));
        assert_eq!(history.snapshot(), history.snapshot());
        assert_eq!(history.snapshot().to_vec(), history.messages().to_vec());
    }

    #[test]
    fn append_preserves_call_order() {
        let mut history = ConversationHistory::new();
        history.append(round(1));
        history.append(round(2));
        let senders: Vec<&str> = history.messages().iter().map(Message::sender).collect();
        assert_eq!(senders, vec!["user", "support", "user", "support"]);
        assert_eq!(history.rounds(), 2);
    }

    #[test]
    fn from_messages_rejects_half_rounds() {
        let mut messages = round(1).to_vec();
        messages.push(Message::new("user", "dangling"));
        assert_matches!(
            ConversationHistory::from_messages(messages),
            Err(HistoryError::UnpairedRound { len: 3 })
        );
    }

    #[test]
    fn from_messages_counts_rounds() {
        let messages: Vec<Message> = (1..=3).flat_map(round).collect();
        let history = ConversationHistory::from_messages(messages.clone())
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(history.rounds(), 3);
        assert_eq!(history.into_messages(), messages);
    }
}
