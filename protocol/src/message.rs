use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Sender id used for utterances supplied by the session driver rather than
/// produced by an agent.
pub const DRIVER_SENDER: &str = "driver";

/// One committed entry of a conversation. Messages are write-once: there are
/// accessors but no setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Message {
    sender: String,
    content: String,
}

impl Message {
    pub fn new(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
        }
    }

    /// Identifier of the participant that produced this message.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.sender, self.content)
    }
}

/// Input addressed to a single participant for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputEnvelope {
    /// Participant (or the driver) the content originates from.
    pub from: String,
    /// Participant expected to consume the envelope.
    pub to: String,
    pub content: String,
}

impl InputEnvelope {
    pub fn new(from: impl Into<String>, to: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            content: content.into(),
        }
    }

    /// Envelope carrying an externally supplied utterance.
    pub fn seed(to: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(DRIVER_SENDER, to, content)
    }

    pub fn is_seed(&self) -> bool {
        self.from == DRIVER_SENDER
    }

    /// JSON payload handed to the reasoning backend. Only `sender` and
    /// `content` are exposed, the addressee is implied by the call.
    pub fn to_payload(&self) -> String {
        serde_json::json!({
            "sender": self.from,
            "content": self.content,
        })
        .to_string()
    }
}
