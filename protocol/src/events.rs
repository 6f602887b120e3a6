//! Session lifecycle events emitted by the turn orchestrator.

use serde::Deserialize;
use serde::Serialize;

/// Event tagged with the id of the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub msg: EventMsg,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventMsg {
    SessionStarted(SessionStartedEvent),
    TurnCompleted(TurnCompletedEvent),
    RoundCommitted(RoundCommittedEvent),
    SessionEscalated(SessionEscalatedEvent),
    TurnFailed(TurnFailedEvent),
    SessionCompleted(SessionCompletedEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStartedEvent {
    pub initiator: String,
    pub responder: String,
    /// Rounds already present in a resumed history.
    pub resumed_rounds: u32,
    pub max_turns: u32,
}

/// One validated turn. The round it belongs to is not committed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnCompletedEvent {
    pub round: u32,
    pub participant: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundCommittedEvent {
    pub round: u32,
    pub history_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEscalatedEvent {
    pub round: u32,
    /// Participant whose output raised the flag.
    pub participant: String,
    /// Participant the session was handed to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handled_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnFailedEvent {
    pub round: u32,
    pub participant: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCompletedEvent {
    pub rounds: u32,
    pub end: SessionEnd,
}

/// How a session reached its terminal state without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    /// The turn budget was used up.
    Completed,
    Escalated,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event {
            id: "s-1".to_string(),
            msg: EventMsg::SessionCompleted(SessionCompletedEvent {
                rounds: 2,
                end: SessionEnd::Escalated,
            }),
        };
        let value = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(
            value,
            serde_json::json!({
                "id": "s-1",
                "msg": {"type": "session_completed", "rounds": 2, "end": "escalated"}
            })
        );
    }
}
