//! Event fan-out for the orchestrator.

use parley_protocol::events::Event;
use parley_protocol::events::EventMsg;
use parley_protocol::events::RoundCommittedEvent;
use parley_protocol::events::SessionCompletedEvent;
use parley_protocol::events::SessionEnd;
use parley_protocol::events::SessionEscalatedEvent;
use parley_protocol::events::SessionStartedEvent;
use parley_protocol::events::TurnCompletedEvent;
use parley_protocol::events::TurnFailedEvent;
use tokio::sync::mpsc::UnboundedSender;

/// Builds events tagged with a session id and forwards them to the driver,
/// if one is listening.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    session_id: String,
    tx: Option<UnboundedSender<Event>>,
}

impl EventEmitter {
    pub fn new(session_id: String, tx: Option<UnboundedSender<Event>>) -> Self {
        Self { session_id, tx }
    }

    fn emit(&self, msg: EventMsg) {
        let Some(tx) = &self.tx else {
            return;
        };
        // A driver that stopped listening does not affect the session.
        let _ = tx.send(Event {
            id: self.session_id.clone(),
            msg,
        });
    }

    pub fn session_started(
        &self,
        initiator: &str,
        responder: &str,
        resumed_rounds: u32,
        max_turns: u32,
    ) {
        self.emit(EventMsg::SessionStarted(SessionStartedEvent {
            initiator: initiator.to_string(),
            responder: responder.to_string(),
            resumed_rounds,
            max_turns,
        }));
    }

    pub fn turn_completed(&self, round: u32, participant: &str, content: &str) {
        self.emit(EventMsg::TurnCompleted(TurnCompletedEvent {
            round,
            participant: participant.to_string(),
            content: content.to_string(),
        }));
    }

    pub fn round_committed(&self, round: u32, history_len: usize) {
        self.emit(EventMsg::RoundCommitted(RoundCommittedEvent {
            round,
            history_len,
        }));
    }

    pub fn session_escalated(&self, round: u32, participant: &str, handled_by: Option<String>) {
        self.emit(EventMsg::SessionEscalated(SessionEscalatedEvent {
            round,
            participant: participant.to_string(),
            handled_by,
        }));
    }

    pub fn turn_failed(&self, round: u32, participant: &str, reason: String) {
        self.emit(EventMsg::TurnFailed(TurnFailedEvent {
            round,
            participant: participant.to_string(),
            reason,
        }));
    }

    pub fn session_completed(&self, rounds: u32, end: SessionEnd) {
        self.emit(EventMsg::SessionCompleted(SessionCompletedEvent { rounds, end }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn events_carry_the_session_id() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let emitter = EventEmitter::new("s-9".to_string(), Some(tx));
        emitter.round_committed(1, 2);
        assert_eq!(
            rx.try_recv().ok(),
            Some(Event {
                id: "s-9".to_string(),
                msg: EventMsg::RoundCommitted(RoundCommittedEvent {
                    round: 1,
                    history_len: 2,
                }),
            })
        );
    }

    #[test]
    fn closed_receiver_is_ignored() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        let emitter = EventEmitter::new("s-9".to_string(), Some(tx));
        emitter.session_completed(0, SessionEnd::Cancelled);
        EventEmitter::new("s-10".to_string(), None).session_completed(0, SessionEnd::Completed);
    }
}
