//! A single conversation: its id, history log and state, plus what a run of
//! it produced.

use std::collections::VecDeque;

use parley_core::ConversationHistory;
use parley_core::Transcript;
use parley_core::error::HistoryError;
use parley_protocol::Message;
use parley_protocol::StructuredOutput;
use parley_protocol::events::SessionEnd;

use crate::state::SessionState;

/// One conversation. Its history is only ever appended to by the orchestrator
/// running it, one whole round at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: String,
    history: ConversationHistory,
    pub(crate) state: SessionState,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            history: ConversationHistory::new(),
            state: SessionState::new(),
        }
    }

    /// Continues a conversation from an already committed history.
    pub fn resume(id: impl Into<String>, history: ConversationHistory) -> Self {
        let state = SessionState::resume(&history);
        Self {
            id: id.into(),
            history,
            state,
        }
    }

    pub fn from_transcript(transcript: Transcript) -> Result<Self, HistoryError> {
        let id = transcript.session_id.clone();
        Ok(Self::resume(id, transcript.into_history()?))
    }

    pub fn to_transcript(&self) -> Transcript {
        Transcript::new(self.id.clone(), &self.history)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The single commit of a round: initiator message first.
    pub(crate) fn commit_round(&mut self, initiator: Message, responder: Message) {
        self.history.append([initiator, responder]);
        self.state.round_committed();
    }
}

/// Queued driver utterances that open rounds. Once they run out, rounds are
/// opened with the last committed reply instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtteranceSource {
    seeds: VecDeque<String>,
}

impl UtteranceSource {
    pub fn new(seeds: impl IntoIterator<Item = String>) -> Self {
        Self {
            seeds: seeds.into_iter().collect(),
        }
    }

    pub fn next_seed(&mut self) -> Option<String> {
        self.seeds.pop_front()
    }

    pub fn remaining(&self) -> usize {
        self.seeds.len()
    }
}

/// Both validated outputs of a committed round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundRecord {
    pub round: u32,
    pub initiator: String,
    pub initiator_output: StructuredOutput,
    pub responder: String,
    pub responder_output: StructuredOutput,
}

impl RoundRecord {
    /// The initiator's output with its reply slot filled from the responder.
    pub fn composed(&self) -> StructuredOutput {
        let mut output = self.initiator_output.clone();
        output.attach_reply(self.responder_output.content());
        output
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escalation {
    pub round: u32,
    /// Participant whose output carried the flag.
    pub raised_by: String,
    pub handled_by: Option<String>,
    /// Output of the hand-off participant. Not committed to history.
    pub resolution: Option<StructuredOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub session: Session,
    pub end: SessionEnd,
    /// Rounds completed by this run (resumed rounds are not repeated here).
    pub rounds: Vec<RoundRecord>,
    pub escalation: Option<Escalation>,
}

impl SessionOutcome {
    pub fn history(&self) -> &ConversationHistory {
        self.session.history()
    }

    pub fn last_round(&self) -> Option<&RoundRecord> {
        self.rounds.last()
    }
}
