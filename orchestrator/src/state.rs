//! Session state machine bookkeeping.

use parley_core::ConversationHistory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    /// The initiating participant is producing its output.
    UserTurn,
    /// The responding participant is producing its output.
    AgentTurn,
    /// The round is committed and the policy decides what happens next.
    Evaluate,
    Escalated,
    Done,
}

impl Phase {
    /// Transitions the orchestrator may take. Every non-terminal phase may
    /// jump to `Done` on failure or cancellation.
    pub fn can_advance_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Init, Phase::UserTurn)
                | (Phase::UserTurn, Phase::AgentTurn)
                | (Phase::AgentTurn, Phase::Evaluate)
                | (Phase::Evaluate, Phase::UserTurn)
                | (Phase::Evaluate, Phase::Escalated)
                | (Phase::Init | Phase::UserTurn | Phase::AgentTurn, Phase::Done)
                | (Phase::Evaluate | Phase::Escalated, Phase::Done)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Continue,
    Escalated,
    Terminal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    turns_so_far: u32,
    phase: Phase,
    current_participant: Option<String>,
    status: SessionStatus,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            turns_so_far: 0,
            phase: Phase::Init,
            current_participant: None,
            status: SessionStatus::Continue,
        }
    }

    /// State of a session whose committed rounds are already in `history`.
    pub fn resume(history: &ConversationHistory) -> Self {
        Self {
            turns_so_far: history.rounds(),
            ..Self::new()
        }
    }

    /// Completed rounds.
    pub fn turns_so_far(&self) -> u32 {
        self.turns_so_far
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_participant(&self) -> Option<&str> {
        self.current_participant.as_deref()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status == SessionStatus::Terminal
    }

    pub(crate) fn advance(&mut self, next: Phase, participant: Option<&str>) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal transition {:?} -> {next:?}",
            self.phase
        );
        self.phase = next;
        self.current_participant = participant.map(str::to_string);
        match next {
            Phase::Escalated => self.status = SessionStatus::Escalated,
            Phase::Done => self.status = SessionStatus::Terminal,
            _ => {}
        }
    }

    pub(crate) fn round_committed(&mut self) {
        self.turns_so_far += 1;
    }

    /// Escalation hand-off happens inside `Escalated`; only the participant
    /// changes.
    pub(crate) fn hand_off(&mut self, participant: &str) {
        self.current_participant = Some(participant.to_string());
    }
}
