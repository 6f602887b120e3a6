use parley_core::AgentInvocationError;
use parley_core::ProtocolViolation;
use parley_core::ValidationError;
use thiserror::Error;

use crate::session::RoundRecord;
use crate::session::Session;

/// Why a turn could not be completed.
///
/// Output that parsed as a JSON object but broke its shape's field table is a
/// `Validation` failure. Output that could not be read as an object at all is
/// reported as an `Invocation` failure, alongside backend errors and timeouts.
#[derive(Error, Debug)]
pub enum TurnFailure {
    #[error("validation failed: {0}")]
    Validation(ValidationError),

    #[error("invocation failed: {0}")]
    Invocation(AgentInvocationError),

    #[error("protocol violation: {0}")]
    Protocol(ProtocolViolation),
}

impl From<AgentInvocationError> for TurnFailure {
    fn from(err: AgentInvocationError) -> Self {
        match err {
            AgentInvocationError::InvalidInput(v) => TurnFailure::Validation(v),
            AgentInvocationError::InvalidOutput(v) if !v.is_unparseable() => {
                TurnFailure::Validation(v)
            }
            other => TurnFailure::Invocation(other),
        }
    }
}

/// A failed turn, annotated with where it happened.
#[derive(Error, Debug)]
#[error("round {round} failed at `{participant}`: {kind}")]
pub struct SessionError {
    pub round: u32,
    pub participant: String,
    pub kind: TurnFailure,
}

impl SessionError {
    pub fn new(round: u32, participant: impl Into<String>, kind: impl Into<TurnFailure>) -> Self {
        Self {
            round,
            participant: participant.into(),
            kind: kind.into(),
        }
    }

    pub fn is_invocation_error(&self) -> bool {
        matches!(self.kind, TurnFailure::Invocation(_))
    }
}

impl From<ValidationError> for TurnFailure {
    fn from(err: ValidationError) -> Self {
        TurnFailure::Validation(err)
    }
}

impl From<ProtocolViolation> for TurnFailure {
    fn from(err: ProtocolViolation) -> Self {
        TurnFailure::Protocol(err)
    }
}

/// A session halted by a failed turn. The session is handed back with its
/// history exactly as it was before the failing round, so it can be resumed.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct SessionFailure {
    #[source]
    pub error: SessionError,
    pub session: Session,
    /// Rounds completed by this run before the failure.
    pub rounds: Vec<RoundRecord>,
}
