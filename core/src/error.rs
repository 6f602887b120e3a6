use std::time::Duration;

use thiserror::Error;

/// Structured output (or an input envelope) does not conform to its declared
/// shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("output for `{shape}` is not valid JSON: {message}")]
    Malformed { shape: &'static str, message: String },

    #[error("output for `{shape}` must be a JSON object")]
    NotAnObject { shape: &'static str },

    #[error("output for `{shape}` is missing required field `{field}`")]
    MissingField {
        shape: &'static str,
        field: &'static str,
    },

    #[error("field `{field}` of `{shape}` must be a {expected}, got {found}")]
    InvalidType {
        shape: &'static str,
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("required field `{field}` of `{shape}` is empty")]
    EmptyField {
        shape: &'static str,
        field: &'static str,
    },

    #[error("output for `{shape}` has undeclared field `{field}`")]
    UnknownField { shape: &'static str, field: String },

    #[error("`{role}` only accepts messages from another participant")]
    SeedNotAccepted { role: &'static str },

    #[error("expected a `{expected}` output, got `{found}`")]
    ShapeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl ValidationError {
    /// True when the raw output could not be read as a JSON object at all, as
    /// opposed to an object that breaks its shape's field table.
    pub fn is_unparseable(&self) -> bool {
        matches!(
            self,
            ValidationError::Malformed { .. } | ValidationError::NotAnObject { .. }
        )
    }
}

/// An agent turn could not produce a validated output.
#[derive(Error, Debug)]
pub enum AgentInvocationError {
    /// Error from the reasoning backend. Carries the backend's message chain.
    #[error("reasoning backend failed: {0:#}")]
    Backend(anyhow::Error),

    #[error("no validated output within {0:?}")]
    Timeout(Duration),

    #[error("input rejected: {0}")]
    InvalidInput(ValidationError),

    #[error(transparent)]
    InvalidOutput(#[from] ValidationError),
}

/// An output lacks what the orchestrator needs to address the next turn.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("`{participant}` produced a `{shape}` output with nothing to forward")]
    MissingForwardable {
        participant: String,
        shape: &'static str,
    },

    #[error("no utterance available to open a round for `{participant}`")]
    NoUtterance { participant: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("history of {len} messages does not split into whole rounds")]
    UnpairedRound { len: usize },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown participant `{0}`")]
    UnknownParticipant(String),

    #[error("could not locate a home directory for parley")]
    NoHome,
}

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("transcript I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("transcript is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    History(#[from] HistoryError),
}
