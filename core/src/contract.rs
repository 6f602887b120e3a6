//! Per-role agent contracts: what a participant consumes, what it must
//! produce and the instruction it follows.

use std::fmt;
use std::str::FromStr;

use parley_protocol::InputEnvelope;
use parley_protocol::OutputShapeKind;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    UserSimulator,
    Support,
    Questioner,
    Responder,
    DebateParticipant,
    Specialist,
}

impl AgentRole {
    pub const ALL: [AgentRole; 6] = [
        AgentRole::UserSimulator,
        AgentRole::Support,
        AgentRole::Questioner,
        AgentRole::Responder,
        AgentRole::DebateParticipant,
        AgentRole::Specialist,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AgentRole::UserSimulator => "user_simulator",
            AgentRole::Support => "support",
            AgentRole::Questioner => "questioner",
            AgentRole::Responder => "responder",
            AgentRole::DebateParticipant => "debate_participant",
            AgentRole::Specialist => "specialist",
        }
    }

    pub fn produces(self) -> OutputShapeKind {
        match self {
            AgentRole::UserSimulator => OutputShapeKind::UserQuery,
            AgentRole::Support => OutputShapeKind::Support,
            AgentRole::Questioner => OutputShapeKind::Question,
            AgentRole::Responder => OutputShapeKind::Answer,
            AgentRole::DebateParticipant => OutputShapeKind::Debate,
            AgentRole::Specialist => OutputShapeKind::Specialist,
        }
    }

    pub fn consumes(self) -> InputShape {
        match self {
            AgentRole::UserSimulator | AgentRole::Questioner | AgentRole::DebateParticipant => {
                InputShape::Utterance
            }
            AgentRole::Support | AgentRole::Responder | AgentRole::Specialist => {
                InputShape::Message
            }
        }
    }

    pub fn default_instruction(self) -> &'static str {
        match self {
            AgentRole::UserSimulator => {
                "You are a user experiencing a technical issue. Explain your problem clearly \
                 and respond to the support agent's questions."
            }
            AgentRole::Support => {
                "You are a helpful and patient support agent. Understand the user's problem and \
                 provide solutions. If you cannot solve it, set escalate_to_specialist."
            }
            AgentRole::Questioner => "You are a curious questioner. Ask a question and wait for an answer.",
            AgentRole::Responder => {
                "You are a helpful assistant. Provide concise and accurate answers to questions."
            }
            AgentRole::DebateParticipant => {
                "You are in a debate. Argue consistently from the stance you were assigned."
            }
            AgentRole::Specialist => {
                "You are a specialist taking over an escalated case. Resolve it or state the next step."
            }
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentRole::ALL
            .into_iter()
            .find(|role| role.name() == s)
            .ok_or_else(|| format!("unknown agent role `{s}`"))
    }
}

/// Kind of input envelope a role accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    /// Free utterance, either from the driver or from another participant.
    Utterance,
    /// A message forwarded from another participant.
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentContract {
    pub role: AgentRole,
    pub consumes: InputShape,
    pub produces: OutputShapeKind,
    pub system_instruction: String,
}

impl AgentContract {
    pub fn for_role(role: AgentRole) -> Self {
        Self {
            role,
            consumes: role.consumes(),
            produces: role.produces(),
            system_instruction: role.default_instruction().to_string(),
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    pub fn output_schema(&self) -> Value {
        self.produces.json_schema()
    }

    pub fn check_input(&self, input: &InputEnvelope) -> Result<(), ValidationError> {
        if input.content.trim().is_empty() {
            return Err(ValidationError::EmptyField {
                shape: "input",
                field: "content",
            });
        }
        if self.consumes == InputShape::Message && input.is_seed() {
            return Err(ValidationError::SeedNotAccepted {
                role: self.role.name(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    #[test]
    fn roles_round_trip_through_names() {
        for role in AgentRole::ALL {
            assert_eq!(role.name().parse::<AgentRole>(), Ok(role));
        }
        assert!("moderator".parse::<AgentRole>().is_err());
    }

    #[test]
    fn support_contract_requires_participant_input() {
        let contract = AgentContract::for_role(AgentRole::Support);
        assert_eq!(contract.produces, OutputShapeKind::Support);
        assert_matches!(
            contract.check_input(&InputEnvelope::seed("support", "hello")),
            Err(ValidationError::SeedNotAccepted { role: "support" })
        );
        assert_eq!(
            contract.check_input(&InputEnvelope::new("user", "support", "hello")),
            Ok(())
        );
    }

    #[test]
    fn empty_input_is_rejected() {
        let contract = AgentContract::for_role(AgentRole::UserSimulator);
        assert_matches!(
            contract.check_input(&InputEnvelope::seed("user", "   ")),
            Err(ValidationError::EmptyField { field: "content", .. })
        );
    }

    #[test]
    fn instruction_can_be_overridden() {
        let contract = AgentContract::for_role(AgentRole::DebateParticipant)
            .with_system_instruction("Your name is John and you support the topic.");
        assert_eq!(
            contract.system_instruction,
            "Your name is John and you support the topic."
        );
    }
}
