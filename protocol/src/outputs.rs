//! Output shapes agents are allowed to produce.
//!
//! Each shape is a plain struct plus an explicit field table. The table is
//! what validators check raw backend output against, and it is the only place
//! where defaults for optional fields are declared.

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Output of a user simulator: the query to forward plus a slot for the
/// other side's response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UserQueryOutput {
    /// The user's query or statement.
    pub user_query: String,
    /// The response received from the support side, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_response: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SupportOutput {
    /// The support agent's response.
    pub response: String,
    /// True if the issue needs a specialist.
    #[serde(default)]
    pub escalate_to_specialist: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct QuestionOutput {
    /// The question being asked.
    pub query: String,
    /// The answer received from the responder, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_from_responder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AnswerOutput {
    /// The answer to the question.
    pub answer: String,
}

/// A stance-consistent debate contribution. Carries no decision field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DebateOutput {
    pub utterance: String,
}

/// Output of the participant that takes over an escalated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SpecialistOutput {
    pub resolution: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Bool,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Bool => "boolean",
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Bool => value.is_boolean(),
        }
    }
}

/// Value an optional field takes when the producer leaves it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    /// The field stays empty (an unfilled slot).
    Absent,
    Bool(bool),
}

impl FieldDefault {
    pub fn to_value(self) -> Option<Value> {
        match self {
            FieldDefault::Absent => None,
            FieldDefault::Bool(b) => Some(Value::Bool(b)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional(FieldDefault),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub requirement: Requirement,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            requirement: Requirement::Required,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind, default: FieldDefault) -> Self {
        Self {
            name,
            kind,
            requirement: Requirement::Optional(default),
        }
    }

    pub fn is_required(&self) -> bool {
        self.requirement == Requirement::Required
    }
}

const USER_QUERY_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("user_query", FieldKind::String),
    FieldSpec::optional("support_response", FieldKind::String, FieldDefault::Absent),
];

const SUPPORT_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("response", FieldKind::String),
    FieldSpec::optional(
        "escalate_to_specialist",
        FieldKind::Bool,
        FieldDefault::Bool(false),
    ),
];

const QUESTION_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("query", FieldKind::String),
    FieldSpec::optional(
        "response_from_responder",
        FieldKind::String,
        FieldDefault::Absent,
    ),
];

const ANSWER_FIELDS: &[FieldSpec] = &[FieldSpec::required("answer", FieldKind::String)];

const DEBATE_FIELDS: &[FieldSpec] = &[FieldSpec::required("utterance", FieldKind::String)];

const SPECIALIST_FIELDS: &[FieldSpec] = &[FieldSpec::required("resolution", FieldKind::String)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputShapeKind {
    UserQuery,
    Support,
    Question,
    Answer,
    Debate,
    Specialist,
}

impl OutputShapeKind {
    pub fn name(self) -> &'static str {
        match self {
            OutputShapeKind::UserQuery => "user_query",
            OutputShapeKind::Support => "support",
            OutputShapeKind::Question => "question",
            OutputShapeKind::Answer => "answer",
            OutputShapeKind::Debate => "debate",
            OutputShapeKind::Specialist => "specialist",
        }
    }

    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            OutputShapeKind::UserQuery => USER_QUERY_FIELDS,
            OutputShapeKind::Support => SUPPORT_FIELDS,
            OutputShapeKind::Question => QUESTION_FIELDS,
            OutputShapeKind::Answer => ANSWER_FIELDS,
            OutputShapeKind::Debate => DEBATE_FIELDS,
            OutputShapeKind::Specialist => SPECIALIST_FIELDS,
        }
    }

    /// Debate participants speak free text; a non-JSON reply becomes the
    /// utterance.
    pub fn accepts_plain_text(self) -> bool {
        matches!(self, OutputShapeKind::Debate)
    }

    /// JSON schema handed to the backend so it can request structured output.
    pub fn json_schema(self) -> Value {
        let schema = match self {
            OutputShapeKind::UserQuery => schemars::schema_for!(UserQueryOutput),
            OutputShapeKind::Support => schemars::schema_for!(SupportOutput),
            OutputShapeKind::Question => schemars::schema_for!(QuestionOutput),
            OutputShapeKind::Answer => schemars::schema_for!(AnswerOutput),
            OutputShapeKind::Debate => schemars::schema_for!(DebateOutput),
            OutputShapeKind::Specialist => schemars::schema_for!(SpecialistOutput),
        };
        serde_json::to_value(schema).unwrap_or_default()
    }

    /// Deserializes an already field-checked JSON object into the typed shape.
    pub fn decode(self, value: Value) -> Result<StructuredOutput, serde_json::Error> {
        Ok(match self {
            OutputShapeKind::UserQuery => StructuredOutput::UserQuery(serde_json::from_value(value)?),
            OutputShapeKind::Support => StructuredOutput::Support(serde_json::from_value(value)?),
            OutputShapeKind::Question => StructuredOutput::Question(serde_json::from_value(value)?),
            OutputShapeKind::Answer => StructuredOutput::Answer(serde_json::from_value(value)?),
            OutputShapeKind::Debate => StructuredOutput::Debate(serde_json::from_value(value)?),
            OutputShapeKind::Specialist => {
                StructuredOutput::Specialist(serde_json::from_value(value)?)
            }
        })
    }
}

/// Validated result of one agent turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredOutput {
    UserQuery(UserQueryOutput),
    Support(SupportOutput),
    Question(QuestionOutput),
    Answer(AnswerOutput),
    Debate(DebateOutput),
    Specialist(SpecialistOutput),
}

impl StructuredOutput {
    pub fn kind(&self) -> OutputShapeKind {
        match self {
            StructuredOutput::UserQuery(_) => OutputShapeKind::UserQuery,
            StructuredOutput::Support(_) => OutputShapeKind::Support,
            StructuredOutput::Question(_) => OutputShapeKind::Question,
            StructuredOutput::Answer(_) => OutputShapeKind::Answer,
            StructuredOutput::Debate(_) => OutputShapeKind::Debate,
            StructuredOutput::Specialist(_) => OutputShapeKind::Specialist,
        }
    }

    /// Text committed to history for this turn.
    pub fn content(&self) -> &str {
        match self {
            StructuredOutput::UserQuery(o) => &o.user_query,
            StructuredOutput::Support(o) => &o.response,
            StructuredOutput::Question(o) => &o.query,
            StructuredOutput::Answer(o) => &o.answer,
            StructuredOutput::Debate(o) => &o.utterance,
            StructuredOutput::Specialist(o) => &o.resolution,
        }
    }

    /// Field forwarded to the next participant when this output opens a
    /// round. Pure responders have nothing to forward.
    pub fn forwardable(&self) -> Option<&str> {
        match self {
            StructuredOutput::UserQuery(o) => Some(&o.user_query),
            StructuredOutput::Question(o) => Some(&o.query),
            StructuredOutput::Debate(o) => Some(&o.utterance),
            StructuredOutput::Support(_)
            | StructuredOutput::Answer(_)
            | StructuredOutput::Specialist(_) => None,
        }
    }

    /// Decision flag asking for escalation, for shapes that declare one.
    pub fn escalation_flag(&self) -> Option<bool> {
        match self {
            StructuredOutput::Support(o) => Some(o.escalate_to_specialist),
            _ => None,
        }
    }

    /// Fills the reply slot of an initiating shape. Returns false when the
    /// shape has no such slot.
    pub fn attach_reply(&mut self, reply: &str) -> bool {
        match self {
            StructuredOutput::UserQuery(o) => {
                o.support_response = Some(reply.to_string());
                true
            }
            StructuredOutput::Question(o) => {
                o.response_from_responder = Some(reply.to_string());
                true
            }
            _ => false,
        }
    }
}
