//! Checks raw backend output against an output shape's field table.

use parley_protocol::OutputShapeKind;
use parley_protocol::StructuredOutput;
use parley_protocol::outputs::Requirement;
use serde_json::Map;
use serde_json::Value;

use crate::error::ValidationError;

/// Turns raw backend output into a typed [`StructuredOutput`] or rejects it.
pub trait OutputValidator: Send + Sync {
    fn validate(&self, raw: &str, shape: OutputShapeKind)
    -> Result<StructuredOutput, ValidationError>;
}

/// Validator for JSON object replies. Missing optional fields receive the
/// default declared in the shape's field table; anything undeclared is
/// rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonOutputValidator;

impl OutputValidator for JsonOutputValidator {
    fn validate(
        &self,
        raw: &str,
        shape: OutputShapeKind,
    ) -> Result<StructuredOutput, ValidationError> {
        let shape_name = shape.name();
        let text = raw.trim();
        let mut object = match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => map,
            Ok(Value::String(decoded))
                if shape.accepts_plain_text() && !decoded.trim().is_empty() =>
            {
                plain_text_object(decoded.trim())
            }
            _ if shape.accepts_plain_text() && !text.is_empty() => plain_text_object(text),
            Ok(_) => return Err(ValidationError::NotAnObject { shape: shape_name }),
            Err(err) => {
                return Err(ValidationError::Malformed {
                    shape: shape_name,
                    message: err.to_string(),
                });
            }
        };

        let fields = shape.fields();
        if let Some(unknown) = object
            .keys()
            .find(|key| !fields.iter().any(|f| f.name == key.as_str()))
        {
            return Err(ValidationError::UnknownField {
                shape: shape_name,
                field: unknown.clone(),
            });
        }

        for field in fields {
            let missing = object.get(field.name).is_none_or(Value::is_null);
            if missing {
                match field.requirement {
                    Requirement::Required => {
                        return Err(ValidationError::MissingField {
                            shape: shape_name,
                            field: field.name,
                        });
                    }
                    Requirement::Optional(default) => {
                        object.remove(field.name);
                        if let Some(value) = default.to_value() {
                            object.insert(field.name.to_string(), value);
                        }
                    }
                }
                continue;
            }

            let Some(value) = object.get(field.name) else {
                continue;
            };
            if !field.kind.matches(value) {
                return Err(ValidationError::InvalidType {
                    shape: shape_name,
                    field: field.name,
                    expected: field.kind.name(),
                    found: json_type(value),
                });
            }
            if field.is_required() && value.as_str().is_some_and(|s| s.trim().is_empty()) {
                return Err(ValidationError::EmptyField {
                    shape: shape_name,
                    field: field.name,
                });
            }
        }

        shape
            .decode(Value::Object(object))
            .map_err(|err| ValidationError::Malformed {
                shape: shape_name,
                message: err.to_string(),
            })
    }
}

fn plain_text_object(text: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("utterance".to_string(), Value::String(text.to_string()));
    map
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use parley_protocol::outputs::DebateOutput;
    use parley_protocol::outputs::SupportOutput;
    use parley_protocol::outputs::UserQueryOutput;
    use pretty_assertions::assert_eq;

    fn validate(raw: &str, shape: OutputShapeKind) -> Result<StructuredOutput, ValidationError> {
        JsonOutputValidator.validate(raw, shape)
    }

    #[test]
    fn absent_optional_flag_takes_declared_default() {
        let output = validate(
            r#"{"response": "Try restarting your router"}"#,
            OutputShapeKind::Support,
        );
        assert_eq!(
            output,
            Ok(StructuredOutput::Support(SupportOutput {
                response: "Try restarting your router".to_string(),
                escalate_to_specialist: false,
            }))
        );
    }

    #[test]
    fn null_optional_flag_is_treated_as_absent() {
        let output = validate(
            r#"{"response": "ok", "escalate_to_specialist": null}"#,
            OutputShapeKind::Support,
        );
        assert_matches!(output, Ok(StructuredOutput::Support(SupportOutput { escalate_to_specialist: false, .. })));
    }

    #[test]
    fn string_flag_is_a_type_error() {
        let output = validate(
            r#"{"response": "ok", "escalate_to_specialist": "yes"}"#,
            OutputShapeKind::Support,
        );
        assert_eq!(
            output,
            Err(ValidationError::InvalidType {
                shape: "support",
                field: "escalate_to_specialist",
                expected: "boolean",
                found: "string",
            })
        );
    }

    #[test]
    fn missing_required_field_is_reported() {
        assert_eq!(
            validate(r#"{"support_response": "hi"}"#, OutputShapeKind::UserQuery),
            Err(ValidationError::MissingField {
                shape: "user_query",
                field: "user_query",
            })
        );
    }

    #[test]
    fn empty_required_string_is_rejected() {
        assert_matches!(
            validate(r#"{"answer": "  "}"#, OutputShapeKind::Answer),
            Err(ValidationError::EmptyField { field: "answer", .. })
        );
    }

    #[test]
    fn undeclared_fields_are_rejected() {
        assert_matches!(
            validate(r#"{"answer": "Paris", "confidence": 0.9}"#, OutputShapeKind::Answer),
            Err(ValidationError::UnknownField { field, .. }) if field == "confidence"
        );
    }

    #[test]
    fn non_json_is_malformed_except_for_debate() {
        assert_matches!(
            validate("Paris", OutputShapeKind::Answer),
            Err(ValidationError::Malformed { shape: "answer", .. })
        );
        assert_eq!(
            validate("AI is a tool, not a threat.", OutputShapeKind::Debate),
            Ok(StructuredOutput::Debate(DebateOutput {
                utterance: "AI is a tool, not a threat.".to_string(),
            }))
        );
    }

    #[test]
    fn quoted_debate_reply_is_unquoted() {
        assert_eq!(
            validate(r#""Remote work is here to stay.""#, OutputShapeKind::Debate),
            Ok(StructuredOutput::Debate(DebateOutput {
                utterance: "Remote work is here to stay.".to_string(),
            }))
        );
        assert_eq!(
            validate(r#""Paris""#, OutputShapeKind::Answer),
            Err(ValidationError::NotAnObject { shape: "answer" })
        );
    }

    #[test]
    fn arrays_are_not_objects() {
        assert_eq!(
            validate("[1, 2]", OutputShapeKind::Question),
            Err(ValidationError::NotAnObject { shape: "question" })
        );
    }

    #[test]
    fn optional_slot_stays_empty() {
        assert_eq!(
            validate(r#"{"user_query": "My internet is down"}"#, OutputShapeKind::UserQuery),
            Ok(StructuredOutput::UserQuery(UserQueryOutput {
                user_query: "My internet is down".to_string(),
                support_response: None,
            }))
        );
    }
}
