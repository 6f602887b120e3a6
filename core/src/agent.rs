//! The capability every conversation participant implements.

use std::sync::Arc;

use async_trait::async_trait;
use parley_protocol::InputEnvelope;
use parley_protocol::StructuredOutput;
use tracing::debug;

use crate::backend::BackendRequest;
use crate::backend::ReasoningBackend;
use crate::contract::AgentContract;
use crate::error::AgentInvocationError;
use crate::history::HistorySnapshot;
use crate::validator::JsonOutputValidator;
use crate::validator::OutputValidator;

/// A participant that turns an input envelope plus the conversation so far
/// into one validated structured output.
///
/// Implementations receive a snapshot of the history and never write to it;
/// committing the turn is the orchestrator's job. Failures are returned as
/// is, never retried here.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Participant identifier used as the `sender` of committed messages.
    fn id(&self) -> &str;

    fn contract(&self) -> &AgentContract;

    async fn invoke(
        &self,
        input: InputEnvelope,
        history: HistorySnapshot,
    ) -> Result<StructuredOutput, AgentInvocationError>;
}

/// Agent bound to a contract, a reasoning backend and an output validator.
pub struct ContractAgent {
    id: String,
    contract: AgentContract,
    backend: Arc<dyn ReasoningBackend>,
    validator: Arc<dyn OutputValidator>,
}

impl ContractAgent {
    pub fn new(
        id: impl Into<String>,
        contract: AgentContract,
        backend: Arc<dyn ReasoningBackend>,
    ) -> Self {
        Self {
            id: id.into(),
            contract,
            backend,
            validator: Arc::new(JsonOutputValidator),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn OutputValidator>) -> Self {
        self.validator = validator;
        self
    }
}

#[async_trait]
impl Agent for ContractAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn contract(&self) -> &AgentContract {
        &self.contract
    }

    async fn invoke(
        &self,
        input: InputEnvelope,
        history: HistorySnapshot,
    ) -> Result<StructuredOutput, AgentInvocationError> {
        self.contract
            .check_input(&input)
            .map_err(AgentInvocationError::InvalidInput)?;

        debug!(
            participant = %self.id,
            role = %self.contract.role,
            history_len = history.len(),
            "invoking reasoning backend"
        );
        let request = BackendRequest {
            participant: self.id.clone(),
            system_instruction: self.contract.system_instruction.clone(),
            input_payload: input.to_payload(),
            history,
            output_schema: self.contract.output_schema(),
        };
        let raw = self
            .backend
            .complete(request)
            .await
            .map_err(AgentInvocationError::Backend)?;

        let output = self.validator.validate(&raw, self.contract.produces)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ScriptedBackend;
    use crate::backend::ScriptedReply;
    use crate::contract::AgentRole;
    use crate::error::ValidationError;
    use crate::history::ConversationHistory;
    use assert_matches::assert_matches;
    use parley_protocol::Message;
    use parley_protocol::OutputShapeKind;
    use parley_protocol::outputs::AnswerOutput;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn responder(backend: Arc<ScriptedBackend>) -> ContractAgent {
        ContractAgent::new("responder", AgentContract::for_role(AgentRole::Responder), backend)
    }

    #[tokio::test]
    async fn invoke_passes_contract_and_history_to_backend() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_reply("responder", ScriptedReply::output(json!({"answer": "Paris"}))),
        );
        let agent = responder(Arc::clone(&backend));
        let mut history = ConversationHistory::new();
        history.append([
            Message::new("questioner", "Hello?"),
            Message::new("responder", "Hi."),
        ]);

        let output = agent
            .invoke(
                InputEnvelope::new("questioner", "responder", "What is the capital of France?"),
                history.snapshot(),
            )
            .await;

        assert_eq!(
            output.ok(),
            Some(StructuredOutput::Answer(AnswerOutput {
                answer: "Paris".to_string()
            }))
        );
        let requests = backend.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].history.len(), 2);
        assert_eq!(
            requests[0].input_payload,
            r#"{"content":"What is the capital of France?","sender":"questioner"}"#
        );
        assert_eq!(
            requests[0].system_instruction,
            AgentRole::Responder.default_instruction()
        );
    }

    #[tokio::test]
    async fn invalid_output_is_an_invocation_error() {
        let backend = Arc::new(
            ScriptedBackend::new().with_reply("responder", ScriptedReply::text("Paris")),
        );
        let result = responder(backend)
            .invoke(
                InputEnvelope::new("questioner", "responder", "Capital of France?"),
                HistorySnapshot::default(),
            )
            .await;
        assert_matches!(
            result,
            Err(AgentInvocationError::InvalidOutput(ValidationError::Malformed { .. }))
        );
    }

    /// Accepts any non-empty reply as a bare answer.
    struct PlainAnswer;

    impl OutputValidator for PlainAnswer {
        fn validate(
            &self,
            raw: &str,
            shape: OutputShapeKind,
        ) -> Result<StructuredOutput, ValidationError> {
            match raw.trim() {
                "" => Err(ValidationError::EmptyField {
                    shape: shape.name(),
                    field: "answer",
                }),
                answer => Ok(StructuredOutput::Answer(AnswerOutput {
                    answer: answer.to_string(),
                })),
            }
        }
    }

    #[tokio::test]
    async fn custom_validator_replaces_json_checks() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_reply("responder", ScriptedReply::text(" Paris "))
                .with_reply("responder", ScriptedReply::text("  ")),
        );
        let agent = responder(backend).with_validator(Arc::new(PlainAnswer));
        let envelope = InputEnvelope::new("questioner", "responder", "Capital of France?");

        let output = agent
            .invoke(envelope.clone(), HistorySnapshot::default())
            .await;
        assert_eq!(
            output.ok(),
            Some(StructuredOutput::Answer(AnswerOutput {
                answer: "Paris".to_string()
            }))
        );

        let empty = agent.invoke(envelope, HistorySnapshot::default()).await;
        assert_matches!(
            empty,
            Err(AgentInvocationError::InvalidOutput(ValidationError::EmptyField { field: "answer", .. }))
        );
    }

    #[tokio::test]
    async fn rejected_input_never_reaches_backend() {
        let backend = Arc::new(ScriptedBackend::new());
        let result = responder(Arc::clone(&backend))
            .invoke(InputEnvelope::seed("responder", "hi"), HistorySnapshot::default())
            .await;
        assert_matches!(result, Err(AgentInvocationError::InvalidInput(_)));
        assert!(backend.requests().await.is_empty());
    }

    #[tokio::test]
    async fn backend_failure_is_surfaced() {
        let backend = Arc::new(
            ScriptedBackend::new().with_reply("responder", ScriptedReply::fail("rate limited")),
        );
        let result = responder(backend)
            .invoke(
                InputEnvelope::new("questioner", "responder", "Capital of France?"),
                HistorySnapshot::default(),
            )
            .await;
        assert_matches!(result, Err(AgentInvocationError::Backend(e)) if e.to_string() == "rate limited");
    }
}
