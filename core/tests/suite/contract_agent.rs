use std::sync::Arc;

use assert_matches::assert_matches;
use parley_core::Agent;
use parley_core::AgentContract;
use parley_core::AgentInvocationError;
use parley_core::AgentRole;
use parley_core::ContractAgent;
use parley_core::ConversationHistory;
use parley_core::ScriptedBackend;
use parley_core::ValidationError;
use parley_protocol::InputEnvelope;
use parley_protocol::StructuredOutput;
use parley_protocol::outputs::SupportOutput;
use pretty_assertions::assert_eq;
use serde_json::json;

fn load_backend(script: serde_json::Value) -> Arc<ScriptedBackend> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("script.json");
    std::fs::write(&path, script.to_string()).unwrap();
    Arc::new(ScriptedBackend::load(&path).unwrap())
}

fn support(backend: &Arc<ScriptedBackend>) -> ContractAgent {
    let backend: Arc<ScriptedBackend> = Arc::clone(backend);
    ContractAgent::new("support", AgentContract::for_role(AgentRole::Support), backend)
}

fn from_user(text: &str) -> InputEnvelope {
    InputEnvelope::new("user", "support", text)
}

#[tokio::test]
async fn absent_escalation_flag_defaults_to_false() {
    let backend = load_backend(json!({
        "support": [{ "output": { "response": "Try restarting your router" } }]
    }));

    let output = support(&backend)
        .invoke(
            from_user("My internet is not working"),
            ConversationHistory::new().snapshot(),
        )
        .await
        .unwrap();

    assert_eq!(
        output,
        StructuredOutput::Support(SupportOutput {
            response: "Try restarting your router".to_string(),
            escalate_to_specialist: false,
        })
    );
    assert_eq!(output.escalation_flag(), Some(false));
}

#[tokio::test]
async fn backend_receives_the_output_schema() {
    let backend = load_backend(json!({
        "support": [{ "output": { "response": "ok", "escalate_to_specialist": true } }]
    }));

    support(&backend)
        .invoke(from_user("help"), ConversationHistory::new().snapshot())
        .await
        .unwrap();

    let requests = backend.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].output_schema,
        AgentContract::for_role(AgentRole::Support).output_schema()
    );
    assert!(requests[0].system_instruction.contains("support agent"));
}

#[tokio::test]
async fn unparseable_and_failing_replies_are_distinguished() {
    let backend = load_backend(json!({
        "support": [
            { "output": "I think you should restart it" },
            { "output": { "response": "ok", "escalate_to_specialist": "yes" } },
            { "fail": "connection reset" }
        ]
    }));
    let agent = support(&backend);
    let history = ConversationHistory::new();

    let malformed = agent.invoke(from_user("a"), history.snapshot()).await;
    assert_matches!(
        malformed,
        Err(AgentInvocationError::InvalidOutput(ValidationError::Malformed { .. }))
    );

    let mistyped = agent.invoke(from_user("b"), history.snapshot()).await;
    assert_matches!(
        mistyped,
        Err(AgentInvocationError::InvalidOutput(ValidationError::InvalidType {
            field: "escalate_to_specialist",
            ..
        }))
    );

    let failed = agent.invoke(from_user("c"), history.snapshot()).await;
    assert_matches!(failed, Err(AgentInvocationError::Backend(_)));
}

#[tokio::test]
async fn seeds_are_refused_by_message_consumers() {
    let backend = load_backend(json!({}));

    let result = support(&backend)
        .invoke(
            InputEnvelope::seed("support", "hello"),
            ConversationHistory::new().snapshot(),
        )
        .await;

    assert_matches!(
        result,
        Err(AgentInvocationError::InvalidInput(ValidationError::SeedNotAccepted { .. }))
    );
    assert!(backend.requests().await.is_empty());
}
