//! Seam to the reasoning backend that produces raw agent output.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::history::HistorySnapshot;

/// Everything a backend needs for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub participant: String,
    pub system_instruction: String,
    /// JSON serialization of the input envelope.
    pub input_payload: String,
    pub history: HistorySnapshot,
    /// JSON schema of the output shape the reply must satisfy.
    pub output_schema: Value,
}

/// Request/response call into whatever performs the reasoning step. It may
/// fail or never complete; callers bound the wait.
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    async fn complete(&self, request: BackendRequest) -> anyhow::Result<String>;
}

/// A canned backend reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptedReply {
    /// Raw output. Strings are returned verbatim, anything else as JSON text.
    Output(Value),
    /// The backend call fails with this message.
    Fail(String),
    /// The backend call never completes.
    Stall,
}

impl ScriptedReply {
    pub fn output(value: Value) -> Self {
        ScriptedReply::Output(value)
    }

    pub fn text(text: impl Into<String>) -> Self {
        ScriptedReply::Output(Value::String(text.into()))
    }

    pub fn fail(message: impl Into<String>) -> Self {
        ScriptedReply::Fail(message.into())
    }
}

/// Replies keyed by participant id, in the order they are handed out.
pub type Script = HashMap<String, Vec<ScriptedReply>>;

/// Deterministic backend replaying queued replies per participant. Every
/// request is recorded so callers can inspect what each turn was given.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<HashMap<String, VecDeque<ScriptedReply>>>,
    requests: Mutex<Vec<BackendRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_script(script: Script) -> Self {
        let replies = script
            .into_iter()
            .map(|(participant, replies)| (participant, VecDeque::from(replies)))
            .collect();
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Loads a JSON script of the form `{"participant": [reply, ...]}`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let script: Script = serde_json::from_str(&text)?;
        Ok(Self::from_script(script))
    }

    pub fn with_reply(mut self, participant: &str, reply: ScriptedReply) -> Self {
        self.replies
            .get_mut()
            .entry(participant.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub async fn requests(&self) -> Vec<BackendRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn remaining(&self, participant: &str) -> usize {
        let replies = self.replies.lock().await;
        replies.get(participant).map_or(0, VecDeque::len)
    }
}

#[async_trait]
impl ReasoningBackend for ScriptedBackend {
    async fn complete(&self, request: BackendRequest) -> anyhow::Result<String> {
        let participant = request.participant.clone();
        self.requests.lock().await.push(request);

        let reply = {
            let mut replies = self.replies.lock().await;
            replies
                .get_mut(&participant)
                .and_then(VecDeque::pop_front)
        };

        match reply {
            Some(ScriptedReply::Output(Value::String(text))) => Ok(text),
            Some(ScriptedReply::Output(value)) => Ok(value.to_string()),
            Some(ScriptedReply::Fail(message)) => Err(anyhow::anyhow!(message)),
            Some(ScriptedReply::Stall) => {
                std::future::pending::<()>().await;
                anyhow::bail!("stalled reply resumed for `{participant}`")
            }
            None => anyhow::bail!("no scripted reply left for `{participant}`"),
        }
    }
}
