//! Runs independent sessions concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::SessionFailure;
use crate::runtime::TurnOrchestrator;
use crate::session::Session;
use crate::session::SessionOutcome;
use crate::session::UtteranceSource;
use crate::summary::ResultAggregator;
use crate::summary::SessionResult;

type RunResult = Result<SessionOutcome, SessionFailure>;

struct ManagedSession {
    cancel: CancellationToken,
    handle: JoinHandle<RunResult>,
}

/// Owns the tasks of all running sessions. Sessions share nothing but the
/// agents they were wired with; each gets its own child cancellation token.
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, ManagedSession>>>,
    root: CancellationToken,
    results: Arc<RwLock<ResultAggregator>>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            root: CancellationToken::new(),
            results: Arc::new(RwLock::new(ResultAggregator::new())),
        }
    }

    /// Starts `session` on its own task and returns its id.
    pub async fn spawn(
        &self,
        orchestrator: TurnOrchestrator,
        session: Session,
        utterances: UtteranceSource,
    ) -> String {
        let session_id = session.id().to_string();
        let cancel = self.root.child_token();
        let orchestrator = orchestrator.with_cancellation(cancel.clone());
        let handle = tokio::spawn(async move { orchestrator.run(session, utterances).await });

        info!(session_id = %session_id, "spawned session");
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), ManagedSession { cancel, handle });
        session_id
    }

    /// Requests cancellation of one session. Returns false for unknown ids.
    pub async fn cancel(&self, session_id: &str) -> bool {
        let sessions = self.sessions.read().await;
        match sessions.get(session_id) {
            Some(managed) => {
                managed.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        self.root.cancel();
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Waits for one session to finish and records its result.
    pub async fn join(&self, session_id: &str) -> anyhow::Result<RunResult> {
        let managed = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| anyhow::anyhow!("unknown session `{session_id}`"))?;
        let result = managed.handle.await?;
        self.results
            .write()
            .await
            .add_result(session_id.to_string(), SessionResult::from_run(&result));
        Ok(result)
    }

    /// Waits for every session, in id order.
    pub async fn join_all(&self) -> anyhow::Result<Vec<(String, RunResult)>> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            let result = self.join(&id).await?;
            results.push((id, result));
        }
        Ok(results)
    }

    pub fn results(&self) -> Arc<RwLock<ResultAggregator>> {
        Arc::clone(&self.results)
    }
}
