//! Core turn orchestrator.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parley_core::Agent;
use parley_core::AgentInvocationError;
use parley_core::Config;
use parley_core::HistorySnapshot;
use parley_core::ProtocolViolation;
use parley_core::ValidationError;
use parley_protocol::InputEnvelope;
use parley_protocol::Message;
use parley_protocol::StructuredOutput;
use parley_protocol::events::Event;
use parley_protocol::events::SessionEnd;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::SessionError;
use crate::error::SessionFailure;
use crate::events::EventEmitter;
use crate::policy::Decision;
use crate::policy::decide;
use crate::session::Escalation;
use crate::session::RoundRecord;
use crate::session::Session;
use crate::session::SessionOutcome;
use crate::session::UtteranceSource;
use crate::state::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Round budget. Reaching it ends the session normally.
    pub max_turns: u32,
    /// Bound on a single agent invocation.
    pub turn_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: parley_core::config::DEFAULT_MAX_TURNS,
            turn_timeout: Duration::from_millis(parley_core::config::DEFAULT_TURN_TIMEOUT_MS),
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_turns: config.max_turns,
            turn_timeout: config.turn_timeout,
        }
    }
}

/// Drives one session at a time through initiator/responder rounds.
///
/// Turns are strictly sequential. Both messages of a round are committed
/// together once the responder's output is validated, so a failing or
/// cancelled round leaves the history untouched.
pub struct TurnOrchestrator {
    initiator: Arc<dyn Agent>,
    responder: Arc<dyn Agent>,
    escalation: Option<Arc<dyn Agent>>,
    config: SessionConfig,
    timeouts: HashMap<String, Duration>,
    events: Option<UnboundedSender<Event>>,
    cancel: CancellationToken,
}

/// Result of a round that did not fail.
enum RoundResult {
    Committed(RoundRecord),
    Cancelled,
}

impl TurnOrchestrator {
    pub fn new(
        initiator: Arc<dyn Agent>,
        responder: Arc<dyn Agent>,
        config: SessionConfig,
    ) -> Self {
        Self {
            initiator,
            responder,
            escalation: None,
            config,
            timeouts: HashMap::new(),
            events: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Participant that takes over when a responder asks for escalation.
    /// Without one, escalation ends the session with a notice only.
    pub fn with_escalation(mut self, agent: Arc<dyn Agent>) -> Self {
        self.escalation = Some(agent);
        self
    }

    pub fn with_events(mut self, tx: UnboundedSender<Event>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Overrides the invocation timeout for one participant.
    pub fn with_participant_timeout(mut self, participant: &str, timeout: Duration) -> Self {
        self.timeouts.insert(participant.to_string(), timeout);
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    fn timeout_for(&self, participant: &str) -> Duration {
        self.timeouts
            .get(participant)
            .copied()
            .unwrap_or(self.config.turn_timeout)
    }

    /// Runs `session` until its turn budget is used up, a responder asks for
    /// escalation, the session is cancelled, or a turn fails.
    pub async fn run(
        &self,
        mut session: Session,
        mut utterances: UtteranceSource,
    ) -> Result<SessionOutcome, SessionFailure> {
        let emitter = EventEmitter::new(session.id().to_string(), self.events.clone());
        let resumed_rounds = session.state().turns_so_far();
        info!(
            session_id = %session.id(),
            initiator = %self.initiator.id(),
            responder = %self.responder.id(),
            resumed_rounds,
            max_turns = self.config.max_turns,
            "session started"
        );
        emitter.session_started(
            self.initiator.id(),
            self.responder.id(),
            resumed_rounds,
            self.config.max_turns,
        );

        let mut rounds = Vec::new();
        loop {
            if self.cancel.is_cancelled() {
                return Ok(self.finish(session, SessionEnd::Cancelled, rounds, None, &emitter));
            }
            let turns = session.state().turns_so_far();
            if turns >= self.config.max_turns {
                return Ok(self.finish(session, SessionEnd::Completed, rounds, None, &emitter));
            }
            let round = turns + 1;

            let record = match self.play_round(&mut session, round, &mut utterances, &emitter).await {
                Ok(RoundResult::Committed(record)) => record,
                Ok(RoundResult::Cancelled) => {
                    return Ok(self.finish(session, SessionEnd::Cancelled, rounds, None, &emitter));
                }
                Err(error) => return Err(self.fail(session, error, rounds, &emitter)),
            };

            let decision = decide(
                &record.responder_output,
                session.state().turns_so_far(),
                self.config.max_turns,
            );
            debug!(session_id = %session.id(), round, ?decision, "round evaluated");
            match decision {
                Decision::Continue => rounds.push(record),
                Decision::Stop => {
                    rounds.push(record);
                    return Ok(self.finish(session, SessionEnd::Completed, rounds, None, &emitter));
                }
                Decision::Escalate => {
                    let handoff = self.escalate(&mut session, &record, &emitter).await;
                    rounds.push(record);
                    return match handoff {
                        Ok((escalation, cancelled)) => {
                            let end = if cancelled {
                                SessionEnd::Cancelled
                            } else {
                                SessionEnd::Escalated
                            };
                            Ok(self.finish(session, end, rounds, Some(escalation), &emitter))
                        }
                        Err(error) => Err(self.fail(session, error, rounds, &emitter)),
                    };
                }
            }
        }
    }

    async fn play_round(
        &self,
        session: &mut Session,
        round: u32,
        utterances: &mut UtteranceSource,
        emitter: &EventEmitter,
    ) -> Result<RoundResult, SessionError> {
        let initiator_id = self.initiator.id();
        let responder_id = self.responder.id();

        session.state.advance(Phase::UserTurn, Some(initiator_id));
        let input = match utterances.next_seed() {
            Some(seed) => InputEnvelope::seed(initiator_id, seed),
            None => match session.history().messages().last() {
                Some(last) => InputEnvelope::new(last.sender(), initiator_id, last.content()),
                None => {
                    return Err(SessionError::new(
                        round,
                        initiator_id,
                        ProtocolViolation::NoUtterance {
                            participant: initiator_id.to_string(),
                        },
                    ));
                }
            },
        };

        let snapshot = session.history().snapshot();
        let Some(initiator_output) = self
            .invoke(self.initiator.as_ref(), input, snapshot, round)
            .await?
        else {
            return Ok(RoundResult::Cancelled);
        };
        emitter.turn_completed(round, initiator_id, initiator_output.content());

        let forward = initiator_output
            .forwardable()
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                SessionError::new(
                    round,
                    initiator_id,
                    ProtocolViolation::MissingForwardable {
                        participant: initiator_id.to_string(),
                        shape: initiator_output.kind().name(),
                    },
                )
            })?
            .to_string();

        session.state.advance(Phase::AgentTurn, Some(responder_id));
        let envelope = InputEnvelope::new(initiator_id, responder_id, forward);
        // The responder sees the initiator's turn; nothing is committed until
        // both sides validate.
        let pending = Message::new(initiator_id, initiator_output.content());
        let snapshot = session.history().snapshot_with([pending]);
        let Some(responder_output) = self
            .invoke(self.responder.as_ref(), envelope, snapshot, round)
            .await?
        else {
            return Ok(RoundResult::Cancelled);
        };
        emitter.turn_completed(round, responder_id, responder_output.content());

        session.state.advance(Phase::Evaluate, None);
        session.commit_round(
            Message::new(initiator_id, initiator_output.content()),
            Message::new(responder_id, responder_output.content()),
        );
        info!(
            session_id = %session.id(),
            round,
            history_len = session.history().len(),
            "round committed"
        );
        emitter.round_committed(round, session.history().len());

        Ok(RoundResult::Committed(RoundRecord {
            round,
            initiator: initiator_id.to_string(),
            initiator_output,
            responder: responder_id.to_string(),
            responder_output,
        }))
    }

    /// One bounded, cancellable agent call. `Ok(None)` means the session was
    /// cancelled and the result, if any ever arrives, is dropped.
    async fn invoke(
        &self,
        agent: &dyn Agent,
        input: InputEnvelope,
        history: HistorySnapshot,
        round: u32,
    ) -> Result<Option<StructuredOutput>, SessionError> {
        let participant = agent.id();
        let timeout = self.timeout_for(participant);
        debug!(participant, round, ?timeout, "invoking agent");

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                info!(participant, round, "turn abandoned, session cancelled");
                return Ok(None);
            }
            result = tokio::time::timeout(timeout, agent.invoke(input, history)) => result,
        };

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => return Err(SessionError::new(round, participant, err)),
            Err(_) => {
                return Err(SessionError::new(
                    round,
                    participant,
                    AgentInvocationError::Timeout(timeout),
                ));
            }
        };

        let expected = agent.contract().produces;
        if output.kind() != expected {
            return Err(SessionError::new(
                round,
                participant,
                ValidationError::ShapeMismatch {
                    expected: expected.name(),
                    found: output.kind().name(),
                },
            ));
        }
        Ok(Some(output))
    }

    /// Hands an escalated session to the escalation participant, if any.
    /// Returns the escalation record and whether the hand-off was cancelled.
    async fn escalate(
        &self,
        session: &mut Session,
        record: &RoundRecord,
        emitter: &EventEmitter,
    ) -> Result<(Escalation, bool), SessionError> {
        session.state.advance(Phase::Escalated, Some(record.responder.as_str()));
        let handled_by = self.escalation.as_ref().map(|agent| agent.id().to_string());
        warn!(
            session_id = %session.id(),
            round = record.round,
            participant = %record.responder,
            handled_by = handled_by.as_deref().unwrap_or("none"),
            "session escalated"
        );
        emitter.session_escalated(record.round, &record.responder, handled_by.clone());

        let mut escalation = Escalation {
            round: record.round,
            raised_by: record.responder.clone(),
            handled_by,
            resolution: None,
        };
        let Some(agent) = &self.escalation else {
            return Ok((escalation, false));
        };

        session.state.hand_off(agent.id());
        let envelope = InputEnvelope::new(
            record.responder.as_str(),
            agent.id(),
            record.responder_output.content(),
        );
        let resolution = self
            .invoke(agent.as_ref(), envelope, session.history().snapshot(), record.round)
            .await?;
        let cancelled = resolution.is_none();
        if let Some(output) = &resolution {
            emitter.turn_completed(record.round, agent.id(), output.content());
        }
        escalation.resolution = resolution;
        Ok((escalation, cancelled))
    }

    fn finish(
        &self,
        mut session: Session,
        end: SessionEnd,
        rounds: Vec<RoundRecord>,
        escalation: Option<Escalation>,
        emitter: &EventEmitter,
    ) -> SessionOutcome {
        session.state.advance(Phase::Done, None);
        let total = session.state().turns_so_far();
        info!(session_id = %session.id(), rounds = total, ?end, "session finished");
        emitter.session_completed(total, end);
        SessionOutcome {
            session,
            end,
            rounds,
            escalation,
        }
    }

    fn fail(
        &self,
        mut session: Session,
        error: SessionError,
        rounds: Vec<RoundRecord>,
        emitter: &EventEmitter,
    ) -> SessionFailure {
        session.state.advance(Phase::Done, None);
        warn!(
            session_id = %session.id(),
            round = error.round,
            participant = %error.participant,
            "turn failed: {}",
            error.kind
        );
        emitter.turn_failed(error.round, &error.participant, error.kind.to_string());
        SessionFailure {
            error,
            session,
            rounds,
        }
    }
}

/// Runs a single round between `initiator` and `responder`, e.g. one question
/// and its answer, or an opening statement and its rebuttal.
pub async fn exchange(
    initiator: Arc<dyn Agent>,
    responder: Arc<dyn Agent>,
    seed: impl Into<String>,
) -> Result<SessionOutcome, SessionFailure> {
    let config = SessionConfig {
        max_turns: 1,
        ..SessionConfig::default()
    };
    TurnOrchestrator::new(initiator, responder, config)
        .run(Session::new(), UtteranceSource::new([seed.into()]))
        .await
}
