//! Aggregation of session results.

use parley_protocol::events::SessionEnd;

use crate::error::SessionFailure;
use crate::session::SessionOutcome;

/// How one session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionResult {
    Finished { end: SessionEnd, rounds: u32 },
    Failed { rounds: u32, participant: String },
}

impl SessionResult {
    pub fn from_run(result: &Result<SessionOutcome, SessionFailure>) -> Self {
        match result {
            Ok(outcome) => SessionResult::Finished {
                end: outcome.end,
                rounds: outcome.session.state().turns_so_far(),
            },
            Err(failure) => SessionResult::Failed {
                rounds: failure.session.state().turns_so_far(),
                participant: failure.error.participant.clone(),
            },
        }
    }

    pub fn rounds(&self) -> u32 {
        match self {
            SessionResult::Finished { rounds, .. } | SessionResult::Failed { rounds, .. } => *rounds,
        }
    }
}

/// Aggregates results from multiple sessions.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    results: Vec<(String, SessionResult)>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_result(&mut self, session_id: String, result: SessionResult) {
        self.results.push((session_id, result));
    }

    pub fn results(&self) -> &[(String, SessionResult)] {
        &self.results
    }

    pub fn summary(&self) -> AggregateSummary {
        let count_end = |wanted: SessionEnd| {
            self.results
                .iter()
                .filter(|(_, r)| matches!(r, SessionResult::Finished { end, .. } if *end == wanted))
                .count()
        };

        AggregateSummary {
            total_sessions: self.results.len(),
            completed: count_end(SessionEnd::Completed),
            escalated: count_end(SessionEnd::Escalated),
            cancelled: count_end(SessionEnd::Cancelled),
            failed: self
                .results
                .iter()
                .filter(|(_, r)| matches!(r, SessionResult::Failed { .. }))
                .count(),
            total_rounds: self.results.iter().map(|(_, r)| u64::from(r.rounds())).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSummary {
    pub total_sessions: usize,
    pub completed: usize,
    pub escalated: usize,
    pub cancelled: usize,
    pub failed: usize,
    pub total_rounds: u64,
}

impl AggregateSummary {
    /// Share of sessions that did not fail.
    pub fn success_rate(&self) -> f64 {
        if self.total_sessions == 0 {
            return 1.0;
        }
        (self.total_sessions - self.failed) as f64 / self.total_sessions as f64
    }

    pub fn escalation_rate(&self) -> f64 {
        if self.total_sessions == 0 {
            return 0.0;
        }
        self.escalated as f64 / self.total_sessions as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_aggregator() {
        let summary = ResultAggregator::new().summary();
        assert_eq!(summary.total_sessions, 0);
        assert_eq!(summary.success_rate(), 1.0);
        assert_eq!(summary.escalation_rate(), 0.0);
    }

    #[test]
    fn mixed_results() {
        let mut aggregator = ResultAggregator::new();
        aggregator.add_result(
            "a".to_string(),
            SessionResult::Finished {
                end: SessionEnd::Completed,
                rounds: 3,
            },
        );
        aggregator.add_result(
            "b".to_string(),
            SessionResult::Finished {
                end: SessionEnd::Escalated,
                rounds: 1,
            },
        );
        aggregator.add_result(
            "c".to_string(),
            SessionResult::Failed {
                rounds: 1,
                participant: "support".to_string(),
            },
        );

        let summary = aggregator.summary();
        assert_eq!(
            summary,
            AggregateSummary {
                total_sessions: 3,
                completed: 1,
                escalated: 1,
                cancelled: 0,
                failed: 1,
                total_rounds: 5,
            }
        );
        assert!((summary.success_rate() - 0.666).abs() < 0.01);
        assert!((summary.escalation_rate() - 0.333).abs() < 0.01);
    }
}
