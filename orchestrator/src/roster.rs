//! Resolves configured participants into agents.

use std::collections::BTreeMap;
use std::sync::Arc;

use parley_core::Agent;
use parley_core::AgentRole;
use parley_core::Config;
use parley_core::ContractAgent;
use parley_core::ReasoningBackend;
use parley_core::error::ConfigError;

use crate::runtime::SessionConfig;
use crate::runtime::TurnOrchestrator;

/// The agents available to a session, keyed by participant id.
pub struct Roster {
    agents: BTreeMap<String, Arc<dyn Agent>>,
}

impl Roster {
    pub fn new() -> Self {
        Self {
            agents: BTreeMap::new(),
        }
    }

    /// Builds one [`ContractAgent`] per configured participant, all backed by
    /// `backend`.
    pub fn from_config(config: &Config, backend: Arc<dyn ReasoningBackend>) -> Self {
        let agents = config
            .participants
            .iter()
            .map(|(id, participant)| {
                let agent: Arc<dyn Agent> = Arc::new(ContractAgent::new(
                    id.clone(),
                    participant.contract.clone(),
                    Arc::clone(&backend),
                ));
                (id.clone(), agent)
            })
            .collect();
        Self { agents }
    }

    pub fn insert(&mut self, agent: Arc<dyn Agent>) {
        self.agents.insert(agent.id().to_string(), agent);
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn Agent>, ConfigError> {
        self.agents
            .get(id)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownParticipant(id.to_string()))
    }

    /// Picks the requested participant when it exists, otherwise the first
    /// participant (by id) playing `role`.
    pub fn select(&self, requested: Option<&str>, role: AgentRole) -> Option<Arc<dyn Agent>> {
        if let Some(agent) = requested.and_then(|id| self.agents.get(id)) {
            return Some(Arc::clone(agent));
        }
        self.agents
            .values()
            .find(|agent| agent.contract().role == role)
            .cloned()
    }

    pub fn participants(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    /// Orchestrator wired the way `config` describes the session.
    pub fn orchestrator(&self, config: &Config) -> Result<TurnOrchestrator, ConfigError> {
        let initiator = self.get(&config.initiator)?;
        let responder = self.get(&config.responder)?;
        let mut orchestrator =
            TurnOrchestrator::new(initiator, responder, SessionConfig::from(config));
        if let Some(specialist) =
            self.select(config.escalation.as_deref(), AgentRole::Specialist)
        {
            orchestrator = orchestrator.with_escalation(specialist);
        }
        for (id, participant) in &config.participants {
            if let Some(timeout) = participant.timeout {
                orchestrator = orchestrator.with_participant_timeout(id, timeout);
            }
        }
        Ok(orchestrator)
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::ScriptedBackend;
    use pretty_assertions::assert_eq;

    fn roster() -> Roster {
        Roster::from_config(&Config::default(), Arc::new(ScriptedBackend::new()))
    }

    #[test]
    fn default_roster_has_support_desk_participants() {
        let binding = roster();
        let ids: Vec<&str> = binding.participants().collect();
        assert_eq!(ids, vec!["specialist", "support", "user"]);
    }

    #[test]
    fn select_prefers_requested_then_role() {
        let roster = roster();
        let picked = roster.select(Some("support"), AgentRole::Specialist);
        assert_eq!(picked.map(|a| a.id().to_string()).as_deref(), Some("support"));

        let fallback = roster.select(Some("missing"), AgentRole::Specialist);
        assert_eq!(fallback.map(|a| a.id().to_string()).as_deref(), Some("specialist"));

        assert!(roster.select(None, AgentRole::Questioner).is_none());
    }

    #[test]
    fn orchestrator_requires_known_participants() {
        let mut config = Config::default();
        config.responder = "ghost".to_string();
        assert!(roster().orchestrator(&config).is_err());
        assert!(roster().orchestrator(&Config::default()).is_ok());
    }
}
