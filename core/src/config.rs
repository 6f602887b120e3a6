//! Session configuration loaded from `config.toml`.

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::contract::AgentContract;
use crate::contract::AgentRole;
use crate::error::ConfigError;

pub const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_MAX_TURNS: u32 = 3;
pub const DEFAULT_TURN_TIMEOUT_MS: u64 = 60_000;

/// Raw contents of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    /// Round budget of a session.
    pub max_turns: Option<u32>,
    /// Upper bound on a single agent invocation.
    pub turn_timeout_ms: Option<u64>,
    #[serde(default)]
    pub participants: BTreeMap<String, ParticipantToml>,
    #[serde(default)]
    pub session: Option<SessionToml>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParticipantToml {
    pub role: AgentRole,
    pub system_instruction: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionToml {
    pub initiator: String,
    pub responder: String,
    pub escalation: Option<String>,
    #[serde(default)]
    pub seeds: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantConfig {
    pub contract: AgentContract,
    /// Overrides the session-wide turn timeout for this participant.
    pub timeout: Option<Duration>,
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub max_turns: u32,
    pub turn_timeout: Duration,
    pub participants: BTreeMap<String, ParticipantConfig>,
    pub initiator: String,
    pub responder: String,
    pub escalation: Option<String>,
    pub seeds: Vec<String>,
}

impl Default for Config {
    /// The support-desk conversation: a simulated user talking to support,
    /// with a specialist taking escalated cases.
    fn default() -> Self {
        let participants = [
            ("user", AgentRole::UserSimulator),
            ("support", AgentRole::Support),
            ("specialist", AgentRole::Specialist),
        ]
        .into_iter()
        .map(|(id, role)| {
            (
                id.to_string(),
                ParticipantConfig {
                    contract: AgentContract::for_role(role),
                    timeout: None,
                },
            )
        })
        .collect();

        Self {
            max_turns: DEFAULT_MAX_TURNS,
            turn_timeout: Duration::from_millis(DEFAULT_TURN_TIMEOUT_MS),
            participants,
            initiator: "user".to_string(),
            responder: "support".to_string(),
            escalation: Some("specialist".to_string()),
            seeds: vec![
                "My internet is not working. I can't access any websites.".to_string(),
                "Yes, I've tried restarting my router multiple times, but it didn't help."
                    .to_string(),
                "The Wi-Fi light is green, but the internet light is off.".to_string(),
            ],
        }
    }
}

impl Config {
    /// Loads `path` if given, else `<parley home>/config.toml` when present,
    /// else the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = find_parley_home()?.join(CONFIG_FILE);
                if !candidate.exists() {
                    tracing::debug!(path = %candidate.display(), "no config file, using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text, &path)
    }

    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let cfg: ConfigToml = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.display().to_string(),
            source,
        })?;
        Self::from_config_toml(cfg)
    }

    /// Resolves raw settings on top of the defaults. Configuring any
    /// participant replaces the default roster.
    pub fn from_config_toml(cfg: ConfigToml) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(max_turns) = cfg.max_turns {
            config.max_turns = max_turns;
        }
        if let Some(ms) = cfg.turn_timeout_ms {
            config.turn_timeout = Duration::from_millis(ms);
        }
        if !cfg.participants.is_empty() {
            config.participants = cfg
                .participants
                .into_iter()
                .map(|(id, p)| {
                    let mut contract = AgentContract::for_role(p.role);
                    if let Some(instruction) = p.system_instruction {
                        contract = contract.with_system_instruction(instruction);
                    }
                    let participant = ParticipantConfig {
                        contract,
                        timeout: p.timeout_ms.map(Duration::from_millis),
                    };
                    (id, participant)
                })
                .collect();
        }
        if let Some(session) = cfg.session {
            config.initiator = session.initiator;
            config.responder = session.responder;
            config.escalation = session.escalation;
            config.seeds = session.seeds;
        }

        let referenced = [Some(&config.initiator), Some(&config.responder)]
            .into_iter()
            .chain([config.escalation.as_ref()])
            .flatten();
        for id in referenced {
            if !config.participants.contains_key(id) {
                return Err(ConfigError::UnknownParticipant(id.clone()));
            }
        }
        Ok(config)
    }

    pub fn participant(&self, id: &str) -> Result<&ParticipantConfig, ConfigError> {
        self.participants
            .get(id)
            .ok_or_else(|| ConfigError::UnknownParticipant(id.to_string()))
    }

    /// Effective invocation timeout for `id`.
    pub fn timeout_for(&self, id: &str) -> Duration {
        self.participants
            .get(id)
            .and_then(|p| p.timeout)
            .unwrap_or(self.turn_timeout)
    }
}

/// Returns `$PARLEY_HOME` when set, else `~/.parley`.
pub fn find_parley_home() -> Result<PathBuf, ConfigError> {
    if let Ok(val) = std::env::var("PARLEY_HOME")
        && !val.is_empty()
    {
        return Ok(PathBuf::from(val));
    }

    let mut p = dirs::home_dir().ok_or(ConfigError::NoHome)?;
    p.push(".parley");
    Ok(p)
}
