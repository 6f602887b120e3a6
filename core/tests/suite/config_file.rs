use std::time::Duration;

use assert_matches::assert_matches;
use parley_core::AgentRole;
use parley_core::Config;
use parley_core::error::ConfigError;
use pretty_assertions::assert_eq;

fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn debate_config_resolves_participants_and_timeouts() {
    let (_dir, path) = write_config(
        r#"
max_turns = 4
turn_timeout_ms = 2000

[participants.pro]
role = "debate_participant"
system_instruction = "Argue for remote work."
timeout_ms = 500

[participants.con]
role = "debate_participant"
system_instruction = "Argue against remote work."

[session]
initiator = "pro"
responder = "con"
seeds = ["Open the debate"]
"#,
    );

    let config = Config::load(Some(path.as_path())).unwrap();

    assert_eq!(config.max_turns, 4);
    assert_eq!(config.escalation, None);
    assert_eq!(config.seeds, vec!["Open the debate".to_string()]);
    let pro = config.participant("pro").unwrap();
    assert_eq!(pro.contract.role, AgentRole::DebateParticipant);
    assert_eq!(pro.contract.system_instruction, "Argue for remote work.");
    assert_eq!(config.timeout_for("pro"), Duration::from_millis(500));
    assert_eq!(config.timeout_for("con"), Duration::from_millis(2000));
}

#[test]
fn unknown_keys_are_rejected() {
    let (_dir, path) = write_config("max_turn = 4\n");
    assert_matches!(
        Config::load(Some(path.as_path())),
        Err(ConfigError::Parse { .. })
    );
}

#[test]
fn session_must_name_configured_participants() {
    let (_dir, path) = write_config(
        r#"
[participants.user]
role = "user_simulator"

[session]
initiator = "user"
responder = "support"
"#,
    );
    assert_matches!(
        Config::load(Some(path.as_path())),
        Err(ConfigError::UnknownParticipant(id)) if id == "support"
    );
}
