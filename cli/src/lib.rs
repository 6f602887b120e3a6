//! Session driver for parley: runs one scripted conversation from the command
//! line and renders it turn by turn.

pub mod render;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use parley_core::AgentContract;
use parley_core::AgentRole;
use parley_core::Config;
use parley_core::ScriptedBackend;
use parley_core::Transcript;
use parley_orchestrator::Roster;
use parley_orchestrator::Session;
use parley_orchestrator::UtteranceSource;
use parley_protocol::events::SessionEnd;
use tracing::info;

use crate::render::Palette;
use crate::render::print_events;

/// A turn failed and the session was halted.
pub const EXIT_TURN_FAILED: u8 = 1;
/// Bad arguments, configuration or input files.
pub const EXIT_USAGE: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "parley", version, about = "Run turn-based conversations between agents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one session against a scripted reasoning backend.
    Run(RunArgs),

    /// Print the JSON schema of the output a role must produce.
    Schema {
        /// Role name, e.g. `support` or `questioner`.
        role: AgentRole,
    },
}

#[derive(Debug, clap::Args)]
pub struct RunArgs {
    /// Configuration file. Defaults to `$PARLEY_HOME/config.toml`.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// JSON file with the scripted replies of every participant.
    #[arg(short, long, value_name = "FILE")]
    pub script: PathBuf,

    /// Utterance opening a round. Repeat for several rounds; replaces the
    /// configured seeds.
    #[arg(long = "seed", value_name = "TEXT")]
    pub seeds: Vec<String>,

    /// Round budget for this session.
    #[arg(long, value_name = "N")]
    pub max_turns: Option<u32>,

    /// Continue the session saved in this transcript.
    #[arg(long, value_name = "FILE")]
    pub resume: Option<PathBuf>,

    /// Write the transcript here once the session stops.
    #[arg(long, value_name = "FILE")]
    pub save: Option<PathBuf>,
}

pub async fn run_main(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Run(args) => run_session(args).await,
        Command::Schema { role } => {
            let schema = AgentContract::for_role(role).output_schema();
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_session(args: RunArgs) -> anyhow::Result<ExitCode> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(max_turns) = args.max_turns {
        config.max_turns = max_turns;
    }
    if !args.seeds.is_empty() {
        config.seeds = args.seeds;
    }

    let backend = ScriptedBackend::load(&args.script)
        .with_context(|| format!("failed to load script {}", args.script.display()))?;
    let roster = Roster::from_config(&config, Arc::new(backend));

    let session = match &args.resume {
        Some(path) => Session::from_transcript(Transcript::load(path)?)?,
        None => Session::new(),
    };

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let orchestrator = roster.orchestrator(&config)?.with_events(tx);

    let cancel = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling session");
            cancel.cancel();
        }
    });

    let printer = tokio::spawn(print_events(rx, Palette::detect()));
    let result = orchestrator
        .run(session, UtteranceSource::new(config.seeds))
        .await;
    drop(orchestrator);
    printer.await?;

    let (session, code) = match result {
        Ok(outcome) => {
            if let Some(resolution) = outcome.escalation.as_ref().and_then(|e| e.resolution.as_ref()) {
                info!(resolution = resolution.content(), "escalation resolved");
            }
            if outcome.end == SessionEnd::Cancelled {
                eprintln!("session cancelled");
            }
            (outcome.session, ExitCode::SUCCESS)
        }
        Err(failure) => {
            eprintln!("error: {}", failure.error);
            (failure.session, ExitCode::from(EXIT_TURN_FAILED))
        }
    };

    if let Some(path) = &args.save {
        session.to_transcript().save(path)?;
        info!(path = %path.display(), rounds = session.state().turns_so_far(), "transcript saved");
    }
    Ok(code)
}
