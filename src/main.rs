use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use transcript_tracer::config::{self, Gate};
use transcript_tracer::integrations::claude::{self, hook_input::HookInput, setup};
use transcript_tracer::transcript::AssembleOptions;
use transcript_tracer::{logging, pipeline};

#[derive(Parser, Debug)]
#[command(name = "transcript-tracer")]
#[command(about = "Send Claude Code conversation turns to Keywords AI as traces")]
#[command(version)]
struct Args {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stop hook handler (called by Claude Code with hook JSON on stdin)
    Hook,

    /// Process new turns of a transcript file and send them
    Run {
        /// Transcript JSONL file
        #[arg(long)]
        transcript: PathBuf,

        /// Session id (defaults to the transcript's own)
        #[arg(long)]
        session_id: Option<String>,
    },

    /// Print the spans a transcript compiles to, without sending anything
    Compile {
        #[arg(long)]
        transcript: PathBuf,

        #[arg(long)]
        session_id: Option<String>,
    },

    /// Register the Stop hook in Claude Code's settings.json
    Install {
        /// Settings file to patch (defaults to ~/.claude/settings.json)
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Hook => {
            run_hook(args.config.as_deref()).await;
            Ok(())
        }
        Command::Run {
            transcript,
            session_id,
        } => {
            let config = config::load(args.config.as_deref())?;
            logging::init_stderr(config.debug)?;

            let api_key = match config.gate() {
                Gate::Ready { api_key } => api_key.to_string(),
                Gate::Disabled => anyhow::bail!(
                    "Tracing is disabled, set {}=true to enable it",
                    config::ENV_ENABLED
                ),
                Gate::MissingApiKey => {
                    anyhow::bail!("{} is not set", config::ENV_API_KEY)
                }
            };
            let session_id = session_id_or_default(session_id, &transcript)?;
            let turns = pipeline::run_transcript(&config, &api_key, &session_id, &transcript).await?;
            println!("Sent {} turns for session {}", turns, session_id);
            Ok(())
        }
        Command::Compile {
            transcript,
            session_id,
        } => {
            let config = config::load(args.config.as_deref())?;
            logging::init_stderr(config.debug)?;

            let session_id = session_id_or_default(session_id, &transcript)?;
            let bytes = std::fs::read(&transcript)
                .with_context(|| format!("Failed to read transcript {}", transcript.display()))?;
            let options = AssembleOptions {
                strict: config.turns.strict,
            };
            let spans =
                pipeline::compile_transcript(&session_id, &String::from_utf8_lossy(&bytes), options);
            println!("{}", serde_json::to_string_pretty(&spans)?);
            Ok(())
        }
        Command::Install { settings } => {
            logging::init_stderr(false)?;

            let added = match &settings {
                Some(path) => setup::inject_hook_to_path(path)?,
                None => setup::inject_hook()?,
            };
            let shown = settings
                .or_else(setup::claude_settings_path)
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            if added {
                println!("Installed Stop hook in {}", shown);
            } else {
                println!("Stop hook already installed in {}", shown);
            }
            Ok(())
        }
    }
}

fn session_id_or_default(session_id: Option<String>, transcript: &Path) -> Result<String> {
    if let Some(id) = session_id {
        return Ok(id);
    }
    claude::discovery::session_id_for(transcript)
        .with_context(|| format!("Could not determine session id for {}", transcript.display()))
}

/// Never fails: Claude Code must not see a hook error
async fn run_hook(config_path: Option<&Path>) {
    // Read stdin before anything else so Claude Code is not kept waiting
    let hook_input = HookInput::from_stdin();

    let (config, config_error) = match config::load(config_path) {
        Ok(c) => (c, None),
        Err(e) => (config::from_env(), Some(e)),
    };

    // Nothing is logged until tracing is switched on
    let gate = config.gate();
    if gate == Gate::Disabled {
        return;
    }

    if let Err(e) = logging::init_file(&config) {
        eprintln!("transcript-tracer: failed to set up logging: {:#}", e);
    }
    if let Some(e) = config_error {
        tracing::error!("Failed to load config, using environment only: {:#}", e);
    }

    let api_key = match gate {
        Gate::Ready { api_key } => api_key,
        Gate::Disabled => return,
        Gate::MissingApiKey => {
            tracing::error!("{} not set", config::ENV_API_KEY);
            return;
        }
    };

    let Some(transcript) = claude::resolve_session(hook_input.as_ref()) else {
        tracing::debug!("No transcript found");
        return;
    };

    if let Err(e) =
        pipeline::run_transcript(&config, api_key, &transcript.session_id, &transcript.path).await
    {
        tracing::error!("Failed to process transcript: {:#}", e);
    }
}
