//! One incremental pass over a session's transcript
//!
//! load state -> read new lines -> classify -> assemble turns -> compile spans
//! -> send each turn -> save state
//!
//! Once a turn has been compiled its lines count as consumed, whether or not
//! the send succeeded.

use crate::config::Config;
use crate::integrations::keywords::{IngestClient, SpanSink};
use crate::spans::{compile_turn, CompileContext, Span};
use crate::state::{JsonFileStore, SessionState, StateStore};
use crate::transcript::{assemble, classify, read_new_lines, AssembleOptions};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::{Duration, Instant};

/// Spans for one turn, sent as one batch
#[derive(Debug, Clone)]
pub struct CompiledTurn {
    pub number: u64,
    pub spans: Vec<Span>,
}

#[derive(Debug, Clone)]
pub struct Pass {
    pub turns: Vec<CompiledTurn>,
    /// State to persist after the turns have been sent
    pub state: SessionState,
    /// False when the transcript had nothing past the cursor
    pub advanced: bool,
}

/// Compile the turns completed since `previous` without side effects
pub fn compile_new_turns(
    session_id: &str,
    content: &str,
    previous: &SessionState,
    options: AssembleOptions,
    now: DateTime<Utc>,
) -> Pass {
    let new_lines = read_new_lines(content, previous.last_line);
    // Nothing parsed past the cursor (possibly a half-written last line):
    // leave the cursor alone so the next run reads it again
    if new_lines.is_empty() {
        return Pass {
            turns: Vec::new(),
            state: previous.clone(),
            advanced: false,
        };
    }

    tracing::debug!("Processing {} new records", new_lines.records.len());

    let records = new_lines.records.iter().filter_map(classify);
    let assembly = assemble(records, options);
    if let Some(pending) = &assembly.pending {
        tracing::debug!(
            has_user = pending.user.is_some(),
            assistant_messages = pending.assistants.len(),
            "Leaving incomplete turn behind"
        );
    }

    let turns: Vec<CompiledTurn> = assembly
        .turns
        .iter()
        .zip(previous.turn_count + 1..)
        .map(|(turn, number)| {
            let ctx = CompileContext {
                session_id,
                turn_number: number,
                now,
            };
            CompiledTurn {
                number,
                spans: compile_turn(turn, &ctx),
            }
        })
        .collect();

    let state = SessionState {
        last_line: new_lines.total_lines,
        turn_count: previous.turn_count + turns.len() as u64,
        updated_at: Some(now),
    };

    Pass {
        turns,
        state,
        advanced: true,
    }
}

/// Run one pass for a session: compile, send each turn, persist the cursor.
///
/// Send failures are logged and skipped. Returns the number of turns compiled.
pub async fn process_session<S, K>(
    session_id: &str,
    content: &str,
    store: &S,
    sink: &K,
    options: AssembleOptions,
) -> Result<usize>
where
    S: StateStore,
    K: SpanSink,
{
    let previous = store
        .load(session_id)
        .with_context(|| format!("Failed to load state for session {}", session_id))?;

    let pass = compile_new_turns(session_id, content, &previous, options, Utc::now());
    if !pass.advanced {
        return Ok(0);
    }

    for turn in &pass.turns {
        match sink.send(&turn.spans).await {
            Ok(()) => tracing::debug!("Sent {} spans for turn {}", turn.spans.len(), turn.number),
            Err(e) => tracing::error!("Failed to send spans for turn {}: {:#}", turn.number, e),
        }
    }

    store
        .save(session_id, &pass.state)
        .with_context(|| format!("Failed to save state for session {}", session_id))?;

    Ok(pass.turns.len())
}

/// Process a transcript file with the configured state file and ingest endpoint
pub async fn run_transcript(
    config: &Config,
    api_key: &str,
    session_id: &str,
    transcript: &Path,
) -> Result<usize> {
    let started = Instant::now();

    let bytes = std::fs::read(transcript)
        .with_context(|| format!("Failed to read transcript {}", transcript.display()))?;
    let content = String::from_utf8_lossy(&bytes);

    let store = JsonFileStore::new(config.state_file()?);
    let client = IngestClient::new(
        &config.keywords.base_url,
        api_key,
        Duration::from_secs(config.keywords.request_timeout_secs),
    )?;
    let options = AssembleOptions {
        strict: config.turns.strict,
    };

    tracing::debug!(
        "Processing session {} ({}), state in {}",
        session_id,
        transcript.display(),
        store.path().display()
    );
    let turns = process_session(session_id, &content, &store, &client, options).await?;

    let elapsed = started.elapsed().as_secs_f64();
    tracing::info!("Processed {} turns in {:.1}s", turns, elapsed);
    if elapsed > config.turns.slow_run_warn_secs as f64 {
        tracing::warn!(
            "Run took {:.1}s (>{}s), transcript may be too large to process per stop",
            elapsed,
            config.turns.slow_run_warn_secs
        );
    }

    Ok(turns)
}

/// Every span the whole transcript compiles to, numbering turns from 1
pub fn compile_transcript(session_id: &str, content: &str, options: AssembleOptions) -> Vec<Span> {
    compile_new_turns(session_id, content, &SessionState::default(), options, Utc::now())
        .turns
        .into_iter()
        .flat_map(|turn| turn.spans)
        .collect()
}
