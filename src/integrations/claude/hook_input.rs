//! Parse JSON input from Claude Code hooks via stdin
//!
//! The Stop hook receives the session id and the transcript path:
//!
//! ```json
//! {"session_id":"3f2c...","transcript_path":"~/.claude/projects/-home-me-app/3f2c....jsonl",
//!  "hook_event_name":"Stop","stop_hook_active":false}
//! ```

use serde::Deserialize;
use std::path::PathBuf;

/// Read at most this much from stdin
const MAX_SIZE: usize = 1024 * 1024;

/// Input data from Claude Code hooks (received via stdin as JSON)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    /// Unique session identifier
    pub session_id: Option<String>,

    /// Path to conversation transcript file
    pub transcript_path: Option<String>,

    /// Hook event name ("Stop", "SubagentStop", ...)
    pub hook_event_name: Option<String>,

    /// True when Claude is already continuing because of a stop hook
    pub stop_hook_active: Option<bool>,
}

impl HookInput {
    /// Read and parse hook input from stdin
    ///
    /// Returns None if:
    /// - stdin is a TTY (interactive terminal, no piped input)
    /// - stdin is empty or not valid JSON
    /// - read fails
    pub fn from_stdin() -> Option<Self> {
        use std::io::{IsTerminal, Read};

        // Bail early if stdin is a TTY, so running the hook by hand doesn't block
        if std::io::stdin().is_terminal() {
            return None;
        }

        let stdin = std::io::stdin();
        let handle = stdin.lock();

        let mut buffer = Vec::with_capacity(4096);
        match handle.take(MAX_SIZE as u64).read_to_end(&mut buffer) {
            Ok(0) => return None,
            Err(_) => return None,
            Ok(_) => {}
        }

        Self::from_slice(&buffer)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        match serde_json::from_slice(bytes) {
            Ok(input) => Some(input),
            Err(e) => {
                tracing::debug!("Ignoring unparseable hook input: {}", e);
                None
            }
        }
    }

    /// Transcript path with a leading `~` expanded
    pub fn transcript(&self) -> Option<PathBuf> {
        let raw = self.transcript_path.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.strip_prefix("~/") {
            Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
            None => Some(PathBuf::from(raw)),
        }
    }

    pub fn session(&self) -> Option<&str> {
        self.session_id.as_deref().filter(|s| !s.trim().is_empty())
    }
}
