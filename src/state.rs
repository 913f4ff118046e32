//! Per-session cursor state, persisted across hook invocations
//!
//! The file store keeps every session in one JSON map:
//!
//! ```json
//! {
//!   "3f2c...": { "last_line": 42, "turn_count": 7, "updated_at": "2024-01-01T00:00:00Z" }
//! }
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// How far a session's transcript has been consumed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Lines of the transcript already processed
    #[serde(default)]
    pub last_line: usize,
    /// Turns already emitted; the next turn is `turn_count + 1`
    #[serde(default)]
    pub turn_count: u64,
    #[serde(default, alias = "updated")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Storage for session states, keyed by session id
pub trait StateStore {
    /// State for a session; a default (zero) state if never seen
    fn load(&self, session_id: &str) -> Result<SessionState>;
    fn save(&self, session_id: &str, state: &SessionState) -> Result<()>;
}

pub type StateMap = HashMap<String, SessionState>;

/// Default state file location, shared with earlier versions of the hook
pub fn default_state_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".claude").join("state").join("keywordsai_state.json"))
}

fn parse_state_map(content: &str, path: &Path) -> StateMap {
    if content.trim().is_empty() {
        return StateMap::new();
    }
    match serde_json::from_str(content) {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!("Ignoring unreadable state file {}: {}", path.display(), e);
            StateMap::new()
        }
    }
}

/// JSON file store with advisory file locking
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every session (with a shared lock)
    pub fn read_all(&self) -> Result<StateMap> {
        if !self.path.exists() {
            return Ok(StateMap::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        file.lock_shared()?;

        let mut content = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut content);
        file.unlock()?;
        read.with_context(|| format!("Failed to read {}", self.path.display()))?;

        Ok(parse_state_map(&content, &self.path))
    }
}

impl StateStore for JsonFileStore {
    fn load(&self, session_id: &str) -> Result<SessionState> {
        Ok(self.read_all()?.remove(session_id).unwrap_or_default())
    }

    /// Read-modify-write under one exclusive lock so other sessions survive
    fn save(&self, session_id: &str, state: &SessionState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        file.lock_exclusive()?;

        let result = (|| -> Result<()> {
            let mut content = String::new();
            file.read_to_string(&mut content)?;

            let mut sessions = parse_state_map(&content, &self.path);
            sessions.insert(session_id.to_string(), state.clone());

            let serialized = serde_json::to_string_pretty(&sessions)?;
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            file.write_all(serialized.as_bytes())?;
            file.flush()?;
            Ok(())
        })();

        file.unlock()?;
        result.with_context(|| format!("Failed to write state to {}", self.path.display()))
    }
}

/// In-process store, for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Mutex<StateMap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session_id: &str, state: SessionState) -> Self {
        let store = Self::default();
        if let Ok(mut sessions) = store.sessions.lock() {
            sessions.insert(session_id.to_string(), state);
        }
        store
    }
}

impl StateStore for MemoryStore {
    fn load(&self, session_id: &str) -> Result<SessionState> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|e| anyhow::anyhow!("State lock poisoned: {e}"))?;
        Ok(sessions.get(session_id).cloned().unwrap_or_default())
    }

    fn save(&self, session_id: &str, state: &SessionState) -> Result<()> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| anyhow::anyhow!("State lock poisoned: {e}"))?;
        sessions.insert(session_id.to_string(), state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_updated_key_is_accepted() {
        let json = r#"{"last_line": 12, "turn_count": 3, "updated": "2024-01-01T00:00:00.123456+00:00"}"#;
        let state: SessionState = serde_json::from_str(json).unwrap();
        assert_eq!(state.last_line, 12);
        assert_eq!(state.turn_count, 3);
        assert!(state.updated_at.is_some());
    }

    #[test]
    fn test_missing_fields_default() {
        let state: SessionState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, SessionState::default());
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.load("s").unwrap(), SessionState::default());

        let state = SessionState {
            last_line: 5,
            turn_count: 2,
            updated_at: None,
        };
        store.save("s", &state).unwrap();
        assert_eq!(store.load("s").unwrap(), state);
        assert_eq!(store.load("other").unwrap(), SessionState::default());
    }
}
