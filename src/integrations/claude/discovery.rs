//! Locate the transcript to process when the hook did not say
//!
//! Claude Code stores one `<session-id>.jsonl` per session directly inside
//! `~/.claude/projects/<project-slug>/`. Subagent transcripts (`agent-*.jsonl`)
//! live next to them and are picked up too when they are the newest.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub fn claude_projects_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".claude").join("projects"))
}

/// A transcript file and the session it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub session_id: String,
    pub path: PathBuf,
}

/// Most recently modified `*.jsonl` one level below `projects_dir`
pub fn find_latest_transcript(projects_dir: &Path) -> Option<Transcript> {
    let entries = match fs::read_dir(projects_dir) {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!("Projects directory {} unreadable: {}", projects_dir.display(), e);
            return None;
        }
    };

    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for project in entries.flatten() {
        let project_path = project.path();
        if !project_path.is_dir() {
            continue;
        }
        let Ok(files) = fs::read_dir(&project_path) else {
            continue;
        };
        for file in files.flatten() {
            let path = file.path();
            if !path.extension().is_some_and(|ext| ext == "jsonl") {
                continue;
            }
            let Ok(modified) = file.metadata().and_then(|m| m.modified()) else {
                continue;
            };
            if latest.as_ref().map_or(true, |(best, _)| modified > *best) {
                latest = Some((modified, path));
            }
        }
    }

    let (_, path) = latest?;
    let session_id = session_id_for(&path)?;
    tracing::debug!("Found transcript {} for session {}", path.display(), session_id);
    Some(Transcript { session_id, path })
}

/// `sessionId` of the first line, falling back to the file stem.
///
/// Returns None when the first line is unreadable or not JSON.
pub fn session_id_for(path: &Path) -> Option<String> {
    let file = fs::File::open(path).ok()?;
    let mut first_line = String::new();
    BufReader::new(file).read_line(&mut first_line).ok()?;

    let stem = || path.file_stem().map(|s| s.to_string_lossy().to_string());
    if first_line.trim().is_empty() {
        return stem();
    }

    let header: serde_json::Value = match serde_json::from_str(first_line.trim()) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!("Error reading transcript {}: {}", path.display(), e);
            return None;
        }
    };

    header
        .get("sessionId")
        .and_then(|v| v.as_str())
        .map(String::from)
        .or_else(stem)
}
