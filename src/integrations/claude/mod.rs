//! Claude Code integration
//!
//! Hook stdin parsing, transcript discovery and settings.json hook setup.

pub mod discovery;
pub mod hook_input;
pub mod setup;

use discovery::Transcript;
use hook_input::HookInput;

/// Work out which transcript a Stop hook invocation refers to.
///
/// Prefers the path and session id from the hook payload. When the payload
/// has no usable path, the newest transcript under `~/.claude/projects` is
/// used instead.
pub fn resolve_session(hook_input: Option<&HookInput>) -> Option<Transcript> {
    if let Some(input) = hook_input {
        tracing::debug!(
            event = input.hook_event_name.as_deref().unwrap_or("unknown"),
            stop_hook_active = input.stop_hook_active.unwrap_or(false),
            "Received hook input"
        );
        if let Some(path) = input.transcript().filter(|p| p.is_file()) {
            let session_id = input
                .session()
                .map(String::from)
                .or_else(|| discovery::session_id_for(&path))?;
            return Some(Transcript { session_id, path });
        }
        tracing::debug!("Hook input has no readable transcript_path, falling back to discovery");
    }

    let projects = discovery::claude_projects_dir()?;
    discovery::find_latest_transcript(&projects)
}
