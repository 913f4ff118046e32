//! Claude Code hook injection
//!
//! Patches ~/.claude/settings.json so Claude Code runs `transcript-tracer hook`
//! every time the assistant stops responding.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Command registered as the Stop hook
pub const HOOK_COMMAND: &str = "transcript-tracer hook";

/// Marker used to recognise an already installed hook
const HOOK_MARKER: &str = "transcript-tracer";

/// Get the path to Claude's settings.json
pub fn claude_settings_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".claude").join("settings.json"))
}

/// Validate that a JSON value is a valid Claude settings object
pub fn validate_settings(settings: &Value) -> bool {
    if !settings.is_object() {
        return false;
    }

    match settings.get("hooks") {
        None => true,
        Some(Value::Object(hooks)) => hooks.values().all(Value::is_array),
        Some(_) => false,
    }
}

fn is_tracer_entry(entry: &Value) -> bool {
    let mentions = |v: Option<&Value>| {
        v.and_then(|c| c.as_str())
            .map(|s| s.contains(HOOK_MARKER))
            .unwrap_or(false)
    };

    // { "matcher": "", "hooks": [{ "type": "command", "command": "..." }] }
    if let Some(inner) = entry.get("hooks").and_then(|h| h.as_array()) {
        if inner.iter().any(|h| mentions(h.get("command"))) {
            return true;
        }
    }
    // { "command": "..." }
    mentions(entry.get("command"))
}

/// Check if the tracer Stop hook exists in a settings JSON value
pub fn has_tracer_hook(settings: &Value) -> bool {
    settings
        .get("hooks")
        .and_then(|hooks| hooks.get("Stop"))
        .and_then(|stop| stop.as_array())
        .map(|arr| arr.iter().any(is_tracer_entry))
        .unwrap_or(false)
}

/// Check if the hook is already installed at a specific path
pub fn hooks_installed_at_path(settings_path: &Path) -> bool {
    let Ok(content) = fs::read_to_string(settings_path) else {
        return false;
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(settings) => has_tracer_hook(&settings),
        Err(_) => false,
    }
}

/// Generate a Stop hook entry in the Claude Code format
pub fn generate_hook_entry() -> Value {
    json!({
        "matcher": "",
        "hooks": [
            {
                "type": "command",
                "command": HOOK_COMMAND
            }
        ]
    })
}

/// Add the tracer hook to a hooks object if not already present.
///
/// Returns true when an entry was added.
pub fn add_tracer_hook(hooks: &mut Value, hook_type: &str) -> bool {
    let hook_entry = generate_hook_entry();

    match hooks.get_mut(hook_type) {
        Some(Value::Array(arr)) => {
            if arr.iter().any(is_tracer_entry) {
                return false;
            }
            arr.push(hook_entry);
        }
        Some(_) => {
            tracing::warn!("Hook type {} was not an array, fixing", hook_type);
            hooks[hook_type] = json!([hook_entry]);
        }
        None => {
            hooks[hook_type] = json!([hook_entry]);
        }
    }
    true
}

fn read_settings(settings_path: &Path) -> Result<Value> {
    if !settings_path.exists() {
        if let Some(parent) = settings_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        return Ok(json!({}));
    }

    let content = fs::read_to_string(settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    if content.trim().is_empty() {
        return Ok(json!({}));
    }

    match serde_json::from_str(&content) {
        Ok(v) => Ok(v),
        Err(e) => {
            // Keep the unreadable file around before it gets replaced
            let backup_path = settings_path.with_extension("json.bak");
            match fs::copy(settings_path, &backup_path) {
                Ok(_) => tracing::warn!("Backed up invalid settings to {}", backup_path.display()),
                Err(backup_err) => tracing::warn!(
                    "Failed to backup invalid settings to {}: {}",
                    backup_path.display(),
                    backup_err
                ),
            }
            tracing::warn!("Existing settings.json is invalid JSON ({}), starting fresh", e);
            Ok(json!({}))
        }
    }
}

/// Register the Stop hook in the settings file at `settings_path`.
///
/// Returns false when the hook was already there and nothing was written.
pub fn inject_hook_to_path(settings_path: &Path) -> Result<bool> {
    let mut settings = read_settings(settings_path)?;

    if !settings.is_object() {
        tracing::warn!("Settings root is not an object, starting fresh");
        settings = json!({});
    }
    if !validate_settings(&settings) {
        // Only reset the hooks section, preserve other settings
        tracing::warn!("Settings structure is invalid, rebuilding hooks section");
        settings["hooks"] = json!({});
    }
    if settings.get("hooks").is_none() {
        settings["hooks"] = json!({});
    }

    let added = add_tracer_hook(&mut settings["hooks"], "Stop");
    if !added {
        tracing::info!("Stop hook already present in {}", settings_path.display());
        return Ok(false);
    }

    if !validate_settings(&settings) {
        anyhow::bail!("Generated settings are invalid, refusing to write");
    }

    let content = serde_json::to_string_pretty(&settings)?;
    fs::write(settings_path, content)
        .with_context(|| format!("Failed to write settings to {}", settings_path.display()))?;

    tracing::info!("Installed Stop hook in {}", settings_path.display());
    Ok(true)
}

/// Register the Stop hook in the user's Claude settings
pub fn inject_hook() -> Result<bool> {
    let path = claude_settings_path().context("Could not find home directory")?;
    inject_hook_to_path(&path)
}
