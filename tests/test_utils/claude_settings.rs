#![allow(dead_code)]
//! Test utilities for Claude settings.json testing

use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;

/// A test environment with a temporary home directory for Claude settings
pub struct TestClaudeEnv {
    pub temp_dir: TempDir,
    pub claude_dir: PathBuf,
    pub settings_path: PathBuf,
}

impl TestClaudeEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let claude_dir = temp_dir.path().join(".claude");
        let settings_path = claude_dir.join("settings.json");

        Self {
            temp_dir,
            claude_dir,
            settings_path,
        }
    }

    pub fn create_claude_dir(&self) {
        std::fs::create_dir_all(&self.claude_dir).expect("Failed to create .claude dir");
    }

    pub fn write_settings(&self, settings: &Value) {
        self.create_claude_dir();
        let content = serde_json::to_string_pretty(settings).expect("Failed to serialize settings");
        std::fs::write(&self.settings_path, content).expect("Failed to write settings");
    }

    pub fn read_settings(&self) -> Value {
        let content =
            std::fs::read_to_string(&self.settings_path).expect("Failed to read settings");
        serde_json::from_str(&content).expect("Failed to parse settings")
    }

    pub fn settings_exists(&self) -> bool {
        self.settings_path.exists()
    }

    pub fn backup_path(&self) -> PathBuf {
        self.settings_path.with_extension("json.bak")
    }
}

impl Default for TestClaudeEnv {
    fn default() -> Self {
        Self::new()
    }
}

pub fn empty_settings() -> Value {
    json!({})
}

/// Stop hook already installed
pub fn settings_with_tracer_hook() -> Value {
    json!({
        "hooks": {
            "Stop": [
                {
                    "matcher": "",
                    "hooks": [{"type": "command", "command": "transcript-tracer hook"}]
                }
            ]
        }
    })
}

/// Stop hook installed by hand with a full path to the binary
pub fn settings_with_flat_tracer_hook() -> Value {
    json!({
        "hooks": {
            "Stop": [
                {"command": "/usr/local/bin/transcript-tracer hook"}
            ]
        }
    })
}

/// Other tools' hooks only
pub fn settings_with_other_hooks() -> Value {
    json!({
        "hooks": {
            "Stop": [
                {
                    "matcher": "",
                    "hooks": [{"type": "command", "command": "some-other-tool --flag"}]
                }
            ],
            "SessionStart": [
                {
                    "matcher": "",
                    "hooks": [{"type": "command", "command": "another-tool start"}]
                }
            ]
        },
        "someOtherSetting": true
    })
}

/// Existing user preferences (should be preserved)
pub fn settings_with_user_preferences() -> Value {
    json!({
        "alwaysThinkingEnabled": true,
        "enabledPlugins": {
            "some-plugin": true
        },
        "permissions": {
            "allow": ["Bash(git:*)"]
        }
    })
}

pub fn invalid_settings_hooks_not_object() -> Value {
    json!({
        "hooks": "not an object"
    })
}

pub fn invalid_settings_hook_type_not_array() -> Value {
    json!({
        "hooks": {
            "Stop": "not an array"
        }
    })
}
