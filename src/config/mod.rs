use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://api.keywordsai.co/api";

pub const ENV_ENABLED: &str = "TRACE_TO_KEYWORDSAI";
pub const ENV_API_KEY: &str = "KEYWORDSAI_API_KEY";
pub const ENV_BASE_URL: &str = "KEYWORDSAI_BASE_URL";
pub const ENV_DEBUG: &str = "CC_KEYWORDSAI_DEBUG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Tracing is off unless explicitly turned on
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub keywords: KeywordsConfig,
    #[serde(default)]
    pub turns: TurnConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordsConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnConfig {
    /// Emit a user message that got no reply before the next prompt as its
    /// own (empty) turn instead of dropping it
    #[serde(default)]
    pub strict: bool,
    #[serde(default = "default_slow_run_warn")]
    pub slow_run_warn_secs: u64,
}

fn default_slow_run_warn() -> u64 {
    180
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            strict: false,
            slow_run_warn_secs: default_slow_run_warn(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathsConfig {
    #[serde(default)]
    pub state_file: Option<PathBuf>,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

/// Whether a run should proceed, decided before touching any transcript
#[derive(Debug, PartialEq, Eq)]
pub enum Gate<'a> {
    Disabled,
    MissingApiKey,
    Ready { api_key: &'a str },
}

impl Config {
    pub fn gate(&self) -> Gate<'_> {
        if !self.enabled {
            return Gate::Disabled;
        }
        match self.keywords.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Gate::Ready { api_key: key },
            _ => Gate::MissingApiKey,
        }
    }

    /// Overlay environment variables from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay environment variables, looked up through `lookup`
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(enabled) = lookup(ENV_ENABLED) {
            self.enabled = enabled.trim().eq_ignore_ascii_case("true");
        }
        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.trim().is_empty()) {
            self.keywords.api_key = Some(key.trim().to_string());
        }
        if let Some(url) = lookup(ENV_BASE_URL).filter(|u| !u.trim().is_empty()) {
            self.keywords.base_url = url.trim().to_string();
        }
        if let Some(debug) = lookup(ENV_DEBUG) {
            self.debug = debug.trim().eq_ignore_ascii_case("true");
        }
    }

    pub fn state_file(&self) -> Result<PathBuf> {
        match &self.paths.state_file {
            Some(path) => Ok(path.clone()),
            None => crate::state::default_state_path(),
        }
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        match &self.paths.log_file {
            Some(path) => Ok(path.clone()),
            None => crate::logging::default_log_path(),
        }
    }
}

pub fn config_dir() -> Result<PathBuf> {
    let dir = directories::ProjectDirs::from("", "", "transcript-tracer")
        .context("Could not determine config directory")?
        .config_dir()
        .to_path_buf();
    Ok(dir)
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Parse a config file without the environment overlay
pub fn load_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", path.display()))?;

    Ok(config)
}

/// Load configuration: defaults, then the config file, then the environment.
///
/// An explicitly given path must exist; the default path is optional.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(p) => {
            if !p.exists() {
                anyhow::bail!("Config file not found at {}", p.display());
            }
            load_file(p)?
        }
        None => match default_config_path() {
            Ok(p) if p.exists() => load_file(&p)?,
            _ => Config::default(),
        },
    };

    config.apply_env();
    Ok(config)
}

/// Environment-only configuration, used when the config file is unusable
pub fn from_env() -> Config {
    let mut config = Config::default();
    config.apply_env();
    config
}
