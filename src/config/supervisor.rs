use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SupervisorError};

pub const DEFAULT_MAX_ITERATIONS: u32 = 20;
pub const MIN_MAX_ITERATIONS: u32 = 1;
pub const MAX_MAX_ITERATIONS: u32 = 100;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 600;
pub const MIN_TIMEOUT_SECONDS: u64 = 10;
pub const MAX_TIMEOUT_SECONDS: u64 = 3600;

pub const DEFAULT_AGENT_COMMAND: &str = "claude";

/// Supervisor loop configuration from `config.yml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Master switch. When false the hook always allows stop. Default: true.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Review rounds allowed per session before the hook stops blocking. Default: 20.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Deadline for one review subprocess, in seconds. Default: 600.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// File holding a custom review prompt. Built-in prompt when unset.
    #[serde(default)]
    pub prompt_path: Option<PathBuf>,

    /// Agent CLI executable used for the review. Default: `claude`.
    #[serde(default = "default_agent_command")]
    pub agent_command: String,

    /// Directory for per-session iteration state. Default: `<config dir>/state`.
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    /// Directory the config was loaded from; relative paths resolve against it.
    #[serde(skip)]
    base_dir: PathBuf,
}

fn default_enabled() -> bool {
    true
}
fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}
fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}
fn default_agent_command() -> String {
    DEFAULT_AGENT_COMMAND.into()
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            prompt_path: None,
            agent_command: DEFAULT_AGENT_COMMAND.into(),
            state_dir: None,
            base_dir: super::dirs_global(),
        }
    }
}

impl SupervisorConfig {
    /// Load config from a YAML file. Returns defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        if !path.exists() {
            return Ok(Self {
                base_dir,
                ..Self::default()
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = if contents.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&contents).map_err(|e| SupervisorError::ConfigParse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        };
        config.base_dir = base_dir;
        config.clamp();
        Ok(config)
    }

    /// Load config from the global config directory.
    pub fn load() -> Result<Self> {
        Self::load_from(&super::default_config_path())
    }

    /// Force numeric settings into their supported ranges.
    pub fn clamp(&mut self) {
        let iterations = self
            .max_iterations
            .clamp(MIN_MAX_ITERATIONS, MAX_MAX_ITERATIONS);
        if iterations != self.max_iterations {
            tracing::warn!(
                configured = self.max_iterations,
                using = iterations,
                "max_iterations out of range"
            );
            self.max_iterations = iterations;
        }

        let timeout = self
            .timeout_seconds
            .clamp(MIN_TIMEOUT_SECONDS, MAX_TIMEOUT_SECONDS);
        if timeout != self.timeout_seconds {
            tracing::warn!(
                configured = self.timeout_seconds,
                using = timeout,
                "timeout_seconds out of range"
            );
            self.timeout_seconds = timeout;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Resolved directory holding per-session state files.
    pub fn state_dir(&self) -> PathBuf {
        match &self.state_dir {
            Some(dir) => self.resolve(dir),
            None => self.base_dir.join("state"),
        }
    }

    /// Review prompt text: the configured file's contents or the built-in prompt.
    pub fn review_prompt(&self) -> Result<String> {
        let Some(path) = &self.prompt_path else {
            return Ok(crate::hook::prompt::DEFAULT_REVIEW_PROMPT.to_string());
        };
        let path = self.resolve(path);
        let text = std::fs::read_to_string(&path).map_err(|e| SupervisorError::InvalidConfig {
            reason: format!("cannot read prompt_path {}: {}", path.display(), e),
        })?;
        if text.trim().is_empty() {
            return Err(SupervisorError::InvalidConfig {
                reason: format!("prompt_path {} is empty", path.display()),
            });
        }
        Ok(text)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}
