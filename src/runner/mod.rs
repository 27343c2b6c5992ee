pub mod process;

pub use process::{AgentOutput, AgentRun, ProcessRunner, RunSummary};

use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

/// Environment variable set on review subprocesses so their own Stop hook
/// recognises itself and steps aside.
pub const REVIEW_ENV: &str = "CC_SUPERVISOR_REVIEW";

/// True when this process was spawned as a review subprocess.
pub fn is_review_subprocess() -> bool {
    std::env::var(REVIEW_ENV)
        .map(|v| is_truthy(&v))
        .unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// How the agent CLI should print its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Plain text, captured verbatim.
    Text,
    /// Line-delimited JSON, decoded into [`crate::stream::StreamMessage`]s.
    #[default]
    StreamJson,
}

impl OutputFormat {
    fn as_flag(self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::StreamJson => "stream-json",
        }
    }
}

/// Everything needed to launch one non-interactive agent run.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub prompt: String,
    pub resume_session_id: Option<String>,
    pub fork_session: bool,
    pub output_format: OutputFormat,
    pub json_schema: Option<Value>,
    pub env: Vec<(String, String)>,
    /// Marks the child as a review subprocess (sets [`REVIEW_ENV`]).
    pub review_subprocess: bool,
    pub timeout: Duration,
    pub cwd: Option<PathBuf>,
}

impl AgentRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            resume_session_id: None,
            fork_session: false,
            output_format: OutputFormat::default(),
            json_schema: None,
            env: Vec::new(),
            review_subprocess: false,
            timeout: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECONDS),
            cwd: None,
        }
    }

    pub fn resume(mut self, session_id: impl Into<String>) -> Self {
        self.resume_session_id = Some(session_id.into());
        self
    }

    pub fn fork_session(mut self) -> Self {
        self.fork_session = true;
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn json_schema(mut self, schema: Value) -> Self {
        self.json_schema = Some(schema);
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn review_subprocess(mut self) -> Self {
        self.review_subprocess = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Argument vector for the agent CLI. Order is fixed; the prompt is last.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["--print".to_string()];

        if let Some(id) = &self.resume_session_id {
            args.push("--resume".into());
            args.push(id.clone());
        }
        if self.fork_session {
            args.push("--fork-session".into());
        }

        args.push("--output-format".into());
        args.push(self.output_format.as_flag().into());
        if self.output_format == OutputFormat::StreamJson {
            // print mode only streams JSON with --verbose
            args.push("--verbose".into());
        }

        if let Some(schema) = &self.json_schema {
            args.push("--json-schema".into());
            args.push(schema.to_string());
        }

        args.push(self.prompt.clone());
        args
    }

    /// Environment overrides for the child, including the review marker.
    pub fn child_env(&self) -> Vec<(String, String)> {
        let mut env = self.env.clone();
        if self.review_subprocess {
            env.push((REVIEW_ENV.to_string(), "1".to_string()));
        }
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_values() {
        for v in ["1", "true", "TRUE", " yes ", "on"] {
            assert!(is_truthy(v), "{v}");
        }
        for v in ["", "0", "false", "no", "off", "2"] {
            assert!(!is_truthy(v), "{v}");
        }
    }
}
