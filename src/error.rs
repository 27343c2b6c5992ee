use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("hook input is missing session_id")]
    MissingSessionId,

    #[error("invalid hook input: {reason}")]
    InvalidHookInput { reason: String },

    #[error("config parse error in {path}: {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("state error for session {session_id}: {reason}")]
    State { session_id: String, reason: String },

    #[error("agent command not found: {program}")]
    AgentNotFound { program: String },

    #[error("failed to start agent command {program}: {reason}")]
    AgentStart { program: String, reason: String },

    #[error("agent exited with {}: {stderr}", exit_label(.code))]
    AgentExecution { code: Option<i32>, stderr: String },

    #[error("agent timed out after {timeout_secs}s")]
    AgentTimeout { timeout_secs: u64 },

    #[error("agent run cancelled")]
    AgentCancelled,

    #[error("invalid review result: {reason}")]
    ResultParse { reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "no status (killed by signal)".into(),
    }
}

impl SupervisorError {
    /// Stable machine-readable code for logs and exit diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            SupervisorError::MissingSessionId => "missing_session_id",
            SupervisorError::InvalidHookInput { .. } => "invalid_hook_input",
            SupervisorError::ConfigParse { .. } => "config_parse",
            SupervisorError::InvalidConfig { .. } => "invalid_config",
            SupervisorError::State { .. } => "state",
            SupervisorError::AgentNotFound { .. } => "agent_not_found",
            SupervisorError::AgentStart { .. } => "agent_start_failed",
            SupervisorError::AgentExecution { .. } => "agent_execution_failed",
            SupervisorError::AgentTimeout { .. } => "agent_timeout",
            SupervisorError::AgentCancelled => "agent_cancelled",
            SupervisorError::ResultParse { .. } => "result_parse",
            SupervisorError::Io(_) => "io",
            SupervisorError::Json(_) => "json",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, SupervisorError::AgentTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
