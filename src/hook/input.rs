use std::path::PathBuf;

use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Result, SupervisorError};

/// Upper bound on hook input read from stdin.
const MAX_INPUT_BYTES: u64 = 1_048_576;

/// Stop-hook payload sent by the agent CLI on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookInvocation {
    pub session_id: String,
    pub stop_hook_active: bool,
    pub cwd: Option<PathBuf>,
}

#[derive(Deserialize)]
struct RawInvocation {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    stop_hook_active: bool,
    #[serde(default)]
    cwd: Option<PathBuf>,
}

impl HookInvocation {
    /// Parse the JSON payload. A missing or blank `session_id` is an error.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let raw: RawInvocation =
            serde_json::from_slice(data).map_err(|e| SupervisorError::InvalidHookInput {
                reason: e.to_string(),
            })?;

        let session_id = raw
            .session_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(SupervisorError::MissingSessionId)?;

        Ok(Self {
            session_id,
            stop_hook_active: raw.stop_hook_active,
            cwd: raw.cwd,
        })
    }

    /// Read the whole of `input` (bounded) and parse it.
    pub async fn read_from<R>(input: R) -> Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = Vec::new();
        input.take(MAX_INPUT_BYTES).read_to_end(&mut buf).await?;
        if buf.iter().all(u8::is_ascii_whitespace) {
            return Err(SupervisorError::InvalidHookInput {
                reason: "empty input".into(),
            });
        }
        Self::parse(&buf)
    }
}
