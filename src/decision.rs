use std::io::Write;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SupervisorError};
use crate::stream::ResultMessage;

/// Reason used when the reviewer blocks without saying why.
pub const DEFAULT_CONTINUE_REASON: &str = "Please continue completing the task";

/// The only decision value the host understands. Absence means "allow stop".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Block,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Block => write!(f, "block"),
        }
    }
}

/// The hook's single stdout artifact.
///
/// Allow: `{}` (or `{"reason": ...}` when a reason is attached).
/// Block: `{"decision":"block","reason":"..."}` with a non-empty reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookDecision {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

impl HookDecision {
    pub fn allow() -> Self {
        Self::default()
    }

    /// Block the stop. An empty reason falls back to [`DEFAULT_CONTINUE_REASON`].
    pub fn block(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let reason = if reason.trim().is_empty() {
            DEFAULT_CONTINUE_REASON.to_string()
        } else {
            reason
        };
        Self {
            decision: Some(Decision::Block),
            reason,
        }
    }

    pub fn is_block(&self) -> bool {
        self.decision == Some(Decision::Block)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Write the decision as exactly one JSON line and flush.
    pub fn emit<W: Write>(&self, out: &mut W) -> Result<()> {
        let line = self.to_json()?;
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}

impl From<&SupervisorResult> for HookDecision {
    fn from(result: &SupervisorResult) -> Self {
        if result.completed {
            HookDecision::allow()
        } else {
            HookDecision::block(result.feedback.clone())
        }
    }
}

/// The reviewer's verdict, validated out of a `result` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorResult {
    pub completed: bool,
    #[serde(default)]
    pub feedback: String,
}

impl SupervisorResult {
    /// Extract the verdict from a `result` record.
    ///
    /// Reads `structured_output`; when that is absent, falls back to the final
    /// result text if it is itself a JSON object. `completed` must be a bool,
    /// `feedback` must be a string when present.
    pub fn from_result(message: &ResultMessage) -> Result<Self> {
        if message.is_error {
            return Err(parse_err("review run reported an error"));
        }

        let payload = match &message.structured_output {
            Some(value) => value.clone(),
            None => message
                .result
                .as_deref()
                .and_then(|text| serde_json::from_str::<Value>(text.trim()).ok())
                .ok_or_else(|| parse_err("result has no structured_output"))?,
        };
        Self::from_value(&payload)
    }

    pub fn from_value(payload: &Value) -> Result<Self> {
        let object = payload
            .as_object()
            .ok_or_else(|| parse_err("structured_output is not an object"))?;

        let completed = match object.get("completed") {
            Some(Value::Bool(b)) => *b,
            Some(_) => return Err(parse_err("`completed` is not a boolean")),
            None => return Err(parse_err("`completed` is missing")),
        };

        let feedback = match object.get("feedback") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(parse_err("`feedback` is not a string")),
        };

        Ok(Self {
            completed,
            feedback,
        })
    }
}

fn parse_err(reason: &str) -> SupervisorError {
    SupervisorError::ResultParse {
        reason: reason.to_string(),
    }
}
