pub mod codec;

pub use codec::{decode_line, encode_line};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One line-delimited JSON record emitted by the agent CLI in stream mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// Assistant prose.
    Text { content: String },

    /// The agent invoked a tool.
    ToolUse {
        name: String,
        #[serde(default)]
        input: Value,
    },

    /// Output returned to the agent by a tool.
    ToolResult {
        #[serde(default)]
        content: String,
        #[serde(default)]
        is_error: bool,
    },

    /// Final record of a run.
    Result(ResultMessage),

    /// Session bookkeeping (init, hooks, etc.).
    System {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subtype: Option<String>,
        #[serde(flatten)]
        meta: Map<String, Value>,
    },

    /// A `type` this crate does not interpret.
    #[serde(skip)]
    Unknown { kind: String },
}

impl StreamMessage {
    /// The `type` discriminator as it appears on the wire.
    pub fn kind(&self) -> &str {
        match self {
            StreamMessage::Text { .. } => "text",
            StreamMessage::ToolUse { .. } => "tool_use",
            StreamMessage::ToolResult { .. } => "tool_result",
            StreamMessage::Result(_) => "result",
            StreamMessage::System { .. } => "system",
            StreamMessage::Unknown { kind } => kind,
        }
    }

    pub fn as_result(&self) -> Option<&ResultMessage> {
        match self {
            StreamMessage::Result(result) => Some(result),
            _ => None,
        }
    }
}

/// Payload of a `result` record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,

    #[serde(default)]
    pub is_error: bool,

    /// Final assistant text of the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Schema-constrained payload, when the run was given a JSON schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_output: Option<Value>,

    /// Everything else (cost, durations, usage...).
    #[serde(flatten)]
    pub meta: Map<String, Value>,
}
