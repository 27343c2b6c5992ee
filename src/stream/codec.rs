use serde_json::{json, Value};

use super::StreamMessage;
use crate::error::Result;

const KNOWN_KINDS: [&str; 5] = ["text", "tool_use", "tool_result", "result", "system"];

/// Decode one line of agent output.
///
/// Returns `None` for blank lines and anything that isn't a JSON object with a
/// string `type`: the stream interleaves prose with protocol records.
pub fn decode_line(line: &str) -> Option<StreamMessage> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value: Value = serde_json::from_str(trimmed).ok()?;
    let kind = value.get("type")?.as_str()?.to_string();

    match kind.as_str() {
        "assistant" => Some(decode_assistant(&value)),
        "user" => Some(decode_user(&value)),
        k if KNOWN_KINDS.contains(&k) => match serde_json::from_value(value) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::debug!(kind = k, error = %e, "skipping malformed stream record");
                None
            }
        },
        _ => Some(StreamMessage::Unknown { kind }),
    }
}

/// Encode a message as a single JSON line (no trailing newline).
pub fn encode_line(message: &StreamMessage) -> Result<String> {
    match message {
        StreamMessage::Unknown { kind } => Ok(json!({ "type": kind }).to_string()),
        other => Ok(serde_json::to_string(other)?),
    }
}

/// Native `assistant` envelope: `{"type":"assistant","message":{"content":[...]}}`.
/// A tool call wins over prose; otherwise text blocks are joined.
fn decode_assistant(value: &Value) -> StreamMessage {
    let blocks = content_blocks(value);

    if let Some(tool) = blocks
        .iter()
        .find(|b| b.get("type").and_then(Value::as_str) == Some("tool_use"))
    {
        return StreamMessage::ToolUse {
            name: tool
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            input: tool.get("input").cloned().unwrap_or(Value::Null),
        };
    }

    let texts: Vec<&str> = blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect();
    if texts.is_empty() {
        return StreamMessage::Unknown {
            kind: "assistant".into(),
        };
    }
    StreamMessage::Text {
        content: texts.join("\n"),
    }
}

/// Native `user` envelope carrying tool results back to the agent.
fn decode_user(value: &Value) -> StreamMessage {
    let blocks = content_blocks(value);
    let Some(block) = blocks
        .iter()
        .find(|b| b.get("type").and_then(Value::as_str) == Some("tool_result"))
    else {
        return StreamMessage::Unknown {
            kind: "user".into(),
        };
    };

    let content = match block.get("content") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    };
    StreamMessage::ToolResult {
        content,
        is_error: block
            .get("is_error")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

fn content_blocks(value: &Value) -> Vec<Value> {
    match value.pointer("/message/content") {
        Some(Value::Array(blocks)) => blocks.clone(),
        Some(Value::String(text)) => vec![json!({ "type": "text", "text": text })],
        _ => Vec::new(),
    }
}
