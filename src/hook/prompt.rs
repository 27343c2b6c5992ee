use schemars::JsonSchema;
use serde_json::Value;

/// Built-in instructions for the review subprocess.
pub const DEFAULT_REVIEW_PROMPT: &str = "\
You are now acting as a strict reviewer of the work done so far in this session.

Re-read the user's original request and everything that was done to satisfy it.
Check that every requested change was actually made, that the code builds and
its tests pass where that can be verified, and that nothing was left half done
(placeholder code, skipped steps, unanswered questions).

Do not make any changes yourself. Only judge.

Respond with `completed: true` if the task is fully and correctly done.
Otherwise respond with `completed: false` and put concrete, actionable
instructions for what must still be done in `feedback`.";

/// Shape the reviewer must answer in.
#[derive(JsonSchema)]
#[allow(dead_code)]
struct ReviewVerdict {
    /// True when the task is fully and correctly completed.
    completed: bool,
    /// What still needs to be done; empty when completed.
    feedback: String,
}

/// JSON schema passed to the agent CLI for the review's structured output.
pub fn verdict_schema() -> Value {
    let schema = schemars::schema_for!(ReviewVerdict);
    serde_json::to_value(&schema).unwrap_or_else(|_| {
        serde_json::json!({
            "type": "object",
            "properties": {
                "completed": { "type": "boolean" },
                "feedback": { "type": "string" }
            },
            "required": ["completed", "feedback"]
        })
    })
}

/// Full prompt for one review round.
pub fn review_prompt(base: &str, iteration: u32, max_iterations: u32) -> String {
    format!(
        "{}\n\nThis is review round {} of at most {}.",
        base.trim_end(),
        iteration,
        max_iterations
    )
}
