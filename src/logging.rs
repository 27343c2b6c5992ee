use std::str::FromStr;

use tracing::Level;

/// Environment variable selecting the log level.
pub const LOG_ENV: &str = "CC_SUPERVISOR_LOG";

/// Resolve the log level from `CC_SUPERVISOR_LOG`, falling back to `default`
/// when unset or unparsable.
pub fn level_from_env(default: Level) -> Level {
    std::env::var(LOG_ENV)
        .ok()
        .and_then(|v| Level::from_str(v.trim()).ok())
        .unwrap_or(default)
}

/// Install the global subscriber. Logs go to stderr only: stdout carries the
/// hook decision.
pub fn init(default: Level) {
    let level = level_from_env(default);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
