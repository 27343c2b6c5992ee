//! Shared helpers: temp config directories and shell scripts standing in for
//! the agent CLI.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use cc_supervisor::session::{IterationState, IterationStore};

/// Write `config.yml` into `dir` pointing the supervisor at `agent`.
pub fn write_config(dir: &Path, agent: &Path, extra: &str) -> PathBuf {
    let path = dir.join("config.yml");
    let yaml = format!("agent_command: {}\n{}", agent.display(), extra);
    std::fs::write(&path, yaml).unwrap();
    path
}

/// Store rooted at the default state dir for a config in `dir`.
pub fn store(dir: &Path) -> IterationStore {
    IterationStore::new(dir.join("state"))
}

pub fn set_count(dir: &Path, session_id: &str, count: u32) {
    let store = store(dir);
    let mut state = IterationState::new(session_id);
    state.count = count;
    store.save(&mut state).unwrap();
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Create an executable fake agent in `dir`.
///
/// Every run records its arguments (one per line) in `args.txt`, the review
/// marker variable in `marker.txt` and its working directory in `cwd.txt`,
/// then prints `stdout_lines`, writes a line to stderr and exits with `exit_code`.
#[cfg(unix)]
pub fn fake_agent(dir: &Path, stdout_lines: &[&str], exit_code: i32) -> PathBuf {
    let mut body = String::from("#!/bin/sh\n");
    body.push_str(&format!(
        "printf '%s\\n' \"$@\" > {}\n",
        shell_quote(&dir.join("args.txt").display().to_string())
    ));
    body.push_str(&format!(
        "printf '%s' \"$CC_SUPERVISOR_REVIEW\" > {}\n",
        shell_quote(&dir.join("marker.txt").display().to_string())
    ));
    body.push_str(&format!(
        "pwd > {}\n",
        shell_quote(&dir.join("cwd.txt").display().to_string())
    ));
    for line in stdout_lines {
        body.push_str(&format!("printf '%s\\n' {}\n", shell_quote(line)));
    }
    body.push_str("echo 'agent diagnostics' >&2\n");
    body.push_str(&format!("exit {exit_code}\n"));
    script(dir, "fake-agent", &body)
}

/// Create an executable script with the given body.
#[cfg(unix)]
pub fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Arguments recorded by the last fake-agent run, or `None` if it never ran.
pub fn recorded_args(dir: &Path) -> Option<Vec<String>> {
    let text = std::fs::read_to_string(dir.join("args.txt")).ok()?;
    Some(text.lines().map(String::from).collect())
}

pub fn recorded_marker(dir: &Path) -> Option<String> {
    std::fs::read_to_string(dir.join("marker.txt")).ok()
}

/// A `result` stream line carrying the given verdict.
pub fn result_line(completed: bool, feedback: &str) -> String {
    serde_json::json!({
        "type": "result",
        "subtype": "success",
        "is_error": false,
        "session_id": "forked-session",
        "structured_output": { "completed": completed, "feedback": feedback }
    })
    .to_string()
}
