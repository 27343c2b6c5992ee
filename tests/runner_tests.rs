//! Process runner: spawning, draining, deadlines and cancellation.

mod common;

use std::time::{Duration, Instant};

use cc_supervisor::runner::{AgentRequest, OutputFormat, ProcessRunner, REVIEW_ENV};
use cc_supervisor::stream::StreamMessage;
use serde_json::json;

// ---------------------------------------------------------------------------
// Argument vector
// ---------------------------------------------------------------------------

#[test]
fn review_request_args_are_stable() {
    let request = AgentRequest::new("review please")
        .resume("s1")
        .fork_session()
        .output_format(OutputFormat::StreamJson)
        .json_schema(json!({ "type": "object" }));

    assert_eq!(
        request.build_args(),
        vec![
            "--print",
            "--resume",
            "s1",
            "--fork-session",
            "--output-format",
            "stream-json",
            "--verbose",
            "--json-schema",
            r#"{"type":"object"}"#,
            "review please",
        ]
    );
}

#[test]
fn plain_text_request_has_minimal_args() {
    let request = AgentRequest::new("hi").output_format(OutputFormat::Text);
    assert_eq!(
        request.build_args(),
        vec!["--print", "--output-format", "text", "hi"]
    );
}

#[test]
fn review_marker_is_only_set_on_review_runs() {
    let plain = AgentRequest::new("x").env("FOO", "bar");
    assert_eq!(plain.child_env(), vec![("FOO".to_string(), "bar".to_string())]);

    let review = AgentRequest::new("x").review_subprocess();
    assert!(review
        .child_env()
        .contains(&(REVIEW_ENV.to_string(), "1".to_string())));
}

// ---------------------------------------------------------------------------
// Spawning (unix: shell scripts stand in for the agent)
// ---------------------------------------------------------------------------

#[cfg(unix)]
mod spawn {
    use super::common::*;
    use super::*;
    use tempfile::TempDir;

    fn request() -> AgentRequest {
        AgentRequest::new("review").timeout(Duration::from_secs(10))
    }

    #[tokio::test]
    async fn streams_decoded_messages_and_skips_prose() {
        let tmp = TempDir::new().unwrap();
        let result = result_line(true, "");
        let agent = fake_agent(
            tmp.path(),
            &[
                "Loading session...",
                r#"{"type":"system","subtype":"init"}"#,
                r#"{"type":"text","content":"checking"}"#,
                &result,
            ],
            0,
        );

        let output = ProcessRunner::new(agent.display().to_string())
            .run(&request())
            .await
            .unwrap();

        let kinds: Vec<&str> = output.messages.iter().map(StreamMessage::kind).collect();
        assert_eq!(kinds, vec!["system", "text", "result"]);
        assert!(output.last_result().is_some());
        assert_eq!(output.summary.exit_code, Some(0));
        assert!(output.summary.stderr.contains("agent diagnostics"));
    }

    #[tokio::test]
    async fn messages_can_be_consumed_incrementally() {
        let tmp = TempDir::new().unwrap();
        let agent = fake_agent(tmp.path(), &[r#"{"type":"text","content":"one"}"#], 0);
        let runner = ProcessRunner::new(agent.display().to_string());

        let mut run = runner.spawn(&request()).unwrap();
        let first = run.next_message().await.unwrap();
        assert_eq!(first, StreamMessage::Text { content: "one".into() });
        assert!(run.next_message().await.is_none());
        run.wait().await.unwrap();
    }

    #[tokio::test]
    async fn text_mode_captures_stdout() {
        let tmp = TempDir::new().unwrap();
        let agent = fake_agent(tmp.path(), &["plain answer"], 0);

        let output = ProcessRunner::new(agent.display().to_string())
            .run(&request().output_format(OutputFormat::Text))
            .await
            .unwrap();

        assert!(output.messages.is_empty());
        assert_eq!(output.summary.text, "plain answer\n");
    }

    #[tokio::test]
    async fn review_runs_carry_marker_and_extra_env() {
        let tmp = TempDir::new().unwrap();
        let agent = script(
            tmp.path(),
            "env-agent",
            "#!/bin/sh\nprintf '{\"type\":\"text\",\"content\":\"%s/%s\"}\\n' \"$CC_SUPERVISOR_REVIEW\" \"$EXTRA\"\n",
        );

        let output = ProcessRunner::new(agent.display().to_string())
            .run(&request().review_subprocess().env("EXTRA", "yes"))
            .await
            .unwrap();

        assert_eq!(
            output.messages,
            vec![StreamMessage::Text { content: "1/yes".into() }]
        );
    }

    #[tokio::test]
    async fn large_stderr_does_not_block() {
        let tmp = TempDir::new().unwrap();
        let result = result_line(true, "");
        let body = format!(
            "#!/bin/sh\nhead -c 500000 /dev/zero | tr '\\0' 'e' >&2\nprintf '%s\\n' '{}'\n",
            result
        );
        let agent = script(tmp.path(), "noisy-agent", &body);

        let output = ProcessRunner::new(agent.display().to_string())
            .run(&request())
            .await
            .unwrap();

        assert!(output.last_result().is_some());
        assert!(output.summary.stderr.len() <= 4096);
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_execution_error() {
        let tmp = TempDir::new().unwrap();
        let agent = script(tmp.path(), "failing-agent", "#!/bin/sh\necho boom >&2\nexit 3\n");

        let err = ProcessRunner::new(agent.display().to_string())
            .run(&request())
            .await
            .unwrap_err();

        assert_eq!(err.code(), "agent_execution_failed");
        assert!(!err.is_timeout());
        assert!(err.to_string().contains("status 3"));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn deadline_kills_the_agent() {
        let tmp = TempDir::new().unwrap();
        let agent = script(tmp.path(), "slow-agent", "#!/bin/sh\nexec sleep 30\n");

        let started = Instant::now();
        let err = ProcessRunner::new(agent.display().to_string())
            .run(&request().timeout(Duration::from_millis(300)))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(err.code(), "agent_timeout");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn cancel_stops_the_agent() {
        let tmp = TempDir::new().unwrap();
        let agent = script(tmp.path(), "slow-agent", "#!/bin/sh\nexec sleep 30\n");
        let runner = ProcessRunner::new(agent.display().to_string());

        let run = runner.spawn(&request()).unwrap();
        run.cancel();
        let err = run.wait().await.unwrap_err();

        assert_eq!(err.code(), "agent_cancelled");
    }

    #[tokio::test]
    async fn cancelling_a_finished_run_leaves_the_next_run_alone() {
        let tmp = TempDir::new().unwrap();
        let result = result_line(true, "");
        let agent = fake_agent(tmp.path(), &[&result], 0);
        let runner = ProcessRunner::new(agent.display().to_string());

        let mut first = runner.spawn(&request()).unwrap();
        while first.next_message().await.is_some() {}
        first.cancel();
        drop(first);

        let output = runner.run(&request()).await.unwrap();
        assert!(output.last_result().is_some());
    }

    #[tokio::test]
    async fn shared_cancel_flag_stops_the_agent() {
        let tmp = TempDir::new().unwrap();
        let agent = script(tmp.path(), "slow-agent", "#!/bin/sh\nexec sleep 30\n");
        let (tx, rx) = tokio::sync::watch::channel(false);
        let runner = ProcessRunner::with_cancel(agent.display().to_string(), rx);

        let run = runner.spawn(&request()).unwrap();
        tx.send_replace(true);
        let started = Instant::now();
        let err = run.wait().await.unwrap_err();

        assert_eq!(err.code(), "agent_cancelled");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn unset_shared_cancel_flag_does_not_cancel() {
        let tmp = TempDir::new().unwrap();
        let result = result_line(true, "");
        let agent = fake_agent(tmp.path(), &[&result], 0);
        let (tx, rx) = tokio::sync::watch::channel(false);
        let runner = ProcessRunner::with_cancel(agent.display().to_string(), rx);
        drop(tx);

        let output = runner.run(&request()).await.unwrap();
        assert_eq!(output.summary.exit_code, Some(0));
    }

    #[tokio::test]
    async fn missing_binary_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = ProcessRunner::new(tmp.path().join("nope").display().to_string())
            .spawn(&request())
            .err()
            .unwrap();
        assert_eq!(err.code(), "agent_not_found");
    }

    #[tokio::test]
    async fn non_executable_file_fails_to_start() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("not-executable");
        std::fs::write(&path, "#!/bin/sh\n").unwrap();

        let err = ProcessRunner::new(path.display().to_string())
            .spawn(&request())
            .err()
            .unwrap();
        assert_eq!(err.code(), "agent_start_failed");
    }
}
