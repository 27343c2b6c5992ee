use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;

use super::{AgentRequest, OutputFormat};
use crate::error::{Result, SupervisorError};
use crate::stream::{decode_line, StreamMessage};

/// Diagnostic output kept for error reports (tail, in bytes).
const STDERR_TAIL_BYTES: usize = 4096;

/// Spawns the agent CLI and supervises it until exit, deadline, or cancel.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
    cancel: watch::Receiver<bool>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<String>) -> Self {
        // Sender dropped right away: this runner is only cancelled per run.
        let (_, cancel) = watch::channel(false);
        Self {
            program: program.into(),
            cancel,
        }
    }

    /// Runner whose runs are also cancelled once `cancel` turns true. The
    /// flag is level-triggered: every run spawned after it is set is cancelled
    /// too.
    pub fn with_cancel(program: impl Into<String>, cancel: watch::Receiver<bool>) -> Self {
        Self {
            program: program.into(),
            cancel,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Start the agent. Output is drained in the background; read messages
    /// with [`AgentRun::next_message`] and the exit status with [`AgentRun::wait`].
    pub fn spawn(&self, request: &AgentRequest) -> Result<AgentRun> {
        let args = request.build_args();
        tracing::debug!(program = %self.program, ?args, "spawning agent");

        let mut cmd = Command::new(&self.program);
        cmd.args(&args)
            .envs(request.child_env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &request.cwd {
            if dir.is_dir() {
                cmd.current_dir(dir);
            } else {
                tracing::warn!(cwd = %dir.display(), "working directory missing, using current");
            }
        }

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SupervisorError::AgentNotFound {
                    program: self.program.clone(),
                }
            } else {
                SupervisorError::AgentStart {
                    program: self.program.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let stdout = child.stdout.take().ok_or_else(|| SupervisorError::AgentStart {
            program: self.program.clone(),
            reason: "stdout not captured".into(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| SupervisorError::AgentStart {
            program: self.program.clone(),
            reason: "stderr not captured".into(),
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let stdout_task = tokio::spawn(drain_stdout(stdout, request.output_format, tx));
        let stderr_task = tokio::spawn(drain_stderr(stderr));

        let run_cancel = Arc::new(Notify::new());
        let completion = tokio::spawn(supervise(
            child,
            stdout_task,
            stderr_task,
            request.timeout,
            run_cancel.clone(),
            self.cancel.clone(),
        ));

        Ok(AgentRun {
            messages: rx,
            cancel: run_cancel,
            completion,
        })
    }

    /// Spawn and run to completion, collecting every decoded message.
    pub async fn run(&self, request: &AgentRequest) -> Result<AgentOutput> {
        self.spawn(request)?.collect().await
    }
}

/// A live agent subprocess.
pub struct AgentRun {
    messages: mpsc::UnboundedReceiver<StreamMessage>,
    cancel: Arc<Notify>,
    completion: JoinHandle<Result<RunSummary>>,
}

impl AgentRun {
    /// Next decoded protocol message. `None` once stdout is closed (or the run
    /// was killed). Single pass: messages are not replayed.
    pub async fn next_message(&mut self) -> Option<StreamMessage> {
        self.messages.recv().await
    }

    /// Kill this run; [`AgentRun::wait`] then reports `AgentCancelled`.
    /// Has no effect on other runs of the same runner.
    pub fn cancel(&self) {
        self.cancel.notify_one();
    }

    /// Wait for both output drains and the exit status.
    pub async fn wait(self) -> Result<RunSummary> {
        match self.completion.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(SupervisorError::AgentCancelled),
            Err(e) => Err(SupervisorError::Io(std::io::Error::other(e.to_string()))),
        }
    }

    /// Read every remaining message, then wait for exit.
    pub async fn collect(mut self) -> Result<AgentOutput> {
        let mut messages = Vec::new();
        while let Some(message) = self.next_message().await {
            messages.push(message);
        }
        let summary = self.wait().await?;
        Ok(AgentOutput { messages, summary })
    }
}

/// How a finished run ended.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub exit_code: Option<i32>,
    /// Tail of the diagnostic stream.
    pub stderr: String,
    /// Captured stdout in [`OutputFormat::Text`] mode; empty otherwise.
    pub text: String,
    pub elapsed: Duration,
}

/// A collected run: all messages plus its summary.
#[derive(Debug, Clone)]
pub struct AgentOutput {
    pub messages: Vec<StreamMessage>,
    pub summary: RunSummary,
}

impl AgentOutput {
    /// The last `result` record, if any.
    pub fn last_result(&self) -> Option<&crate::stream::ResultMessage> {
        self.messages.iter().rev().find_map(StreamMessage::as_result)
    }
}

enum Outcome {
    Finished(std::io::Result<(ExitStatus, String, String)>),
    TimedOut,
    Cancelled,
}

async fn supervise(
    mut child: Child,
    stdout_task: JoinHandle<std::io::Result<String>>,
    stderr_task: JoinHandle<String>,
    timeout: Duration,
    run_cancel: Arc<Notify>,
    shared_cancel: watch::Receiver<bool>,
) -> Result<RunSummary> {
    let started = Instant::now();
    let stdout_abort = stdout_task.abort_handle();
    let stderr_abort = stderr_task.abort_handle();

    // Both streams must reach EOF before the exit status counts.
    let finished = async {
        let (stdout, stderr) = tokio::join!(stdout_task, stderr_task);
        let text = stdout.map_err(join_to_io)??;
        let stderr = stderr.map_err(join_to_io)?;
        let status = child.wait().await?;
        Ok::<_, std::io::Error>((status, text, stderr))
    };

    let outcome = tokio::select! {
        res = tokio::time::timeout(timeout, finished) => match res {
            Ok(done) => Outcome::Finished(done),
            Err(_) => Outcome::TimedOut,
        },
        _ = run_cancel.notified() => Outcome::Cancelled,
        _ = cancelled(shared_cancel) => Outcome::Cancelled,
    };

    let (status, text, stderr) = match outcome {
        Outcome::Finished(done) => done?,
        Outcome::TimedOut => {
            stdout_abort.abort();
            stderr_abort.abort();
            kill(&mut child).await;
            tracing::warn!(timeout_secs = timeout.as_secs(), "agent run timed out");
            return Err(SupervisorError::AgentTimeout {
                timeout_secs: timeout.as_secs(),
            });
        }
        Outcome::Cancelled => {
            stdout_abort.abort();
            stderr_abort.abort();
            kill(&mut child).await;
            tracing::warn!("agent run cancelled");
            return Err(SupervisorError::AgentCancelled);
        }
    };

    let elapsed = started.elapsed();
    if !status.success() {
        return Err(SupervisorError::AgentExecution {
            code: status.code(),
            stderr: stderr.trim().to_string(),
        });
    }

    tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "agent run finished");
    Ok(RunSummary {
        exit_code: status.code(),
        stderr,
        text,
        elapsed,
    })
}

/// Resolves once the shared flag is true. Never resolves if its sender is
/// gone while the flag is still false.
async fn cancelled(mut signal: watch::Receiver<bool>) {
    let closed = signal.wait_for(|cancelled| *cancelled).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

async fn kill(child: &mut Child) {
    if let Err(e) = child.kill().await {
        tracing::debug!(error = %e, "failed to kill agent process");
    }
}

fn join_to_io(e: tokio::task::JoinError) -> std::io::Error {
    std::io::Error::other(e.to_string())
}

/// Drain the primary stream. Stream mode forwards decoded messages (prose lines
/// are dropped); text mode returns the output verbatim.
async fn drain_stdout<R>(
    stdout: R,
    format: OutputFormat,
    tx: mpsc::UnboundedSender<StreamMessage>,
) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    let mut text = String::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        match format {
            OutputFormat::StreamJson => {
                if let Some(message) = decode_line(&line) {
                    // Receiver may be gone; keep draining so the child never blocks.
                    let _ = tx.send(message);
                }
            }
            OutputFormat::Text => text.push_str(&line),
        }
    }
    Ok(text)
}

/// Drain the diagnostic stream, forwarding lines to the log and keeping a tail.
async fn drain_stderr<R>(stderr: R) -> String
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    let mut tail = String::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                tracing::debug!(target: "cc_supervisor::agent", "{}", line.trim_end());
                tail.push_str(&line);
                truncate_front(&mut tail, STDERR_TAIL_BYTES);
            }
            Err(e) => {
                tracing::debug!(error = %e, "stderr read failed");
                break;
            }
        }
    }
    tail
}

/// Drop leading bytes so `s` is at most `max` bytes, on a char boundary.
fn truncate_front(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut cut = s.len() - max;
    while !s.is_char_boundary(cut) {
        cut += 1;
    }
    s.drain(..cut);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_front_keeps_tail() {
        let mut s = "abcdefghij".to_string();
        truncate_front(&mut s, 4);
        assert_eq!(s, "ghij");
    }

    #[test]
    fn truncate_front_respects_char_boundaries() {
        let mut s = "ééééé".to_string(); // 10 bytes
        truncate_front(&mut s, 5);
        assert_eq!(s, "éé");
    }

    #[tokio::test]
    async fn drain_stdout_skips_prose_lines() {
        let input: &[u8] = b"starting up\n{\"type\":\"text\",\"content\":\"hi\"}\n\nnot json\n";
        let (tx, mut rx) = mpsc::unbounded_channel();
        let text = drain_stdout(input, OutputFormat::StreamJson, tx)
            .await
            .unwrap();
        assert!(text.is_empty());
        assert_eq!(
            rx.recv().await,
            Some(StreamMessage::Text {
                content: "hi".into()
            })
        );
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn drain_stdout_text_mode_captures_verbatim() {
        let input: &[u8] = b"line one\n{\"type\":\"text\",\"content\":\"x\"}\n";
        let (tx, mut rx) = mpsc::unbounded_channel();
        let text = drain_stdout(input, OutputFormat::Text, tx).await.unwrap();
        assert_eq!(text, "line one\n{\"type\":\"text\",\"content\":\"x\"}\n");
        assert_eq!(rx.recv().await, None);
    }
}
