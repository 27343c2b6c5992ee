pub mod input;
pub mod prompt;

pub use input::HookInvocation;

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::AsyncRead;
use tokio::sync::watch;

use crate::config::SupervisorConfig;
use crate::decision::{HookDecision, SupervisorResult};
use crate::error::Result;
use crate::runner::{AgentRequest, OutputFormat, ProcessRunner};
use crate::session::{IterationState, IterationStore};
use crate::stream::{ResultMessage, StreamMessage};

/// How one hook invocation was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// Invoked from inside a review subprocess; never reviews itself.
    SelfCall,
    /// Supervisor turned off in config.
    Disabled,
    /// Supervisor turned off for this session.
    SessionDisabled,
    /// Iteration budget used up.
    LimitReached { count: u32 },
    /// Reviewer judged the task complete.
    Completed { iteration: u32 },
    /// Reviewer wants more work.
    Continue { iteration: u32, reason: String },
    /// Review finished without a usable verdict.
    NoVerdict { iteration: u32 },
}

impl HookOutcome {
    pub fn decision(&self) -> HookDecision {
        match self {
            HookOutcome::Continue { reason, .. } => HookDecision::block(reason.clone()),
            _ => HookDecision::allow(),
        }
    }
}

/// Answers the Stop hook: may this agent session stop now?
pub struct HookController {
    config_path: PathBuf,
    review_subprocess: bool,
    cancel: watch::Sender<bool>,
    reviewing: AtomicBool,
}

impl HookController {
    /// `review_subprocess` must be true when this process was itself spawned
    /// as a review run (see [`crate::runner::is_review_subprocess`]).
    pub fn new(config_path: impl Into<PathBuf>, review_subprocess: bool) -> Self {
        Self {
            config_path: config_path.into(),
            review_subprocess,
            cancel: watch::channel(false).0,
            reviewing: AtomicBool::new(false),
        }
    }

    /// Kill the review run, now or as soon as it starts. The invocation then
    /// fails with `AgentCancelled`.
    pub fn cancel_review(&self) {
        self.cancel.send_replace(true);
    }

    /// True while a review subprocess is being supervised.
    pub fn review_active(&self) -> bool {
        self.reviewing.load(Ordering::SeqCst)
    }

    /// Run one invocation: read the hook payload from `input` and write exactly
    /// one decision line to `out`.
    ///
    /// Errors (bad config, bad input, failed review run) write nothing; the
    /// host then falls back to letting the session stop.
    pub async fn run<R, W>(&self, input: R, out: &mut W) -> Result<HookOutcome>
    where
        R: AsyncRead + Unpin,
        W: Write,
    {
        if self.review_subprocess {
            tracing::debug!("inside review subprocess, allowing stop");
            HookDecision::allow().emit(out)?;
            return Ok(HookOutcome::SelfCall);
        }

        let config = SupervisorConfig::load_from(&self.config_path)?;
        let invocation = HookInvocation::read_from(input).await?;
        tracing::debug!(
            session_id = %invocation.session_id,
            stop_hook_active = invocation.stop_hook_active,
            "stop hook invoked"
        );

        let outcome = self.evaluate(&config, &invocation).await?;
        outcome.decision().emit(out)?;
        Ok(outcome)
    }

    async fn evaluate(
        &self,
        config: &SupervisorConfig,
        invocation: &HookInvocation,
    ) -> Result<HookOutcome> {
        let session_id = invocation.session_id.as_str();

        if !config.enabled {
            tracing::debug!("supervisor disabled in config");
            return Ok(HookOutcome::Disabled);
        }

        let store = IterationStore::new(config.state_dir());

        let state = store.load(session_id).unwrap_or_else(|e| {
            tracing::warn!(session_id, error = %e, "cannot read iteration state, assuming fresh");
            IterationState::new(session_id)
        });

        if !state.enabled {
            tracing::info!(session_id, "supervisor disabled for session");
            return Ok(HookOutcome::SessionDisabled);
        }

        if state.count >= config.max_iterations {
            tracing::info!(
                session_id,
                count = state.count,
                max = config.max_iterations,
                "iteration limit reached, allowing stop"
            );
            return Ok(HookOutcome::LimitReached { count: state.count });
        }

        let base_prompt = config.review_prompt()?;

        let iteration = store.increment(session_id).unwrap_or_else(|e| {
            tracing::warn!(session_id, error = %e, "cannot persist iteration count");
            state.count + 1
        });

        tracing::info!(
            session_id,
            round = iteration,
            max = config.max_iterations,
            "reviewing session"
        );

        let mut request = AgentRequest::new(prompt::review_prompt(
            &base_prompt,
            iteration,
            config.max_iterations,
        ))
        .resume(session_id)
        .fork_session()
        .output_format(OutputFormat::StreamJson)
        .json_schema(prompt::verdict_schema())
        .review_subprocess()
        .timeout(config.timeout());
        if let Some(cwd) = &invocation.cwd {
            request = request.cwd(cwd);
        }

        let last_result = self.run_review(config, &request).await?;

        let verdict = match last_result {
            None => {
                tracing::warn!(session_id, "review produced no result, allowing stop");
                return Ok(HookOutcome::NoVerdict { iteration });
            }
            Some(message) => SupervisorResult::from_result(&message),
        };

        match verdict {
            Ok(result) if result.completed => {
                tracing::info!(session_id, iteration, "reviewer: task complete");
                Ok(HookOutcome::Completed { iteration })
            }
            Ok(result) => {
                let reason = HookDecision::from(&result).reason;
                tracing::info!(session_id, iteration, %reason, "reviewer: continue");
                Ok(HookOutcome::Continue { iteration, reason })
            }
            Err(e) => {
                tracing::warn!(session_id, error = %e, "unusable review result, allowing stop");
                Ok(HookOutcome::NoVerdict { iteration })
            }
        }
    }

    /// Run the review subprocess, returning its last `result` record.
    async fn run_review(
        &self,
        config: &SupervisorConfig,
        request: &AgentRequest,
    ) -> Result<Option<ResultMessage>> {
        let runner = ProcessRunner::with_cancel(config.agent_command.clone(), self.cancel.subscribe());
        self.reviewing.store(true, Ordering::SeqCst);
        let result = Self::supervise_review(&runner, request).await;
        self.reviewing.store(false, Ordering::SeqCst);
        result
    }

    async fn supervise_review(
        runner: &ProcessRunner,
        request: &AgentRequest,
    ) -> Result<Option<ResultMessage>> {
        let mut run = runner.spawn(request)?;

        let mut last_result = None;
        while let Some(message) = run.next_message().await {
            match message {
                StreamMessage::Result(result) => last_result = Some(result),
                StreamMessage::ToolUse { name, .. } => {
                    tracing::debug!(tool = %name, "reviewer tool call");
                }
                other => tracing::trace!(kind = other.kind(), "review message"),
            }
        }

        run.wait().await?;
        Ok(last_result)
    }
}
