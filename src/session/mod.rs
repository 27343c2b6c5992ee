pub mod file;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SupervisorError};

use self::file::FileLock;

/// Per-session review counter persisted as `<state dir>/<session>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationState {
    pub session_id: String,
    pub count: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_enabled() -> bool {
    true
}

impl IterationState {
    /// A fresh, never-saved record. Timestamps are stamped on first save.
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            count: 0,
            enabled: true,
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
        }
    }

    fn is_unsaved(&self) -> bool {
        self.created_at == DateTime::<Utc>::default()
    }
}

/// File-backed store of [`IterationState`] records, one file per session.
///
/// Mutations hold an advisory lock on the session's `.lock` file for the whole
/// read-modify-write, so concurrent hook processes for one session serialize.
#[derive(Debug, Clone)]
pub struct IterationStore {
    dir: PathBuf,
}

impl IterationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the state file for a session.
    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file::file_stem(session_id)))
    }

    /// Load a session's state, or a fresh zero-count record if none exists.
    pub fn load(&self, session_id: &str) -> Result<IterationState> {
        let path = self.path_for(session_id);
        if !path.exists() {
            return Ok(IterationState::new(session_id));
        }
        let contents =
            std::fs::read_to_string(&path).map_err(|e| self.state_err(session_id, e))?;
        if contents.trim().is_empty() {
            return Ok(IterationState::new(session_id));
        }
        serde_json::from_str(&contents).map_err(|e| self.state_err(session_id, e))
    }

    /// Persist a record, refreshing `updated_at` and stamping `created_at` once.
    pub fn save(&self, state: &mut IterationState) -> Result<()> {
        let now = Utc::now();
        if state.is_unsaved() {
            state.created_at = now;
        }
        state.updated_at = now;

        let json = serde_json::to_string_pretty(state)?;
        file::write_atomic(&self.path_for(&state.session_id), json.as_bytes())
            .map_err(|e| self.state_err(&state.session_id, e))
    }

    /// Bump the session's counter by one and return the new count.
    pub fn increment(&self, session_id: &str) -> Result<u32> {
        let state = self.update(session_id, |state| state.count += 1)?;
        tracing::debug!(session_id, count = state.count, "iteration count incremented");
        Ok(state.count)
    }

    /// Whether another review round is allowed: `count < max`. Read-only.
    pub fn should_continue(&self, session_id: &str, max: u32) -> Result<(bool, u32)> {
        let state = self.load(session_id)?;
        Ok((state.count < max, state.count))
    }

    /// Turn supervision on or off for one session.
    pub fn set_enabled(&self, session_id: &str, enabled: bool) -> Result<IterationState> {
        self.update(session_id, |state| state.enabled = enabled)
    }

    /// Zero the counter, keeping `created_at` and the enabled flag.
    pub fn reset(&self, session_id: &str) -> Result<IterationState> {
        self.update(session_id, |state| state.count = 0)
    }

    fn update<F>(&self, session_id: &str, mutate: F) -> Result<IterationState>
    where
        F: FnOnce(&mut IterationState),
    {
        let _lock = FileLock::acquire(&self.path_for(session_id))
            .map_err(|e| self.state_err(session_id, e))?;
        let mut state = self.load(session_id)?;
        mutate(&mut state);
        self.save(&mut state)?;
        Ok(state)
    }

    fn state_err(&self, session_id: &str, e: impl std::fmt::Display) -> SupervisorError {
        SupervisorError::State {
            session_id: session_id.to_string(),
            reason: e.to_string(),
        }
    }
}
