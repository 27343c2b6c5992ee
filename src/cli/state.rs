use std::path::Path;

use crate::config::SupervisorConfig;
use crate::error::Result;
use crate::session::IterationStore;

fn open_store(config_path: &Path) -> Result<(SupervisorConfig, IterationStore)> {
    let config = SupervisorConfig::load_from(config_path)?;
    let store = IterationStore::new(config.state_dir());
    Ok((config, store))
}

/// Print a session's stored state as JSON.
pub async fn run_show(config_path: &Path, session_id: &str) -> Result<()> {
    let (config, store) = open_store(config_path)?;
    let state = store.load(session_id)?;
    println!("{}", serde_json::to_string_pretty(&state)?);

    let (more, count) = store.should_continue(session_id, config.max_iterations)?;
    if more && state.enabled {
        eprintln!(
            "cc-supervisor: {} of {} review rounds used",
            count, config.max_iterations
        );
    } else if !state.enabled {
        eprintln!("cc-supervisor: reviews disabled for this session");
    } else {
        eprintln!("cc-supervisor: review limit reached ({})", count);
    }
    Ok(())
}

/// Zero a session's review counter.
pub async fn run_reset(config_path: &Path, session_id: &str) -> Result<()> {
    let (_, store) = open_store(config_path)?;
    store.reset(session_id)?;
    eprintln!("cc-supervisor: session {} counter reset", session_id);
    Ok(())
}

/// Re-enable reviews for a session.
pub async fn run_enable(config_path: &Path, session_id: &str) -> Result<()> {
    let (_, store) = open_store(config_path)?;
    store.set_enabled(session_id, true)?;
    eprintln!("cc-supervisor: session {} re-enabled", session_id);
    Ok(())
}

/// Disable reviews for a session.
pub async fn run_disable(config_path: &Path, session_id: &str) -> Result<()> {
    let (_, store) = open_store(config_path)?;
    store.set_enabled(session_id, false)?;
    eprintln!("cc-supervisor: session {} disabled", session_id);
    Ok(())
}
