use std::path::Path;

use serde_json::json;

use crate::config::SupervisorConfig;
use crate::error::{Result, SupervisorError};

/// Seconds the host waits beyond the review deadline before giving up on the hook.
const HOOK_TIMEOUT_SLACK_SECS: u64 = 30;

/// Print the effective configuration.
pub async fn run_config(config_path: &Path) -> Result<()> {
    let config = SupervisorConfig::load_from(config_path)?;

    if config_path.exists() {
        println!("Config file: {}", config_path.display());
    } else {
        println!("Config file: {} (not found, using defaults)", config_path.display());
    }
    println!("State dir:   {}", config.state_dir().display());
    println!();

    let yaml = serde_yaml::to_string(&config).map_err(|e| SupervisorError::InvalidConfig {
        reason: e.to_string(),
    })?;
    print!("{yaml}");
    Ok(())
}

/// Print the settings.json `Stop` hook entry pointing at this binary.
pub async fn run_hook_config(config_path: &Path) -> Result<()> {
    let config = SupervisorConfig::load_from(config_path)?;
    let exe = std::env::current_exe()?;

    let snippet = json!({
        "hooks": {
            "Stop": [{
                "hooks": [{
                    "type": "command",
                    "command": format!("{} hook", exe.display()),
                    "timeout": config.timeout_seconds + HOOK_TIMEOUT_SLACK_SECS,
                }]
            }]
        }
    });
    println!("{}", serde_json::to_string_pretty(&snippet)?);
    Ok(())
}
