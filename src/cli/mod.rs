pub mod config_cmd;
pub mod hook;
pub mod state;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub const CONFIG_ENV: &str = "CC_SUPERVISOR_CONFIG";

#[derive(Debug, Parser)]
#[command(
    name = "cc-supervisor",
    version,
    about = "Supervisor stop-hook loop for AI coding assistants"
)]
pub struct Cli {
    /// Path to config.yml (default: ~/.config/cc-supervisor/config.yml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// `--config`, else `$CC_SUPERVISOR_CONFIG`, else the default location.
    pub fn config_path(&self) -> PathBuf {
        if let Some(path) = &self.config {
            return path.clone();
        }
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => PathBuf::from(path),
            _ => crate::config::default_config_path(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Stop-hook entry point: reads the hook payload on stdin, prints a decision
    #[command(alias = "supervisor-hook")]
    Hook,

    /// Inspect or change a session's review state
    State {
        #[command(subcommand)]
        action: StateAction,
    },

    /// Show the effective configuration
    Config,

    /// Print the settings.json snippet that installs the Stop hook
    HookConfig,
}

#[derive(Debug, Subcommand)]
pub enum StateAction {
    /// Print the stored state
    Show {
        #[arg(long)]
        session_id: String,
    },
    /// Set the review counter back to zero
    Reset {
        #[arg(long)]
        session_id: String,
    },
    /// Turn reviews back on for a session
    Enable {
        #[arg(long)]
        session_id: String,
    },
    /// Turn reviews off for a session
    Disable {
        #[arg(long)]
        session_id: String,
    },
}
