pub mod supervisor;

pub use supervisor::*;

use std::path::PathBuf;

/// Environment variable overriding the config home directory.
pub const HOME_ENV: &str = "CC_SUPERVISOR_HOME";

/// Returns the global config directory path: `$CC_SUPERVISOR_HOME` or
/// `~/.config/cc-supervisor/`.
pub fn dirs_global() -> PathBuf {
    if let Ok(dir) = std::env::var(HOME_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join(".config").join("cc-supervisor")
}

/// Default location of `config.yml`.
pub fn default_config_path() -> PathBuf {
    dirs_global().join("config.yml")
}
