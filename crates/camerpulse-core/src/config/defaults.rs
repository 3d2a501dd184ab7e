//! Default values for configuration fields.

use std::path::PathBuf;

pub const DEFAULT_CHANNEL_URL: &str = "ws://localhost:8080/notifications";

/// Directory holding user config and state: `~/.camerpulse`.
pub const CONFIG_DIR_NAME: &str = ".camerpulse";

pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const AUDIT_LOG_FILE_NAME: &str = "refresh_audit.jsonl";

pub fn camerpulse_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME))
}

pub fn default_audit_log() -> Option<PathBuf> {
    camerpulse_dir().map(|dir| dir.join(AUDIT_LOG_FILE_NAME))
}
