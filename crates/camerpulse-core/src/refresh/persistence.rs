use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::errors::RefreshError;
use super::types::RefreshConfig;

/// File name of the persisted interval overrides.
pub const STATE_FILE_NAME: &str = "refresh_config.json";

/// Default location: `~/.camerpulse/refresh_config.json`.
pub fn default_state_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".camerpulse").join(STATE_FILE_NAME))
}

/// Load the stored config and merge it over `defaults`.
///
/// Missing file: defaults. Unreadable or corrupt file: defaults, with the
/// problem logged. Unknown task names and zero intervals are dropped.
pub fn load_config(path: Option<&Path>, defaults: &BTreeMap<String, u64>) -> RefreshConfig {
    let mut config = RefreshConfig::new(defaults.clone());

    let Some(path) = path else {
        return config;
    };
    if !path.exists() {
        return config;
    }

    let stored: BTreeMap<String, u64> = match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(
                    event = "core.refresh.config_parse_failed",
                    path = %path.display(),
                    error = %e,
                    "Stored refresh config is corrupted - using defaults"
                );
                return config;
            }
        },
        Err(e) => {
            tracing::warn!(
                event = "core.refresh.config_read_failed",
                path = %path.display(),
                error = %e
            );
            return config;
        }
    };

    let (_, rejected) = config.merge_known(&stored);
    for rejection in rejected {
        tracing::debug!(
            event = "core.refresh.config_key_ignored",
            path = %path.display(),
            reason = %rejection
        );
    }

    config
}

/// Write the merged config to `path`, creating parent directories.
pub fn save_config(path: &Path, config: &RefreshConfig) -> Result<(), RefreshError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| RefreshError::SaveFailed {
            message: format!("Failed to create directory ({}): {}", parent.display(), e),
        })?;
    }

    let json = serde_json::to_string_pretty(config).map_err(|e| RefreshError::SaveFailed {
        message: format!("Failed to serialize refresh config: {}", e),
    })?;

    std::fs::write(path, json).map_err(|e| RefreshError::SaveFailed {
        message: format!("Failed to write refresh config ({}): {}", path.display(), e),
    })?;

    tracing::debug!(
        event = "core.refresh.config_saved",
        path = %path.display(),
        count = config.intervals().len()
    );

    Ok(())
}

/// Remove stored overrides. A missing file is not an error.
pub fn clear_config(path: &Path) -> Result<bool, RefreshError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(RefreshError::SaveFailed {
            message: format!("Failed to remove refresh config ({}): {}", path.display(), e),
        }),
    }
}
