//! Configuration loading and merging logic.
//!
//! Configuration is loaded in the following order (later sources override earlier ones):
//! 1. **Hardcoded defaults** - Built-in fallback values
//! 2. **User config** - `~/.camerpulse/config.toml`
//! 3. **Project config** - `./.camerpulse/config.toml`
//! 4. **CLI arguments** - Command-line flags (highest priority)

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::defaults::{CONFIG_DIR_NAME, CONFIG_FILE_NAME};
use crate::config::types::{ChannelConfig, PulseConfig, RefreshFileConfig};
use crate::config::validation::validate_config;
use crate::errors::ConfigError;

/// Load and validate configuration from the user and project files.
///
/// Missing files are not errors. Unreadable or unparsable files are.
pub fn load_hierarchy() -> Result<PulseConfig, ConfigError> {
    let user = user_config_path();
    let project = std::env::current_dir()
        .ok()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    load_hierarchy_from(user.as_deref(), project.as_deref())
}

/// Same as [`load_hierarchy`] with explicit file locations.
pub fn load_hierarchy_from(
    user: Option<&Path>,
    project: Option<&Path>,
) -> Result<PulseConfig, ConfigError> {
    let mut config = PulseConfig::default();

    for path in [user, project].into_iter().flatten() {
        match load_config_file(path) {
            Ok(file_config) => {
                tracing::debug!(
                    event = "core.config.file_loaded",
                    path = %path.display()
                );
                config = merge_configs(config, file_config);
            }
            Err(ConfigError::IoError { source })
                if source.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }

    validate_config(&config)?;

    Ok(config)
}

/// `~/.camerpulse/config.toml`, if a home directory exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load a configuration file from the given path.
pub fn load_config_file(path: &Path) -> Result<PulseConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| ConfigError::ConfigParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Merge two configurations, with `override_config` taking precedence
/// wherever it sets a value.
pub fn merge_configs(base: PulseConfig, override_config: PulseConfig) -> PulseConfig {
    PulseConfig {
        channel: ChannelConfig {
            url: override_config.channel.url.or(base.channel.url),
            user_id: override_config.channel.user_id.or(base.channel.user_id),
            native_notifications: override_config
                .channel
                .native_notifications
                .or(base.channel.native_notifications),
            replay_subscriptions: override_config
                .channel
                .replay_subscriptions
                .or(base.channel.replay_subscriptions),
            ping_interval_secs: override_config
                .channel
                .ping_interval_secs
                .or(base.channel.ping_interval_secs),
            connect_timeout_secs: override_config
                .channel
                .connect_timeout_secs
                .or(base.channel.connect_timeout_secs),
            max_reconnect_attempts: override_config
                .channel
                .max_reconnect_attempts
                .or(base.channel.max_reconnect_attempts),
        },
        refresh: RefreshFileConfig {
            state_file: override_config.refresh.state_file.or(base.refresh.state_file),
            audit_log: override_config.refresh.audit_log.or(base.refresh.audit_log),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_files_yield_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_hierarchy_from(
            Some(&dir.path().join("user.toml")),
            Some(&dir.path().join("project.toml")),
        )
        .unwrap();
        assert_eq!(config, PulseConfig::default());
    }

    #[test]
    fn test_project_overrides_user() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user.toml");
        let project = dir.path().join("project.toml");
        fs::write(
            &user,
            r#"
[channel]
url = "wss://user.example/ws"
user_id = "u-1"
max_reconnect_attempts = 9
"#,
        )
        .unwrap();
        fs::write(
            &project,
            r#"
[channel]
url = "ws://localhost:9000/ws"

[refresh]
audit_log = "/tmp/audit.jsonl"
"#,
        )
        .unwrap();

        let config = load_hierarchy_from(Some(&user), Some(&project)).unwrap();
        assert_eq!(config.channel.url(), "ws://localhost:9000/ws");
        assert_eq!(config.channel.user_id.as_deref(), Some("u-1"));
        assert_eq!(config.channel.max_reconnect_attempts(), 9);
        assert_eq!(
            config.refresh.audit_log,
            Some(PathBuf::from("/tmp/audit.jsonl"))
        );
    }

    #[test]
    fn test_parse_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user.toml");
        fs::write(&user, "invalid toml [[[").unwrap();

        let err = load_hierarchy_from(Some(&user), None).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
    }

    #[test]
    fn test_invalid_merged_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("project.toml");
        fs::write(
            &project,
            r#"
[channel]
url = "http://not-a-socket"
"#,
        )
        .unwrap();

        let err = load_hierarchy_from(None, Some(&project)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_merge_keeps_base_when_override_unset() {
        let base: PulseConfig = toml::from_str(
            r#"
[channel]
native_notifications = true
"#,
        )
        .unwrap();
        let merged = merge_configs(base, PulseConfig::default());
        assert!(merged.channel.native_notifications());
    }
}
