//! Configuration type definitions.
//!
//! Every field is optional so a project file only overrides what it sets.
//! Accessors fall back to the values in [`super::defaults`].
//!
//! ```toml
//! [channel]
//! url = "wss://notify.camerpulse.cm/ws"
//! user_id = "u-123"
//! native_notifications = true
//! max_reconnect_attempts = 8
//!
//! [refresh]
//! state_file = "/var/lib/camerpulse/refresh_config.json"
//! audit_log = "/var/log/camerpulse/refresh.jsonl"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults;

/// Configuration loaded from `config.toml` files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseConfig {
    #[serde(default)]
    pub channel: ChannelConfig,

    #[serde(default)]
    pub refresh: RefreshFileConfig,
}

/// `[channel]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Notification endpoint. Default: `ws://localhost:8080/notifications`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Mirror notifications to the desktop. Default: false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_notifications: Option<bool>,

    /// Default: true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_subscriptions: Option<bool>,

    /// Default: 30 seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_interval_secs: Option<u64>,

    /// Default: 10 seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,

    /// Default: 5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_reconnect_attempts: Option<u32>,
}

impl ChannelConfig {
    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or(defaults::DEFAULT_CHANNEL_URL)
    }

    pub fn native_notifications(&self) -> bool {
        self.native_notifications.unwrap_or(false)
    }

    pub fn replay_subscriptions(&self) -> bool {
        self.replay_subscriptions.unwrap_or(true)
    }

    pub fn ping_interval(&self) -> Duration {
        self.ping_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(crate::channel::types::DEFAULT_PING_INTERVAL)
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(crate::channel::types::DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn max_reconnect_attempts(&self) -> u32 {
        self.max_reconnect_attempts
            .unwrap_or(crate::channel::backoff::DEFAULT_MAX_RECONNECT_ATTEMPTS)
    }
}

/// `[refresh]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshFileConfig {
    /// Where interval overrides are stored.
    /// Default: `~/.camerpulse/refresh_config.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,

    /// JSON Lines audit log of refresh executions.
    /// Default: `~/.camerpulse/refresh_audit.jsonl`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_log: Option<PathBuf>,
}

impl RefreshFileConfig {
    pub fn state_file(&self) -> Option<PathBuf> {
        self.state_file
            .clone()
            .or_else(crate::refresh::persistence::default_state_file)
    }

    pub fn audit_log(&self) -> Option<PathBuf> {
        self.audit_log.clone().or_else(defaults::default_audit_log)
    }
}
