//! # Configuration System
//!
//! Hierarchical TOML configuration for CamerPulse.
//!
//! ## Configuration Hierarchy
//!
//! Configuration is loaded in the following order (later sources override earlier ones):
//! 1. **Hardcoded defaults** - Built-in fallback values
//! 2. **User config** - `~/.camerpulse/config.toml`
//! 3. **Project config** - `./.camerpulse/config.toml`
//! 4. **CLI arguments** - Command-line flags (highest priority)
//!
//! ## Loading Configuration
//!
//! ```rust,no_run
//! use camerpulse_core::config::PulseConfig;
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PulseConfig::load_hierarchy()?;
//!     let options = config.channel_options();
//!     println!("{} -> {:?}", config.channel.url(), options.reconnect);
//!     Ok(())
//! }
//! ```

pub mod defaults;
pub mod loading;
pub mod types;
pub mod validation;

pub use types::{ChannelConfig, PulseConfig, RefreshFileConfig};
pub use validation::{VALID_URL_SCHEMES, validate_config};

use crate::channel::{ChannelOptions, ReconnectPolicy};
use crate::errors::ConfigError;
use crate::refresh::RefreshSettings;

impl PulseConfig {
    /// See [`loading::load_hierarchy`].
    pub fn load_hierarchy() -> Result<Self, ConfigError> {
        loading::load_hierarchy()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_config(self)
    }

    /// Channel options derived from the `[channel]` section.
    pub fn channel_options(&self) -> ChannelOptions {
        let defaults = ChannelOptions::default();
        ChannelOptions {
            user_id: self.channel.user_id.clone(),
            native_notifications: self.channel.native_notifications(),
            replay_subscriptions: self.channel.replay_subscriptions(),
            ping_interval: self.channel.ping_interval(),
            connect_timeout: self.channel.connect_timeout(),
            reconnect: ReconnectPolicy {
                max_attempts: self.channel.max_reconnect_attempts(),
                ..defaults.reconnect
            },
            ..defaults
        }
    }

    /// The CamerPulse task table persisting to the configured state file.
    pub fn refresh_settings(&self) -> RefreshSettings {
        RefreshSettings::camerpulse(self.refresh.state_file())
    }
}
