use crate::channel::types::MAX_PING_INTERVAL;
use crate::config::types::PulseConfig;
use crate::errors::ConfigError;

/// URL schemes the channel can dial.
pub const VALID_URL_SCHEMES: &[&str] = &["ws://", "wss://"];

pub fn validate_config(config: &PulseConfig) -> Result<(), ConfigError> {
    let url = config.channel.url();
    if !VALID_URL_SCHEMES
        .iter()
        .any(|scheme| url.starts_with(scheme))
    {
        return Err(ConfigError::InvalidConfiguration {
            message: format!(
                "Invalid channel url '{}'. Expected a ws:// or wss:// URL",
                url
            ),
        });
    }

    if config.channel.ping_interval_secs == Some(0) {
        return Err(ConfigError::InvalidConfiguration {
            message: "channel.ping_interval_secs must be greater than zero".to_string(),
        });
    }

    if let Some(secs) = config.channel.ping_interval_secs
        && secs > MAX_PING_INTERVAL.as_secs()
    {
        return Err(ConfigError::InvalidConfiguration {
            message: format!(
                "channel.ping_interval_secs must be at most {} (got {})",
                MAX_PING_INTERVAL.as_secs(),
                secs
            ),
        });
    }

    if config.channel.connect_timeout_secs == Some(0) {
        return Err(ConfigError::InvalidConfiguration {
            message: "channel.connect_timeout_secs must be greater than zero".to_string(),
        });
    }

    if let Some(user_id) = &config.channel.user_id
        && user_id.trim().is_empty()
    {
        return Err(ConfigError::InvalidConfiguration {
            message: "channel.user_id must not be empty".to_string(),
        });
    }

    Ok(())
}
