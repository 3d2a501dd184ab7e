use crate::errors::PulseError;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to connect to '{url}': {message}")]
    ConnectFailed { url: String, message: String },

    #[error("Connection attempt timed out after {seconds}s")]
    ConnectTimeout { seconds: u64 },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Failed to encode frame: {source}")]
    Encode {
        #[from]
        source: serde_json::Error,
    },

    #[error("Channel has shut down")]
    ChannelClosed,
}

impl PulseError for ChannelError {
    fn error_code(&self) -> &'static str {
        match self {
            ChannelError::ConnectFailed { .. } => "CHANNEL_CONNECT_FAILED",
            ChannelError::ConnectTimeout { .. } => "CHANNEL_CONNECT_TIMEOUT",
            ChannelError::Transport { .. } => "CHANNEL_TRANSPORT_ERROR",
            ChannelError::Encode { .. } => "CHANNEL_ENCODE_FAILED",
            ChannelError::ChannelClosed => "CHANNEL_CLOSED",
        }
    }
}
