//! camerpulse-core: realtime plumbing for the CamerPulse civic platform
//!
//! This library keeps the notification socket alive and schedules the
//! periodic dashboard refreshes. It is used by the CLI and by any embedding
//! UI layer.
//!
//! # Main Entry Points
//!
//! - [`channel`] - Realtime notification channel with reconnect backoff
//! - [`refresh`] - Multi-timer refresh orchestration with telemetry
//! - [`config`] - Configuration management
//! - [`notify`] - Best-effort desktop notifications

pub mod channel;
pub mod config;
pub mod errors;
pub mod events;
pub mod logging;
pub mod notify;
pub mod refresh;

// Re-export commonly used types at crate root for convenience
pub use channel::{
    ChannelError, ChannelOptions, ChannelSignal, ChannelStatus, ConnectionState,
    NotificationEvent, NotificationKind, RealtimeChannel, Subscription, Toast,
    WebSocketConnector,
};
pub use config::PulseConfig;
pub use errors::{ConfigError, PulseError, PulseResult};
pub use refresh::{
    AuditLogSink, NoopSink, RefreshError, RefreshHandler, RefreshOrchestrator, RefreshSettings,
    RefreshSnapshot, TaskTelemetry, TelemetrySink, handler_fn,
};

// Re-export logging initialization
pub use logging::init_logging;
