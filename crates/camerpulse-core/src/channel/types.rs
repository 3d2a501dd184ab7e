use std::time::Duration;

use super::backoff::ReconnectPolicy;
use super::buffer::EVENT_BUFFER_CAPACITY;
use super::protocol::{NotificationEvent, NotificationKind};

/// How long a toast stays on screen for ordinary notifications.
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_secs(5);

/// Deadline warnings stay on screen longer than everything else.
pub const DEADLINE_TOAST_DURATION: Duration = Duration::from_secs(10);

/// Heartbeat interval while connected.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

/// Longest heartbeat interval the channel will schedule.
pub const MAX_PING_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Upper bound on a single connect attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// Point-in-time view of the channel, published on every change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelStatus {
    pub state: ConnectionState,
    /// Issued by the server in `connection_established`; cleared on close.
    pub connection_id: Option<String>,
    pub authenticated: bool,
    pub reconnect_attempt: u32,
    /// Set once automatic reconnection has given up. Cleared by the next
    /// successful open.
    pub connection_lost: bool,
}

impl ChannelStatus {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// On-screen toast derived from a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub duration: Duration,
}

/// Toast duration for a notification kind.
pub fn toast_duration(kind: NotificationKind) -> Duration {
    match kind {
        NotificationKind::DeadlineWarning => DEADLINE_TOAST_DURATION,
        _ => DEFAULT_TOAST_DURATION,
    }
}

impl Toast {
    pub fn for_event(event: &NotificationEvent) -> Self {
        Self {
            title: crate::notify::notification_title(event),
            description: crate::notify::notification_message(event),
            duration: toast_duration(event.kind),
        }
    }
}

/// Signals the channel emits to the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelSignal {
    StateChanged(ConnectionState),
    Notification {
        event: NotificationEvent,
        toast: Toast,
    },
    /// Automatic reconnection has given up. Only a manual `connect()` resumes.
    ConnectionLost { attempts: u32 },
}

/// Runtime options for a [`RealtimeChannel`](super::RealtimeChannel).
#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// Identity sent in the `authenticate` frame after every open.
    pub user_id: Option<String>,
    /// Mirror notifications to the OS notification center.
    pub native_notifications: bool,
    /// Re-send caller subscriptions after a reconnect.
    pub replay_subscriptions: bool,
    pub ping_interval: Duration,
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
    pub buffer_capacity: usize,
    /// Capacity of the broadcast channel behind `signals()`.
    pub signal_capacity: usize,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            user_id: None,
            native_notifications: false,
            replay_subscriptions: true,
            ping_interval: DEFAULT_PING_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect: ReconnectPolicy::default(),
            buffer_capacity: EVENT_BUFFER_CAPACITY,
            signal_capacity: 256,
        }
    }
}
