//! # Realtime notification channel
//!
//! Keeps one logical connection to the CamerPulse notification server alive,
//! turns inbound frames into typed [`NotificationEvent`]s and reconnects with
//! exponential backoff.
//!
//! ## Connection lifecycle
//!
//! ```text
//! Disconnected --connect()--> Connecting --open--> Connected
//!      ^                          |                    |
//!      |                       failure               close
//!      |                          v                    v
//!      +------ backoff 1s, 2s, 4s, 8s, 16s <-----------+
//!                                 |
//!                          budget exhausted -> ConnectionLost (terminal)
//! ```
//!
//! Every successful open resets the reconnect counter, authenticates (when a
//! user id is configured), joins `public_feed` and replays the caller's
//! earlier subscriptions.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use camerpulse_core::channel::{ChannelOptions, RealtimeChannel, Subscription, WebSocketConnector};
//!
//! # async fn example() {
//! let channel = RealtimeChannel::spawn(
//!     WebSocketConnector::new("ws://localhost:8080/notifications"),
//!     ChannelOptions::default(),
//! );
//! let mut signals = channel.signals();
//! channel.connect();
//! channel.subscribe(Subscription::Tender("T-2041".to_string()));
//! while let Ok(signal) = signals.recv().await {
//!     println!("{:?}", signal);
//! }
//! # }
//! ```

pub mod backoff;
pub mod buffer;
pub mod client;
pub mod errors;
pub mod protocol;
pub mod transport;
pub mod types;

pub use backoff::ReconnectPolicy;
pub use buffer::EventBuffer;
pub use client::RealtimeChannel;
pub use errors::ChannelError;
pub use protocol::{
    DEFAULT_CHANNEL, InboundFrame, NotificationEvent, NotificationKind, OutboundFrame,
    Subscription,
};
pub use transport::{Connector, Transport, WebSocketConnector};
pub use types::{
    ChannelOptions, ChannelSignal, ChannelStatus, ConnectionState, Toast, toast_duration,
};
