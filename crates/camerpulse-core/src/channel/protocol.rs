use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::ChannelError;

/// Topic every connection joins after it opens.
pub const DEFAULT_CHANNEL: &str = "public_feed";

/// Kind of a pushed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BidSubmitted,
    TenderUpdated,
    DeadlineWarning,
    AwardAnnounced,
    SystemAlert,
}

impl NotificationKind {
    /// Human readable label, used when the server sends no title.
    pub fn label(&self) -> &'static str {
        match self {
            NotificationKind::BidSubmitted => "New bid submitted",
            NotificationKind::TenderUpdated => "Tender updated",
            NotificationKind::DeadlineWarning => "Deadline approaching",
            NotificationKind::AwardAnnounced => "Award announced",
            NotificationKind::SystemAlert => "System alert",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationKind::BidSubmitted => "bid_submitted",
            NotificationKind::TenderUpdated => "tender_updated",
            NotificationKind::DeadlineWarning => "deadline_warning",
            NotificationKind::AwardAnnounced => "award_announced",
            NotificationKind::SystemAlert => "system_alert",
        };
        f.write_str(s)
    }
}

/// A notification pushed by the server. Never mutated after receipt.
///
/// `received_at` is stamped at deserialization time unless the frame
/// already carries one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    #[serde(rename = "resourceId", default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Map<String, serde_json::Value>,
    #[serde(rename = "receivedAt", default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

/// Client -> server control frames.
///
/// Each variant maps to a JSON text frame with `"type"` as the tag field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    Authenticate {
        #[serde(rename = "userId")]
        user_id: String,
    },
    SubscribeChannel {
        channel: String,
    },
    UnsubscribeChannel {
        channel: String,
    },
    SubscribeTender {
        #[serde(rename = "tenderId")]
        tender_id: String,
    },
    UnsubscribeTender {
        #[serde(rename = "tenderId")]
        tender_id: String,
    },
    Ping,
}

impl OutboundFrame {
    pub fn encode(&self) -> Result<String, ChannelError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Server -> client frames.
///
/// The three notification variants carry the same payload and are handled
/// identically. Anything with an unrecognized `type` lands in `Unknown`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    ConnectionEstablished {
        #[serde(rename = "connectionId")]
        connection_id: String,
        #[serde(default)]
        timestamp: Option<serde_json::Value>,
    },
    Notification {
        event: NotificationEvent,
        #[serde(default)]
        timestamp: Option<serde_json::Value>,
    },
    TenderUpdate {
        event: NotificationEvent,
        #[serde(default)]
        timestamp: Option<serde_json::Value>,
    },
    UserNotification {
        event: NotificationEvent,
        #[serde(default)]
        timestamp: Option<serde_json::Value>,
    },
    Subscribed {
        #[serde(default)]
        timestamp: Option<serde_json::Value>,
    },
    Authenticated {
        #[serde(default)]
        timestamp: Option<serde_json::Value>,
    },
    Pong {
        #[serde(default)]
        timestamp: Option<serde_json::Value>,
    },
    #[serde(other)]
    Unknown,
}

impl InboundFrame {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The embedded event, for the notification-bearing variants.
    pub fn into_event(self) -> Option<NotificationEvent> {
        match self {
            InboundFrame::Notification { event, .. }
            | InboundFrame::TenderUpdate { event, .. }
            | InboundFrame::UserNotification { event, .. } => Some(event),
            _ => None,
        }
    }
}

/// A caller-issued subscription: either a named channel or a single tender.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subscription {
    Channel(String),
    Tender(String),
}

impl Subscription {
    pub fn subscribe_frame(&self) -> OutboundFrame {
        match self {
            Subscription::Channel(channel) => OutboundFrame::SubscribeChannel {
                channel: channel.clone(),
            },
            Subscription::Tender(tender_id) => OutboundFrame::SubscribeTender {
                tender_id: tender_id.clone(),
            },
        }
    }

    pub fn unsubscribe_frame(&self) -> OutboundFrame {
        match self {
            Subscription::Channel(channel) => OutboundFrame::UnsubscribeChannel {
                channel: channel.clone(),
            },
            Subscription::Tender(tender_id) => OutboundFrame::UnsubscribeTender {
                tender_id: tender_id.clone(),
            },
        }
    }
}
