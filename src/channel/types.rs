//! Wire events exchanged with the notification server.

use crate::error::{PanelError, Result};
use crate::types::{Notification, OutboundMessage};
use serde::{Deserialize, Serialize};

/// Events the server pushes to the panel.
///
/// JSON form is `{"event": "<name>", "data": <payload>}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ChannelEvent {
    /// Transport is up. Carries nothing for the store.
    #[serde(rename = "connect")]
    ConnectionEstablished,

    /// Past notifications, newest first. Sent once per connection.
    #[serde(rename = "chat-history")]
    HistorySnapshot(Vec<Notification>),

    /// A notification relayed live by the server.
    #[serde(rename = "new-notification")]
    NotificationCreated(Notification),

    /// Transport went away.
    #[serde(rename = "disconnect")]
    Disconnected(String),
}

impl ChannelEvent {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            ChannelEvent::ConnectionEstablished => "connect",
            ChannelEvent::HistorySnapshot(_) => "chat-history",
            ChannelEvent::NotificationCreated(_) => "new-notification",
            ChannelEvent::Disconnected(_) => "disconnect",
        }
    }

    /// Decode an inbound frame.
    pub fn from_json(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(frame)?)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| PanelError::Serialization(e.to_string()))
    }
}

/// Events the panel sends to the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum OutboundEvent {
    #[serde(rename = "send-notification")]
    SubmitNotification(OutboundMessage),
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::SubmitNotification(_) => "send-notification",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| PanelError::Serialization(e.to_string()))
    }

    pub fn from_json(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(frame)?)
    }
}
