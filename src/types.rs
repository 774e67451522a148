//! Core types for the notification panel.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label shown for notifications the server sent without a timestamp.
pub const NO_TIMESTAMP_LABEL: &str = "No timestamp";

/// Opaque server-assigned identifier for a notification.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub String);

impl fmt::Debug for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NotificationId({})", self.0)
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NotificationId {
    fn from(s: &str) -> Self {
        NotificationId(s.to_string())
    }
}

/// A single notification as relayed by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireNotification")]
pub struct Notification {
    /// Table the notification is addressed to.
    #[serde(rename = "tableNo")]
    pub table_no: String,

    pub message: String,

    /// When the server recorded the notification, if it said.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Stable identity for list keys. Without it, position is the only identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<NotificationId>,
}

/// Inbound shape. Document stores send `_id`, sometimes alongside a virtual
/// `id`; `id` wins when both are present.
#[derive(Deserialize)]
struct WireNotification {
    #[serde(rename = "tableNo", deserialize_with = "string_or_number")]
    table_no: String,

    message: String,

    #[serde(default, deserialize_with = "optional_timestamp")]
    timestamp: Option<DateTime<Utc>>,

    #[serde(default)]
    id: Option<NotificationId>,

    #[serde(default, rename = "_id")]
    document_id: Option<NotificationId>,
}

impl From<WireNotification> for Notification {
    fn from(wire: WireNotification) -> Self {
        Self {
            table_no: wire.table_no,
            message: wire.message,
            timestamp: wire.timestamp,
            id: wire.id.or(wire.document_id),
        }
    }
}

impl Notification {
    /// Create a notification with no timestamp or id.
    pub fn new(table_no: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            table_no: table_no.into(),
            message: message.into(),
            timestamp: None,
            id: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_id(mut self, id: impl Into<NotificationId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Whether both required fields carry something other than whitespace.
    pub fn is_well_formed(&self) -> bool {
        !self.table_no.trim().is_empty() && !self.message.trim().is_empty()
    }

    /// Human-readable timestamp, or [`NO_TIMESTAMP_LABEL`].
    pub fn timestamp_label(&self) -> String {
        match self.timestamp {
            Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => NO_TIMESTAMP_LABEL.to_string(),
        }
    }
}

/// Validated payload for the outbound submit event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    #[serde(rename = "tableNo")]
    pub table_no: String,
    pub message: String,
}

/// Signal returned by `receive`: where the new item landed and what the
/// consumer may want to do about it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Arrival {
    /// Position of the new item in the log. Always 0.
    pub index: usize,
    /// Sound was armed when the item arrived.
    pub play_sound: bool,
    /// Entries dropped by the retention policy to make room.
    pub evicted: usize,
}

// Table numbers come from a free-text input but some servers echo them back
// as JSON numbers.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrNumber;

    impl<'de> Visitor<'de> for StringOrNumber {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or a number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<String, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(StringOrNumber)
}

// Accepts RFC 3339 strings, epoch milliseconds, or null.
fn optional_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Millis(i64),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Text(s)) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(de::Error::custom),
        Some(Raw::Millis(ms)) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {ms}"))),
    }
}
