//! Subscription types for live panel updates.

use crate::types::Notification;
use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered events before dropping subscriber.
    /// Default: 256
    pub buffer_size: usize,

    /// Filter criteria.
    pub filter: SubscriptionFilter,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 256,
            filter: SubscriptionFilter::all(),
        }
    }
}

/// Filter criteria for subscriptions.
#[derive(Clone, Debug, Default)]
pub struct SubscriptionFilter {
    /// Only arrivals for these tables, case-insensitive (None = all tables).
    pub tables: Option<Vec<String>>,

    /// Include new-notification events.
    pub include_arrivals: bool,

    /// Include hydration and sound events.
    pub include_lifecycle: bool,
}

impl SubscriptionFilter {
    /// Arrivals for every table.
    pub fn arrivals() -> Self {
        Self {
            include_arrivals: true,
            ..Default::default()
        }
    }

    /// Arrivals for specific tables only.
    pub fn tables(tables: Vec<String>) -> Self {
        Self {
            tables: Some(tables),
            include_arrivals: true,
            ..Default::default()
        }
    }

    /// Everything.
    pub fn all() -> Self {
        Self {
            include_arrivals: true,
            include_lifecycle: true,
            ..Default::default()
        }
    }
}

/// Events emitted to subscribers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PanelEvent {
    /// The log was reset from a history snapshot.
    Hydrated { count: usize },

    /// A live notification landed at the top of the log.
    Arrived {
        notification: Notification,
        index: usize,
        /// Sound was armed; the presentation layer should play the chime.
        play_sound: bool,
    },

    /// Sound was armed.
    SoundArmed,

    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// The panel disconnected from its channel.
    Disconnected,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Receiving end of a subscription.
///
/// Every method returns `None` once nothing is buffered and, for the
/// blocking ones, the subscription has been dropped by the panel.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    pub(super) receiver: Receiver<PanelEvent>,
}

impl SubscriptionHandle {
    /// Block until the next event.
    pub fn recv(&self) -> Option<PanelEvent> {
        self.receiver.recv().ok()
    }

    pub fn try_recv(&self) -> Option<PanelEvent> {
        self.receiver.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<PanelEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Everything currently buffered, without blocking.
    pub fn drain(&self) -> Vec<PanelEvent> {
        self.receiver.try_iter().collect()
    }
}
