//! Subscription manager for broadcasting panel events.

use crate::types::Notification;
use crate::view::table_matches;
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use super::types::{
    DropReason, PanelEvent, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
};

/// Internal subscription state.
///
/// The queue holds one slot more than `config.buffer_size`, kept free for
/// the final `Dropped` event.
struct Subscription {
    config: SubscriptionConfig,
    sender: Sender<PanelEvent>,
}

impl Subscription {
    /// Queue `event`, or report why this subscription has to go.
    fn deliver(&self, event: PanelEvent) -> Option<DropReason> {
        if self.sender.len() >= self.config.buffer_size {
            return Some(DropReason::BufferOverflow);
        }
        match self.sender.try_send(event) {
            Ok(()) => None,
            Err(TrySendError::Full(_)) => Some(DropReason::BufferOverflow),
            // Handle already dropped; nobody to tell.
            Err(TrySendError::Disconnected(_)) => Some(DropReason::Unsubscribed),
        }
    }

    fn close(self, reason: DropReason) {
        let _ = self.sender.try_send(PanelEvent::Dropped { reason });
    }

    /// Check if this subscription wants an arrival.
    fn matches_arrival(&self, notification: &Notification) -> bool {
        if !self.config.filter.include_arrivals {
            return false;
        }

        if let Some(ref tables) = self.config.filter.tables {
            return tables
                .iter()
                .any(|t| table_matches(t, &notification.table_no));
        }

        true
    }

    fn wants_lifecycle(&self) -> bool {
        self.config.filter.include_lifecycle
    }
}

/// Manages subscriptions and broadcasts events.
pub struct SubscriptionManager {
    /// Active subscriptions by ID.
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl SubscriptionManager {
    /// Create a new subscription manager.
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a new subscription.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let config = SubscriptionConfig {
            buffer_size: config.buffer_size.max(1),
            ..config
        };
        let (sender, receiver) = bounded(config.buffer_size + 1);

        self.subscriptions
            .write()
            .insert(id, Subscription { config, sender });

        SubscriptionHandle { id, receiver }
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Some(sub) = self.subscriptions.write().remove(&id) {
            sub.close(DropReason::Unsubscribed);
        }
    }

    /// Drop every subscription, telling each one why.
    pub fn close_all(&self, reason: DropReason) {
        for (_, sub) in self.subscriptions.write().drain() {
            sub.close(reason.clone());
        }
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    // --- Broadcasting ---

    /// Broadcast a live arrival to matching subscriptions.
    pub fn broadcast_arrival(&self, notification: &Notification, index: usize, play_sound: bool) {
        let event = PanelEvent::Arrived {
            notification: notification.clone(),
            index,
            play_sound,
        };

        self.broadcast(|sub| sub.matches_arrival(notification), event);
    }

    /// Broadcast that the log was hydrated.
    pub fn broadcast_hydrated(&self, count: usize) {
        self.broadcast(
            Subscription::wants_lifecycle,
            PanelEvent::Hydrated { count },
        );
    }

    /// Broadcast that sound was armed.
    pub fn broadcast_sound_armed(&self) {
        self.broadcast(Subscription::wants_lifecycle, PanelEvent::SoundArmed);
    }

    /// Deliver `event` to every subscription `wants` selects, dropping the
    /// ones that cannot take it.
    fn broadcast<F>(&self, wants: F, event: PanelEvent)
    where
        F: Fn(&Subscription) -> bool,
    {
        let mut failed = Vec::new();
        for (id, sub) in self.subscriptions.read().iter() {
            if !wants(sub) {
                continue;
            }
            if let Some(reason) = sub.deliver(event.clone()) {
                failed.push((*id, reason));
            }
        }

        if failed.is_empty() {
            return;
        }

        let mut subs = self.subscriptions.write();
        for (id, reason) in failed {
            if let Some(sub) = subs.remove(&id) {
                debug!(subscription = id.0, ?reason, "dropping subscriber");
                sub.close(reason);
            }
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}
