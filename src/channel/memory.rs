//! In-process channel and relay hub.
//!
//! `MemoryHub` behaves like the notification server as seen from a client:
//! every connecting client gets `connect` followed by the history snapshot,
//! and every submitted notification is stamped and relayed to all connected
//! clients (the sender included). Used for tests and for embedding several
//! panels in one process.

use super::types::{ChannelEvent, OutboundEvent};
use super::RemoteChannel;
use crate::error::{PanelError, Result};
use crate::types::{Notification, NotificationId};
use chrono::Utc;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Inbound events a client may leave unread before the hub drops it.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Reason reported when the hub goes away without saying why.
const CLOSED_BY_SERVER: &str = "connection closed by server";

/// Shared hub state.
struct HubState {
    /// Relayed notifications, newest first.
    history: Vec<Notification>,
    /// Connected clients by id.
    clients: HashMap<u64, Sender<ChannelEvent>>,
    queue_capacity: usize,
    next_client: u64,
    next_notification: u64,
}

impl Default for HubState {
    fn default() -> Self {
        Self {
            history: Vec::new(),
            clients: HashMap::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            next_client: 0,
            next_notification: 0,
        }
    }
}

impl HubState {
    /// Send to every client, dropping those that are gone or not keeping up.
    fn fan_out(&mut self, event: &ChannelEvent) {
        self.clients
            .retain(|client, sender| match sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!(client = *client, "inbound queue full, dropping client");
                    false
                }
                Err(TrySendError::Disconnected(_)) => false,
            });
    }
}

/// In-process stand-in for the notification server.
#[derive(Clone, Default)]
pub struct MemoryHub {
    state: Arc<Mutex<HubState>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub pre-loaded with history (newest first).
    pub fn with_history(history: Vec<Notification>) -> Self {
        let hub = Self::new();
        hub.state.lock().history = history;
        hub
    }

    /// Bound each client's inbound queue to `capacity` events. A client
    /// whose queue fills up is disconnected.
    pub fn with_queue_capacity(self, capacity: usize) -> Self {
        // Room for the connect event and the history snapshot.
        self.state.lock().queue_capacity = capacity.max(2);
        self
    }

    /// A new, not yet connected client channel.
    pub fn client(&self) -> MemoryChannel {
        let mut state = self.state.lock();
        state.next_client += 1;

        MemoryChannel {
            hub: self.clone(),
            client_id: state.next_client,
            receiver: None,
        }
    }

    /// Relayed notifications, newest first.
    pub fn history(&self) -> Vec<Notification> {
        self.state.lock().history.clone()
    }

    pub fn connected_clients(&self) -> usize {
        self.state.lock().clients.len()
    }

    /// Whether `channel` is currently attached on the hub side.
    pub fn is_attached(&self, channel: &MemoryChannel) -> bool {
        self.state.lock().clients.contains_key(&channel.client_id)
    }

    /// Push an arbitrary event to every connected client.
    pub fn broadcast(&self, event: ChannelEvent) {
        self.state.lock().fan_out(&event);
    }

    /// Drop a client from the server side, as a transport failure would.
    pub fn kick(&self, channel: &MemoryChannel, reason: &str) {
        let mut state = self.state.lock();
        if let Some(sender) = state.clients.remove(&channel.client_id) {
            // A full queue still ends in a disconnect once drained.
            let _ = sender.try_send(ChannelEvent::Disconnected(reason.to_string()));
            info!(client = channel.client_id, %reason, "client kicked from hub");
        }
    }

    /// Register a client with a fresh queue, primed with the connect event
    /// and the history snapshot.
    fn attach(&self, client_id: u64) -> Result<Receiver<ChannelEvent>> {
        let mut state = self.state.lock();
        let (sender, receiver) = bounded(state.queue_capacity);

        sender
            .try_send(ChannelEvent::ConnectionEstablished)
            .map_err(|_| PanelError::ChannelClosed)?;
        sender
            .try_send(ChannelEvent::HistorySnapshot(state.history.clone()))
            .map_err(|_| PanelError::ChannelClosed)?;

        state.clients.insert(client_id, sender);
        info!(client = client_id, "client attached to hub");
        Ok(receiver)
    }

    fn detach(&self, client_id: u64) {
        if self.state.lock().clients.remove(&client_id).is_some() {
            debug!(client = client_id, "client detached from hub");
        }
    }

    fn relay(&self, client_id: u64, event: OutboundEvent) -> Result<()> {
        let OutboundEvent::SubmitNotification(message) = event;

        let mut state = self.state.lock();
        if !state.clients.contains_key(&client_id) {
            return Err(PanelError::NotConnected);
        }
        state.next_notification += 1;

        let notification = Notification {
            table_no: message.table_no,
            message: message.message,
            timestamp: Some(Utc::now()),
            id: Some(NotificationId(format!("n-{}", state.next_notification))),
        };

        state.history.insert(0, notification.clone());
        state.fan_out(&ChannelEvent::NotificationCreated(notification));
        Ok(())
    }
}

/// Client end of a [`MemoryHub`] connection.
///
/// Connection state lives on the hub: a kicked or dropped client reports
/// disconnected immediately, before it has read the `disconnect` event.
pub struct MemoryChannel {
    hub: MemoryHub,
    client_id: u64,
    /// Queue of the current connection. Events left over from an earlier
    /// connection are discarded on reconnect.
    receiver: Option<Receiver<ChannelEvent>>,
}

impl MemoryChannel {
    /// Wait up to `timeout` for the next inbound event.
    pub fn poll_timeout(&mut self, timeout: Duration) -> Option<ChannelEvent> {
        let receiver = self.receiver.as_ref()?;
        match receiver.recv_timeout(timeout) {
            Ok(event) => Some(self.observe(event)),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => None,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Some(self.closed()),
        }
    }

    fn observe(&mut self, event: ChannelEvent) -> ChannelEvent {
        if let ChannelEvent::Disconnected(_) = event {
            self.receiver = None;
        }
        event
    }

    // The hub dropped our sender without a disconnect event.
    fn closed(&mut self) -> ChannelEvent {
        self.receiver = None;
        ChannelEvent::Disconnected(CLOSED_BY_SERVER.to_string())
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        self.hub.detach(self.client_id);
    }
}

impl RemoteChannel for MemoryChannel {
    fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        self.receiver = Some(self.hub.attach(self.client_id)?);
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<ChannelEvent>> {
        let Some(receiver) = self.receiver.as_ref() else {
            return Ok(None);
        };
        match receiver.try_recv() {
            Ok(event) => Ok(Some(self.observe(event))),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Ok(Some(self.closed())),
        }
    }

    fn emit(&mut self, event: OutboundEvent) -> Result<()> {
        self.hub.relay(self.client_id, event)
    }

    fn disconnect(&mut self) -> Result<()> {
        self.hub.detach(self.client_id);
        self.receiver = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.hub.is_attached(self)
    }
}
