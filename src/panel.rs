//! The notification panel: a store wired to a channel.

use crate::channel::{ChannelEvent, OutboundEvent, RemoteChannel};
use crate::error::{PanelError, Result};
use crate::form::DraftForm;
use crate::persist::FileKeyValueStore;
use crate::store::{NotificationStore, RetentionPolicy, StoreConfig};
use crate::subscriptions::{
    DropReason, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle, SubscriptionId,
    SubscriptionManager,
};
use crate::types::{Arrival, Notification, OutboundMessage};
use crate::view::{FilterCriteria, GroupedView};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Panel configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Notification server the channel connects to.
    pub endpoint: String,

    /// Log retention and snapshot handling.
    pub store: StoreConfig,

    /// Default buffer for subscriptions created with [`Panel::subscribe_all`].
    pub subscription_buffer: usize,

    /// Directory for persisted values.
    pub storage_path: PathBuf,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://quickserve-5mhc.onrender.com".to_string(),
            store: StoreConfig::default(),
            subscription_buffer: 256,
            storage_path: PathBuf::from("./panel-data"),
        }
    }
}

impl PanelConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(PanelError::InvalidConfig("endpoint is empty".into()));
        }
        if self.subscription_buffer == 0 {
            return Err(PanelError::InvalidConfig(
                "subscription_buffer must be at least 1".into(),
            ));
        }
        if let RetentionPolicy::Capped { max_entries: 0 } = self.store.retention {
            return Err(PanelError::InvalidConfig(
                "capped retention must keep at least 1 entry".into(),
            ));
        }
        Ok(())
    }

    /// Open the file-backed store for persisted values.
    pub fn open_storage(&self) -> Result<FileKeyValueStore> {
        FileKeyValueStore::open(&self.storage_path)
    }
}

/// What a call to [`Panel::pump`] processed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PumpSummary {
    /// Inbound events handled.
    pub events: usize,
    /// Live notifications added to the log.
    pub arrivals: usize,
    /// Inbound notifications ignored for missing fields.
    pub rejected: usize,
    /// A history snapshot replaced the log.
    pub hydrated: bool,
}

/// A notification store connected to a server through `C`.
pub struct Panel<C> {
    config: PanelConfig,
    channel: C,
    store: NotificationStore,
    subscriptions: SubscriptionManager,
    criteria: FilterCriteria,
}

impl<C: RemoteChannel> Panel<C> {
    /// Create a panel around an unconnected channel.
    pub fn new(config: PanelConfig, channel: C) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            store: NotificationStore::with_config(config.store.clone()),
            config,
            channel,
            subscriptions: SubscriptionManager::new(),
            criteria: FilterCriteria::default(),
        })
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn store(&self) -> &NotificationStore {
        &self.store
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    // --- Lifecycle ---

    pub fn connect(&mut self) -> Result<()> {
        info!(endpoint = %self.config.endpoint, "connecting notification channel");
        self.channel.connect()
    }

    /// Disconnect and drop every subscription.
    pub fn disconnect(&mut self) -> Result<()> {
        self.channel.disconnect()?;
        self.subscriptions.close_all(DropReason::Disconnected);
        info!("notification channel disconnected");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    // --- Inbound ---

    /// Handle every inbound event that is ready, in order.
    pub fn pump(&mut self) -> Result<PumpSummary> {
        let mut summary = PumpSummary::default();

        while let Some(event) = self.channel.poll()? {
            summary.events += 1;
            match event {
                ChannelEvent::HistorySnapshot(_) => summary.hydrated = true,
                ChannelEvent::NotificationCreated(ref n) if !n.is_well_formed() => {
                    summary.rejected += 1
                }
                ChannelEvent::NotificationCreated(_) => summary.arrivals += 1,
                _ => {}
            }
            self.handle_event(event);
        }

        Ok(summary)
    }

    /// Apply one inbound event. Returns the arrival signal for live
    /// notifications that made it into the log.
    pub fn handle_event(&mut self, event: ChannelEvent) -> Option<Arrival> {
        match event {
            ChannelEvent::ConnectionEstablished => {
                info!(endpoint = %self.config.endpoint, "notification channel connected");
                None
            }
            ChannelEvent::HistorySnapshot(history) => {
                let total = history.len();
                let history: Vec<Notification> =
                    history.into_iter().filter(Notification::is_well_formed).collect();
                if history.len() < total {
                    warn!(
                        skipped = total - history.len(),
                        "history snapshot contained notifications without table or message"
                    );
                }

                let count = self.store.hydrate(history);
                self.subscriptions.broadcast_hydrated(count);
                None
            }
            ChannelEvent::NotificationCreated(notification) => {
                if !notification.is_well_formed() {
                    warn!("ignoring notification without table or message");
                    return None;
                }

                let arrival = self.store.receive(notification.clone());
                self.subscriptions
                    .broadcast_arrival(&notification, arrival.index, arrival.play_sound);
                Some(arrival)
            }
            ChannelEvent::Disconnected(reason) => {
                warn!(%reason, "notification channel dropped");
                None
            }
        }
    }

    // --- Intents ---

    /// Validate and send a notification.
    ///
    /// Nothing is sent if validation fails. The log is not touched either
    /// way; the server's relay arrives later through [`Panel::pump`].
    pub fn send(&mut self, table_no: &str, message: &str) -> Result<OutboundMessage> {
        let outbound = self.store.submit(table_no, message)?;

        self.channel
            .emit(OutboundEvent::SubmitNotification(outbound.clone()))?;
        debug!(table = %outbound.table_no, "notification submitted");

        Ok(outbound)
    }

    /// Send the form's contents, clearing it on success.
    pub fn send_draft(&mut self, form: &mut DraftForm) -> Result<OutboundMessage> {
        let outbound = self.send(&form.table_no, &form.message)?;
        form.clear();
        Ok(outbound)
    }

    /// Arm notification sound using the caller's playback probe.
    pub fn arm_sound<F>(&mut self, probe: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        let was_armed = self.store.is_sound_armed();
        let armed = self.store.arm_sound(probe);
        if armed && !was_armed {
            self.subscriptions.broadcast_sound_armed();
        }
        armed
    }

    pub fn set_filter(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
    }

    pub fn clear_filter(&mut self) {
        self.criteria = FilterCriteria::default();
    }

    pub fn filter(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Grouped view under the current filter.
    pub fn view(&self) -> GroupedView<'_> {
        self.store.view(&self.criteria)
    }

    // --- Subscriptions ---

    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        self.subscriptions.subscribe(config)
    }

    /// Subscribe to everything with the configured buffer size.
    pub fn subscribe_all(&self) -> SubscriptionHandle {
        self.subscriptions.subscribe(SubscriptionConfig {
            buffer_size: self.config.subscription_buffer,
            filter: SubscriptionFilter::all(),
        })
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.unsubscribe(id);
    }
}
