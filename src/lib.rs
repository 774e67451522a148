//! # Notice Board
//!
//! Client-side state for a live notification panel: staff send a table
//! number and a message, the server relays every notification to all
//! connected panels, and each panel shows them grouped by table.
//!
//! ## Core Concepts
//!
//! - **Store**: Newest-first log of notifications, sound arming, and submit
//!   validation. Pure state, no I/O
//! - **View**: The log grouped by table, filtered by table and message text
//! - **Channel**: Injected connection to the server, with an in-process hub
//! - **Panel**: A store wired to a channel, with subscriptions for the
//!   presentation layer
//! - **Persisted values**: JSON values mirrored to a durable key-value store
//!
//! ## Example
//!
//! ```ignore
//! use notice_board::{FilterCriteria, MemoryHub, Panel, PanelConfig};
//!
//! let hub = MemoryHub::new();
//! let mut panel = Panel::new(PanelConfig::default(), hub.client())?;
//! panel.connect()?;
//! panel.pump()?; // history snapshot
//!
//! panel.send("12", "Extra napkins")?;
//! panel.pump()?; // server relay
//!
//! for (table, entries) in panel.store().view(&FilterCriteria::none()).iter() {
//!     println!("Table {}: {} notifications", table, entries.len());
//! }
//! ```

pub mod channel;
pub mod error;
pub mod form;
pub mod panel;
pub mod persist;
pub mod store;
pub mod subscriptions;
pub mod types;
pub mod view;

// Re-exports
pub use channel::{ChannelEvent, MemoryChannel, MemoryHub, OutboundEvent, RemoteChannel};
pub use error::{PanelError, Result, SubmitField, ValidationError};
pub use form::DraftForm;
pub use panel::{Panel, PanelConfig, PumpSummary};
pub use persist::{
    FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, PersistedValue, USER_DATA_KEY,
};
pub use store::{HydrateMode, NotificationStore, RetentionPolicy, StoreConfig};
pub use subscriptions::{
    DropReason, PanelEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId, SubscriptionManager,
};
pub use types::*;
pub use view::{group_notifications, FilterCriteria, GroupedView};
