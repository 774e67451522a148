//! Subscription system for live panel updates.
//!
//! The presentation layer subscribes here instead of polling the store:
//! - New notifications (with the "play sound" hint)
//! - Log hydration from a history snapshot
//! - Sound arming
//!
//! Subscriptions support:
//! - Filtering by table
//! - Bounded buffers with slow-subscriber dropping
//!
//! # Example
//!
//! ```ignore
//! let manager = SubscriptionManager::new();
//! let handle = manager.subscribe(SubscriptionConfig {
//!     filter: SubscriptionFilter::tables(vec!["12".to_string()]),
//!     ..Default::default()
//! });
//!
//! loop {
//! while let Some(event) = handle.recv() {
//!     match event {
//!         PanelEvent::Arrived { play_sound, .. } => {
//!             if play_sound { chime(); }
//!             scroll_to_top();
//!         }
//!         PanelEvent::Dropped { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    DropReason, PanelEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId,
};
