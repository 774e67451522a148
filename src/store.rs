//! The notification store: an ordered log of received notifications plus
//! the user intents that act on it.
//!
//! The store is a plain state machine. It never performs I/O; the panel
//! feeds it inbound channel events and forwards what `submit` returns.

use crate::error::{SubmitField, ValidationError};
use crate::types::{Arrival, Notification, OutboundMessage};
use crate::view::{distinct_tables, group_notifications, FilterCriteria, GroupedView};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// How many notifications the log keeps for the session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Keep everything until the session ends.
    #[default]
    Unbounded,

    /// Keep at most this many, evicting the oldest arrivals.
    Capped { max_entries: usize },

    /// Drop entries whose timestamp is older than this. Entries without a
    /// timestamp are kept.
    Windowed { max_age_secs: u64 },
}

/// What a history snapshot does to entries already in the log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HydrateMode {
    /// The snapshot replaces the log.
    #[default]
    Replace,

    /// Live arrivals since the previous snapshot that the new snapshot does
    /// not contain yet survive, ahead of it. Older entries are replaced.
    Merge,
}

/// Store configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub retention: RetentionPolicy,
    pub hydrate_mode: HydrateMode,
}

/// Notification log and sound state for one session.
///
/// Internally the log is kept oldest-first so arrivals and evictions are
/// O(1); every public accessor presents it newest-first.
#[derive(Debug, Default)]
pub struct NotificationStore {
    config: StoreConfig,

    /// Oldest arrival at the front, newest at the back.
    log: VecDeque<Notification>,

    /// How many entries at the newest end arrived live and have not been
    /// confirmed by a snapshot.
    unconfirmed: usize,

    sound_armed: bool,
}

impl NotificationStore {
    /// Create an empty store with the default (unbounded, replacing) policy.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // --- Transitions ---

    /// Reset the log to a server history snapshot.
    ///
    /// `history` is newest-first, as the server sends it. Returns the number
    /// of entries in the log afterwards.
    pub fn hydrate(&mut self, history: Vec<Notification>) -> usize {
        let previous = self.log.len();

        let mut log: VecDeque<Notification> = history.into_iter().rev().collect();

        let mut unconfirmed = 0;
        if self.config.hydrate_mode == HydrateMode::Merge {
            let live_from = self.log.len() - self.unconfirmed;
            let survivors: Vec<Notification> = self
                .log
                .drain(live_from..)
                .filter(|existing| !log.iter().any(|n| same_notification(n, existing)))
                .collect();
            unconfirmed = survivors.len();
            log.extend(survivors);
        }

        self.log = log;
        self.unconfirmed = unconfirmed;
        let evicted = self.enforce_retention(Utc::now());

        debug!(
            previous,
            current = self.log.len(),
            evicted,
            mode = ?self.config.hydrate_mode,
            "hydrated notification log"
        );

        self.log.len()
    }

    /// Record a live notification as the newest entry.
    pub fn receive(&mut self, notification: Notification) -> Arrival {
        debug!(table = %notification.table_no, "notification received");

        self.log.push_back(notification);
        self.unconfirmed += 1;
        let evicted = self.enforce_retention(Utc::now());

        Arrival {
            index: 0,
            play_sound: self.sound_armed,
            evicted,
        }
    }

    /// Validate a user submission.
    ///
    /// Both inputs are trimmed; either being empty rejects the submission.
    /// The log is untouched: the server relays the message back as an
    /// ordinary live event.
    pub fn submit(
        &self,
        table_no: &str,
        message: &str,
    ) -> std::result::Result<OutboundMessage, ValidationError> {
        let table_no = table_no.trim();
        let message = message.trim();

        if table_no.is_empty() {
            return Err(ValidationError::Empty(SubmitField::TableNo));
        }
        if message.is_empty() {
            return Err(ValidationError::Empty(SubmitField::Message));
        }

        Ok(OutboundMessage {
            table_no: table_no.to_string(),
            message: message.to_string(),
        })
    }

    /// Arm notification sound.
    ///
    /// `probe` is the caller's playback check (e.g. a muted test play to
    /// satisfy autoplay rules); it is not run once sound is armed.
    pub fn arm_sound<F>(&mut self, probe: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        if self.sound_armed {
            return true;
        }

        self.sound_armed = probe();
        debug!(armed = self.sound_armed, "sound arming attempted");
        self.sound_armed
    }

    // --- Queries ---

    /// Grouped, filtered view of the current log.
    pub fn view(&self, criteria: &FilterCriteria) -> GroupedView<'_> {
        group_notifications(self.notifications(), criteria)
    }

    /// Notifications, newest first.
    pub fn notifications(&self) -> impl Iterator<Item = &Notification> + '_ {
        self.log.iter().rev()
    }

    /// Notification at `index`, counting from the newest.
    pub fn get(&self, index: usize) -> Option<&Notification> {
        let len = self.log.len();
        if index < len {
            self.log.get(len - 1 - index)
        } else {
            None
        }
    }

    /// The most recent arrival.
    pub fn latest(&self) -> Option<&Notification> {
        self.log.back()
    }

    /// Owned newest-first copy of the log.
    pub fn snapshot(&self) -> Vec<Notification> {
        self.notifications().cloned().collect()
    }

    /// Distinct tables, newest activity first.
    pub fn tables(&self) -> Vec<&str> {
        distinct_tables(self.notifications())
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn is_sound_armed(&self) -> bool {
        self.sound_armed
    }

    // --- Retention ---

    /// Apply the retention policy. Returns how many entries were evicted.
    fn enforce_retention(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.log.len();

        match self.config.retention {
            RetentionPolicy::Unbounded => {}
            RetentionPolicy::Capped { max_entries } => {
                while self.log.len() > max_entries {
                    self.log.pop_front();
                }
                self.unconfirmed = self.unconfirmed.min(self.log.len());
            }
            RetentionPolicy::Windowed { max_age_secs } => {
                // A window too large to represent keeps everything.
                let cutoff = i64::try_from(max_age_secs)
                    .ok()
                    .and_then(Duration::try_seconds)
                    .and_then(|max_age| now.checked_sub_signed(max_age));
                if let Some(cutoff) = cutoff {
                    let live_from = self.log.len() - self.unconfirmed;
                    let mut position = 0;
                    let mut live_removed = 0;
                    self.log.retain(|n| {
                        let keep = n.timestamp.map_or(true, |ts| ts >= cutoff);
                        if !keep && position >= live_from {
                            live_removed += 1;
                        }
                        position += 1;
                        keep
                    });
                    self.unconfirmed -= live_removed;
                }
            }
        }

        before - self.log.len()
    }
}

/// Identity used when merging a snapshot into an existing log.
fn same_notification(a: &Notification, b: &Notification) -> bool {
    match (&a.id, &b.id) {
        (Some(x), Some(y)) => x == y,
        _ => a.table_no == b.table_no && a.message == b.message && a.timestamp == b.timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(store: &NotificationStore) -> Vec<String> {
        store.notifications().map(|n| n.message.clone()).collect()
    }

    #[test]
    fn test_receive_prepends() {
        let mut store = NotificationStore::new();

        for i in 0..5 {
            let arrival = store.receive(Notification::new("1", format!("m{}", i)));
            assert_eq!(arrival.index, 0);
            assert_eq!(store.len(), i + 1);
            assert_eq!(store.get(0).unwrap().message, format!("m{}", i));
        }

        assert_eq!(messages(&store), vec!["m4", "m3", "m2", "m1", "m0"]);
        assert_eq!(store.latest().unwrap().message, "m4");
    }

    #[test]
    fn test_hydrate_then_receive() {
        let mut store = NotificationStore::new();
        store.receive(Notification::new("9", "stale"));

        let count = store.hydrate(vec![
            Notification::new("1", "h1"),
            Notification::new("2", "h2"),
        ]);
        assert_eq!(count, 2);

        store.receive(Notification::new("3", "live"));
        assert_eq!(messages(&store), vec!["live", "h1", "h2"]);
    }

    #[test]
    fn test_hydrate_empty() {
        let mut store = NotificationStore::new();
        store.receive(Notification::new("1", "tea"));
        assert_eq!(store.hydrate(Vec::new()), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_hydrate_merge_keeps_unseen_live_entries() {
        let mut store = NotificationStore::with_config(StoreConfig {
            hydrate_mode: HydrateMode::Merge,
            ..Default::default()
        });

        store.hydrate(vec![Notification::new("1", "a").with_id("a")]);
        store.receive(Notification::new("1", "b").with_id("b"));
        store.receive(Notification::new("1", "c").with_id("c"));

        // Reconnect: the server knows about "b" but not "c" yet.
        store.hydrate(vec![
            Notification::new("1", "b").with_id("b"),
            Notification::new("1", "a").with_id("a"),
        ]);

        assert_eq!(messages(&store), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_hydrate_merge_drops_entries_the_server_forgot() {
        let mut store = NotificationStore::with_config(StoreConfig {
            hydrate_mode: HydrateMode::Merge,
            ..Default::default()
        });

        store.hydrate(vec![
            Notification::new("1", "new").with_id("n"),
            Notification::new("1", "old").with_id("o"),
        ]);
        // "old" came from a snapshot, not live, so the next snapshot decides.
        store.hydrate(vec![
            Notification::new("1", "newer").with_id("nn"),
            Notification::new("1", "new").with_id("n"),
        ]);

        assert_eq!(messages(&store), vec!["newer", "new"]);
    }

    #[test]
    fn test_hydrate_merge_survivors_stay_pending() {
        let mut store = NotificationStore::with_config(StoreConfig {
            hydrate_mode: HydrateMode::Merge,
            ..Default::default()
        });

        store.receive(Notification::new("1", "live").with_id("l"));
        store.hydrate(vec![Notification::new("1", "a").with_id("a")]);
        // Still unconfirmed, so a second reconnect keeps it too.
        store.hydrate(vec![Notification::new("1", "b").with_id("b")]);
        assert_eq!(messages(&store), vec!["live", "b"]);

        store.hydrate(vec![
            Notification::new("1", "live").with_id("l"),
            Notification::new("1", "b").with_id("b"),
        ]);
        assert_eq!(messages(&store), vec!["live", "b"]);
    }

    #[test]
    fn test_hydrate_merge_matches_by_content_without_ids() {
        let mut store = NotificationStore::with_config(StoreConfig {
            hydrate_mode: HydrateMode::Merge,
            ..Default::default()
        });
        let at = Utc::now();

        store.hydrate(vec![Notification::new("2", "soup").with_timestamp(at)]);
        store.receive(Notification::new("1", "tea").with_timestamp(at));
        store.receive(Notification::new("1", "tea").with_timestamp(at + Duration::seconds(1)));

        // The first "tea" is in the snapshot; the second differs by timestamp.
        store.hydrate(vec![
            Notification::new("1", "tea").with_timestamp(at),
            Notification::new("2", "soup").with_timestamp(at),
        ]);

        let stamps: Vec<_> = store.notifications().map(|n| n.timestamp).collect();
        assert_eq!(messages(&store), vec!["tea", "tea", "soup"]);
        assert_eq!(stamps[0], Some(at + Duration::seconds(1)));
        assert_eq!(stamps[1], Some(at));
    }

    #[test]
    fn test_replace_clears_pending_arrivals() {
        let mut store = NotificationStore::new();
        store.receive(Notification::new("1", "live"));
        store.hydrate(vec![Notification::new("1", "a")]);

        store.config.hydrate_mode = HydrateMode::Merge;
        store.hydrate(vec![Notification::new("1", "b")]);
        assert_eq!(messages(&store), vec!["b"]);
    }

    #[test]
    fn test_submit_validation() {
        let store = NotificationStore::new();

        assert_eq!(
            store.submit("", "x"),
            Err(ValidationError::Empty(SubmitField::TableNo))
        );
        assert_eq!(
            store.submit("x", ""),
            Err(ValidationError::Empty(SubmitField::Message))
        );
        assert!(matches!(
            store.submit("  ", "  "),
            Err(ValidationError::Empty(_))
        ));

        let out = store.submit(" 5 ", " hi ").unwrap();
        assert_eq!(out.table_no, "5");
        assert_eq!(out.message, "hi");
        assert!(store.is_empty());
    }

    #[test]
    fn test_arm_sound() {
        let mut store = NotificationStore::new();
        assert!(!store.receive(Notification::new("1", "a")).play_sound);

        assert!(!store.arm_sound(|| false));
        assert!(!store.is_sound_armed());

        assert!(store.arm_sound(|| true));
        // Idempotent: the probe is not consulted again.
        assert!(store.arm_sound(|| panic!("probe should not run")));

        assert!(store.receive(Notification::new("1", "b")).play_sound);
    }

    #[test]
    fn test_capped_retention() {
        let mut store = NotificationStore::with_config(StoreConfig {
            retention: RetentionPolicy::Capped { max_entries: 2 },
            ..Default::default()
        });

        assert_eq!(store.receive(Notification::new("1", "a")).evicted, 0);
        assert_eq!(store.receive(Notification::new("1", "b")).evicted, 0);
        assert_eq!(store.receive(Notification::new("1", "c")).evicted, 1);

        assert_eq!(messages(&store), vec!["c", "b"]);

        // Snapshots are capped too, keeping the newest.
        store.hydrate(vec![
            Notification::new("1", "x"),
            Notification::new("1", "y"),
            Notification::new("1", "z"),
        ]);
        assert_eq!(messages(&store), vec!["x", "y"]);
    }

    #[test]
    fn test_windowed_retention() {
        let mut store = NotificationStore::with_config(StoreConfig {
            retention: RetentionPolicy::Windowed { max_age_secs: 3600 },
            ..Default::default()
        });

        let now = Utc::now();
        store.hydrate(vec![
            Notification::new("1", "fresh").with_timestamp(now - Duration::minutes(5)),
            Notification::new("1", "undated"),
            Notification::new("1", "old").with_timestamp(now - Duration::hours(3)),
        ]);

        assert_eq!(messages(&store), vec!["fresh", "undated"]);
    }

    #[test]
    fn test_view_and_tables() {
        let mut store = NotificationStore::new();
        store.receive(Notification::new("2", "cake"));
        store.receive(Notification::new("1", "tea"));
        store.receive(Notification::new("2", "soup"));

        let view = store.view(&FilterCriteria::none());
        let two: Vec<_> = view.get("2").unwrap().iter().map(|n| &n.message).collect();
        assert_eq!(two, vec!["soup", "cake"]);
        assert_eq!(store.tables(), vec!["2", "1"]);
    }
}
