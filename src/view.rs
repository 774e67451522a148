//! Filtered, per-table view over the notification log.

use crate::types::Notification;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Filter criteria for the grouped view.
///
/// Blank strings are treated the same as `None`. Table names are compared
/// trimmed; message text is searched for exactly as typed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Exact table match, case-insensitive.
    pub table: Option<String>,

    /// Substring of the message, case-insensitive.
    pub text: Option<String>,
}

impl FilterCriteria {
    /// No filtering.
    pub fn none() -> Self {
        Self::default()
    }

    /// Only the given table.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            ..Default::default()
        }
    }

    /// Only messages containing the given text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// True when neither filter is active.
    pub fn is_empty(&self) -> bool {
        self.table_key().is_none() && self.text_needle().is_none()
    }

    fn table_key(&self) -> Option<String> {
        self.table
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(table_key)
    }

    fn text_needle(&self) -> Option<String> {
        self.text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(str::to_lowercase)
    }
}

/// Comparison form of a table name: trimmed, lowercased.
fn table_key(table: &str) -> String {
    table.trim().to_lowercase()
}

/// Whether `table_no` is the table named by `filter`.
pub(crate) fn table_matches(filter: &str, table_no: &str) -> bool {
    table_key(filter) == table_key(table_no)
}

/// Notifications grouped by table.
///
/// Groups are ordered by first appearance in the log, so the table with the
/// newest notification comes first. Entries keep their log order.
#[derive(Clone, Debug, Default)]
pub struct GroupedView<'a> {
    groups: IndexMap<&'a str, Vec<&'a Notification>>,
}

impl<'a> GroupedView<'a> {
    /// Entries for a table, by exact table name.
    pub fn get(&self, table: &str) -> Option<&[&'a Notification]> {
        self.groups.get(table).map(Vec::as_slice)
    }

    /// Table names in display order.
    pub fn tables(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.groups.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &[&'a Notification])> + '_ {
        self.groups.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of notifications across all groups.
    pub fn total(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Owned copy, for handing across a thread or serializing.
    pub fn to_owned_groups(&self) -> IndexMap<String, Vec<Notification>> {
        self.groups
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|n| (*n).clone()).collect()))
            .collect()
    }
}

/// Group `log` (newest first) by table and apply `criteria`.
///
/// A table is included only if at least one of its entries survives the text
/// filter and the table filter (if any) matches its name case-insensitively.
pub fn group_notifications<'a, I>(log: I, criteria: &FilterCriteria) -> GroupedView<'a>
where
    I: IntoIterator<Item = &'a Notification>,
{
    let table_filter = criteria.table_key();
    let text_filter = criteria.text_needle();

    let mut groups: IndexMap<&'a str, Vec<&'a Notification>> = IndexMap::new();

    for notification in log {
        if let Some(ref table) = table_filter {
            if table_key(&notification.table_no) != *table {
                continue;
            }
        }

        if let Some(ref text) = text_filter {
            if !notification.message.to_lowercase().contains(text.as_str()) {
                continue;
            }
        }

        groups
            .entry(notification.table_no.as_str())
            .or_default()
            .push(notification);
    }

    GroupedView { groups }
}

/// Distinct table names in first-appearance order.
pub fn distinct_tables<'a, I>(log: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a Notification>,
{
    let mut seen: IndexMap<&str, ()> = IndexMap::new();
    for notification in log {
        seen.entry(notification.table_no.as_str()).or_insert(());
    }
    seen.into_keys().collect()
}
