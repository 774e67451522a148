use notice_board::{
    group_notifications, FilterCriteria, MemoryKeyValueStore, Notification, NotificationStore,
    PersistedValue, RetentionPolicy, StoreConfig,
};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn arb_notification() -> impl Strategy<Value = Notification> {
    (
        prop_oneof![Just("1"), Just("2"), Just("10"), Just("Bar"), Just("bar")],
        "[a-zA-Z ]{1,12}",
    )
        .prop_map(|(table, message)| Notification::new(table, format!("m {}", message)))
}

proptest! {
    #[test]
    fn receive_is_lifo_by_arrival(items in prop::collection::vec(arb_notification(), 0..40)) {
        let mut store = NotificationStore::new();

        for (i, item) in items.iter().enumerate() {
            let arrival = store.receive(item.clone());
            prop_assert_eq!(arrival.index, 0);
            prop_assert_eq!(store.len(), i + 1);
            prop_assert_eq!(store.get(0), Some(item));
        }

        let expected: Vec<_> = items.iter().rev().cloned().collect();
        prop_assert_eq!(store.snapshot(), expected);
    }

    #[test]
    fn hydrate_then_receive_prepends(
        history in prop::collection::vec(arb_notification(), 0..20),
        live in arb_notification(),
    ) {
        let mut store = NotificationStore::new();
        store.receive(Notification::new("x", "discarded"));
        store.hydrate(history.clone());
        store.receive(live.clone());

        let mut expected = vec![live];
        expected.extend(history);
        prop_assert_eq!(store.snapshot(), expected);
    }

    #[test]
    fn view_partitions_the_log(items in prop::collection::vec(arb_notification(), 0..40)) {
        let view = group_notifications(&items, &FilterCriteria::none());

        prop_assert_eq!(view.total(), items.len());

        // Within each table, log order is preserved
        let mut by_table: BTreeMap<&str, Vec<&Notification>> = BTreeMap::new();
        for n in &items {
            by_table.entry(n.table_no.as_str()).or_default().push(n);
        }
        for (table, entries) in view.iter() {
            prop_assert_eq!(entries.to_vec(), by_table[table].clone());
        }
    }

    #[test]
    fn filtered_view_is_subset(
        items in prop::collection::vec(arb_notification(), 0..40),
        table in prop_oneof![Just(None), Just(Some("bar".to_string())), Just(Some("1".to_string()))],
        text in prop_oneof![Just(None), Just(Some("A".to_string())), Just(Some("m".to_string()))],
    ) {
        let criteria = FilterCriteria { table: table.clone(), text: text.clone() };
        let view = group_notifications(&items, &criteria);

        for (name, entries) in view.iter() {
            prop_assert!(!entries.is_empty());
            if let Some(ref t) = table {
                prop_assert!(name.eq_ignore_ascii_case(t));
            }
            if let Some(ref t) = text {
                for n in entries {
                    prop_assert!(n.message.to_lowercase().contains(&t.to_lowercase()));
                }
            }
        }
    }

    #[test]
    fn capped_log_never_exceeds_cap(
        cap in 1usize..8,
        items in prop::collection::vec(arb_notification(), 0..30),
    ) {
        let mut store = NotificationStore::with_config(StoreConfig {
            retention: RetentionPolicy::Capped { max_entries: cap },
            ..Default::default()
        });

        for item in &items {
            store.receive(item.clone());
            prop_assert!(store.len() <= cap);
        }

        let expected: Vec<_> = items.iter().rev().take(cap).cloned().collect();
        prop_assert_eq!(store.snapshot(), expected);
    }

    #[test]
    fn persisted_value_round_trips(
        value in prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..8),
    ) {
        let backend = MemoryKeyValueStore::new();

        let mut first: PersistedValue<BTreeMap<String, i64>, _> =
            PersistedValue::user_data(backend.clone());
        first.set(value.clone()).unwrap();

        let second: PersistedValue<BTreeMap<String, i64>, _> =
            PersistedValue::user_data(backend.clone());
        prop_assert_eq!(second.read(), Some(&value));
    }
}
