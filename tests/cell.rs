use reactive_cells::prelude::*;
use std::sync::{Arc, RwLock};

#[test]
fn notifies_subscribers() {
    let cell = ObservableCell::new("");
    let notified = Arc::new(RwLock::new(None));
    cell.subscribe(
        {
            let notified = Arc::clone(&notified);
            move |value: &&str| *notified.write().unwrap() = Some(*value)
        },
        SubscriberId::unique(),
    );
    cell.notify_subscribers(&"test");
    assert_eq!(*notified.read().unwrap(), Some("test"));
}

#[test]
fn set_fires_value_changed_with_new_value() {
    let cell = ObservableCell::new(1);
    let notified = Arc::new(RwLock::new(Vec::new()));
    cell.subscribe(
        {
            let notified = Arc::clone(&notified);
            move |value: &i32| notified.write().unwrap().push(*value)
        },
        SubscriberId::unique(),
    );
    cell.set(2);
    cell.set(3);
    assert_eq!(*notified.read().unwrap(), vec![2, 3]);
    assert_eq!(cell.value(), 3);
}

#[test]
fn before_value_changed_carries_old_value() {
    let cell = ObservableCell::new("old");
    let seen = Arc::new(RwLock::new(None));
    cell.subscribe_channel(
        {
            let seen = Arc::clone(&seen);
            move |value: &&str| *seen.write().unwrap() = Some(*value)
        },
        Channel::BeforeValueChanged,
        SubscriberId::unique(),
    );
    cell.set("new");
    assert_eq!(*seen.read().unwrap(), Some("old"));
}

#[test]
fn disposed_subscription_is_not_notified() {
    let cell = ObservableCell::new("initVal");
    let notified = Arc::new(RwLock::new(None));
    let subscription = cell.subscribe(
        {
            let notified = Arc::clone(&notified);
            move |value: &&str| *notified.write().unwrap() = Some(*value)
        },
        SubscriberId::unique(),
    );
    subscription.dispose();
    cell.notify_subscribers(&"test");
    assert_eq!(*notified.read().unwrap(), None);
}

#[test]
fn unsubscribing_mid_pass_prevents_later_delivery() {
    let cell = ObservableCell::<&str>::default();
    let second: Arc<RwLock<Option<SubscriptionHandle>>> = Arc::new(RwLock::new(None));
    let second_was_notified = Arc::new(RwLock::new(false));
    cell.subscribe(
        {
            let second = Arc::clone(&second);
            move |_: &&str| {
                if let Some(handle) = second.read().unwrap().as_ref() {
                    handle.dispose();
                }
            }
        },
        SubscriberId::unique(),
    );
    let handle = cell.subscribe(
        {
            let second_was_notified = Arc::clone(&second_was_notified);
            move |_: &&str| *second_was_notified.write().unwrap() = true
        },
        SubscriberId::unique(),
    );
    *second.write().unwrap() = Some(handle);
    cell.notify_subscribers(&"ignore");
    assert!(!*second_was_notified.read().unwrap());
}

#[test]
fn custom_channels_are_independent() {
    let cell = ObservableCell::new("initVal");
    let notified = Arc::new(RwLock::new(None));
    cell.subscribe_channel(
        {
            let notified = Arc::clone(&notified);
            move |value: &&str| *notified.write().unwrap() = Some(*value)
        },
        Channel::Custom("myEvent"),
        SubscriberId::unique(),
    );
    cell.notify_channel(&"bla", Channel::Custom("undefinedEvent"));
    assert_eq!(*notified.read().unwrap(), None);
    // the default channel does not reach a custom subscriber either
    cell.notify_subscribers(&"ignore");
    assert_eq!(*notified.read().unwrap(), None);
    cell.notify_channel(&"expected", Channel::Custom("myEvent"));
    assert_eq!(*notified.read().unwrap(), Some("expected"));
}

#[test]
fn subscribers_are_notified_in_registration_order() {
    let cell = ObservableCell::new(0);
    let order = Arc::new(RwLock::new(Vec::new()));
    for label in ["first", "second", "third"] {
        cell.subscribe(
            {
                let order = Arc::clone(&order);
                move |_: &i32| order.write().unwrap().push(label)
            },
            SubscriberId::unique(),
        );
    }
    cell.set(1);
    assert_eq!(*order.read().unwrap(), vec!["first", "second", "third"]);
}

#[test]
fn mirrored_cells_settle_without_looping() {
    let first = ObservableCell::new("initVal1");
    let second = ObservableCell::new("initVal2");
    let first_notified = Arc::new(RwLock::new(0));
    let second_notified = Arc::new(RwLock::new(0));
    first.subscribe(
        {
            let second = second.clone();
            let count = Arc::clone(&first_notified);
            move |value: &&str| {
                *count.write().unwrap() += 1;
                second.set(*value);
            }
        },
        second.subscriber_id(),
    );
    second.subscribe(
        {
            let first = first.clone();
            let count = Arc::clone(&second_notified);
            move |value: &&str| {
                *count.write().unwrap() += 1;
                first.set(*value);
            }
        },
        first.subscriber_id(),
    );
    assert_eq!(*first_notified.read().unwrap(), 0);
    assert_eq!(*second_notified.read().unwrap(), 0);

    first.set("don't loop!");
    assert_eq!(first.value(), "don't loop!");
    assert_eq!(second.value(), "don't loop!");
    assert_eq!(*first_notified.read().unwrap(), 1);
    assert_eq!(*second_notified.read().unwrap(), 0);
}

#[test]
fn peek_reads_without_notifying_anyone() {
    let cell = ObservableCell::new(5);
    assert_eq!(cell.peek(), 5);
    assert_eq!(cell.subscription_count(), 0);
    assert!(!cell.has_subscribers());
}

#[test]
fn subscription_counts_ignore_disposed_entries() {
    let cell = ObservableCell::new(0);
    let keep = cell.subscribe(|_: &i32| {}, SubscriberId::unique());
    let drop_me = cell.subscribe(|_: &i32| {}, SubscriberId::unique());
    assert_eq!(cell.subscription_count(), 2);
    assert!(cell.has_channel_subscribers(Channel::ValueChanged));
    drop_me.dispose();
    assert_eq!(cell.subscription_count(), 1);
    keep.dispose();
    assert!(!cell.has_subscribers());
}
