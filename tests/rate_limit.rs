use reactive_cells::prelude::*;
use std::{
    sync::{Arc, RwLock},
    thread::sleep,
    time::Duration,
};

const WINDOW: Duration = Duration::from_millis(300);
/// Comfortably longer than [`WINDOW`], so a pending timer has fired by the
/// time we assert.
const SETTLE: Duration = Duration::from_millis(500);
const HALF: Duration = Duration::from_millis(150);

type Spy<T> = Arc<RwLock<Vec<T>>>;

fn spy<T>() -> Spy<T> {
    Arc::new(RwLock::new(Vec::new()))
}

fn record<T: Clone + Send + Sync + 'static>(seen: &Spy<T>) -> impl Fn(&T) + Send + Sync + 'static {
    let seen = Arc::clone(seen);
    move |value: &T| seen.write().unwrap().push(value.clone())
}

fn normalized<T>(mut changes: Vec<SequenceChange<T>>) -> Vec<SequenceChange<T>> {
    changes.sort_by_key(|change| (change.index, matches!(change.kind, ChangeKind::Add)));
    changes
}

#[test]
fn notification_waits_for_a_quiet_window() {
    let seen = spy();
    let cell = ObservableCell::<&str>::default().rate_limit(WINDOW);
    cell.subscribe(record(&seen), SubscriberId::unique());

    cell.set("A");
    assert!(seen.read().unwrap().is_empty());
    assert_eq!(cell.value(), "A");

    sleep(HALF);
    cell.set("B");
    assert_eq!(cell.value(), "B");
    assert!(seen.read().unwrap().is_empty());

    // the second write restarted the window, so nothing has fired yet
    sleep(HALF);
    assert!(seen.read().unwrap().is_empty());

    sleep(SETTLE);
    assert_eq!(*seen.read().unwrap(), vec!["B"]);
}

#[test]
fn reverting_to_the_original_value_notifies_nothing() {
    let seen = spy();
    let cell = ObservableCell::new("Z").rate_limit(WINDOW);
    cell.subscribe(record(&seen), SubscriberId::unique());

    cell.set("A");
    assert_eq!(cell.value(), "A");
    sleep(HALF);
    cell.set("B");
    assert_eq!(cell.value(), "B");
    sleep(HALF);
    cell.set("Z");
    sleep(SETTLE);
    sleep(HALF);
    assert!(seen.read().unwrap().is_empty());
}

#[test]
fn writing_from_a_notification_starts_a_new_window() {
    let seen = spy();
    let cell = ObservableCell::new("Z").rate_limit(WINDOW);
    cell.subscribe(record(&seen), SubscriberId::unique());
    let writer: Arc<RwLock<Option<SubscriptionHandle>>> = Arc::new(RwLock::new(None));
    let handle = cell.subscribe(
        {
            let cell = cell.clone();
            let writer = Arc::clone(&writer);
            move |_: &&str| {
                cell.set("X");
                if let Some(handle) = writer.read().unwrap().as_ref() {
                    handle.dispose();
                }
            }
        },
        SubscriberId::unique(),
    );
    *writer.write().unwrap() = Some(handle);

    cell.set("A");
    assert!(seen.read().unwrap().is_empty());
    assert_eq!(cell.value(), "A");
    sleep(SETTLE);
    assert_eq!(*seen.read().unwrap(), vec!["A"]);
    assert_eq!(cell.value(), "X");
    sleep(SETTLE);
    assert_eq!(*seen.read().unwrap(), vec!["A", "X"]);
}

#[test]
fn before_change_fires_only_on_the_first_write_of_a_burst() {
    let seen = spy();
    let cell = ObservableCell::new("Z").rate_limit(WINDOW);
    cell.subscribe_channel(record(&seen), Channel::BeforeValueChanged, SubscriberId::unique());

    cell.set("A");
    assert_eq!(*seen.read().unwrap(), vec!["Z"]);
    cell.set("B");
    assert_eq!(*seen.read().unwrap(), vec!["Z"]);
}

#[test]
fn rate_limited_computed_coalesces_dependency_changes() {
    let cell = ObservableCell::new("Z");
    let seen = spy();
    let computed = ComputedCell::new({
        let cell = cell.clone();
        move || cell.value()
    })
    .rate_limit(WINDOW);
    computed.subscribe(record(&seen), SubscriberId::unique());

    cell.set("A");
    cell.set("B");
    assert!(seen.read().unwrap().is_empty());
    sleep(SETTLE);
    assert_eq!(*seen.read().unwrap(), vec!["B"]);
}

#[test]
fn rate_limited_computed_buffers_evaluation_but_not_reads() {
    let cell = ObservableCell::new("Z");
    let seen = spy();
    let evaluations = Arc::new(RwLock::new(0));
    let computed = ComputedCell::new({
        let cell = cell.clone();
        let evaluations = Arc::clone(&evaluations);
        move || {
            *evaluations.write().unwrap() += 1;
            cell.value()
        }
    })
    .rate_limit(WINDOW);
    computed.subscribe(record(&seen), SubscriberId::unique());
    assert_eq!(*evaluations.read().unwrap(), 1);

    cell.set("A");
    // evaluation is buffered along with the notification
    assert_eq!(*evaluations.read().unwrap(), 1);
    // but a forced read still sees the fresh value
    assert_eq!(computed.value(), "A");
    assert_eq!(*evaluations.read().unwrap(), 2);
    assert!(seen.read().unwrap().is_empty());

    cell.set("B");
    // peek reflects what was last announced, not what is live
    assert_eq!(computed.peek(), "A");
    assert!(seen.read().unwrap().is_empty());
    assert_eq!(*evaluations.read().unwrap(), 2);

    sleep(SETTLE);
    assert_eq!(*seen.read().unwrap(), vec!["B"]);
    assert_eq!(*evaluations.read().unwrap(), 3);
}

#[test]
fn rate_limited_computed_suppresses_a_net_revert() {
    let seen = spy();
    let cell = ObservableCell::new("original");
    let computed = ComputedCell::new({
        let cell = cell.clone();
        move || cell.value()
    })
    .rate_limit(WINDOW);
    computed.subscribe(record(&seen), SubscriberId::unique());

    cell.set("New");
    assert_eq!(computed.value(), "New");
    assert!(seen.read().unwrap().is_empty());
    cell.set("original");
    sleep(SETTLE);
    assert!(seen.read().unwrap().is_empty());
    assert_eq!(computed.value(), "original");

    cell.set("New");
    sleep(SETTLE);
    assert_eq!(*seen.read().unwrap(), vec!["New"]);
}

#[test]
fn sequence_diff_notification_waits_for_the_window() {
    let list =
        ObservableSequence::new(["A", "B", "C", "D", "E", "F"]).rate_limit(WINDOW);
    let seen: Spy<Vec<SequenceChange<&str>>> = spy();
    list.subscribe_array_change(
        {
            let seen = Arc::clone(&seen);
            move |changes: &[SequenceChange<&str>]| {
                seen.write().unwrap().push(changes.to_vec())
            }
        },
        SubscriberId::unique(),
    );
    list.set(1, "B1");
    assert!(seen.read().unwrap().is_empty());
    sleep(SETTLE);
    let fired = seen.read().unwrap().clone();
    assert_eq!(fired.len(), 1);
    assert_eq!(
        normalized(fired[0].clone()),
        normalized(vec![
            SequenceChange::add(1, "B1"),
            SequenceChange::remove(1, "B"),
        ])
    );
}

#[test]
fn sequence_diffs_merge_per_index_within_a_window() {
    let list =
        ObservableSequence::new(["A", "B", "C", "D", "E", "F"]).rate_limit(WINDOW);
    let seen: Spy<Vec<SequenceChange<&str>>> = spy();
    list.subscribe_array_change(
        {
            let seen = Arc::clone(&seen);
            move |changes: &[SequenceChange<&str>]| {
                seen.write().unwrap().push(changes.to_vec())
            }
        },
        SubscriberId::unique(),
    );
    list.set(1, "B1");
    list.set(3, "D1");
    list.set(1, "B2");
    assert!(seen.read().unwrap().is_empty());
    sleep(SETTLE);
    let fired = seen.read().unwrap().clone();
    assert_eq!(fired.len(), 1);
    assert_eq!(
        normalized(fired[0].clone()),
        normalized(vec![
            SequenceChange::add(1, "B2"),
            SequenceChange::remove(1, "B"),
            SequenceChange::add(3, "D1"),
            SequenceChange::remove(3, "D"),
        ])
    );
}

#[test]
fn sequence_merges_replacements_with_structural_changes() {
    // replacement before/after a structural add or remove, all four orders
    for case in 0..4 {
        let is_add = case > 1;
        let list =
            ObservableSequence::new(["A", "B", "C", "D", "E", "F"]).rate_limit(WINDOW);
        let seen: Spy<Vec<SequenceChange<&str>>> = spy();
        list.subscribe_array_change(
            {
                let seen = Arc::clone(&seen);
                move |changes: &[SequenceChange<&str>]| {
                    seen.write().unwrap().push(changes.to_vec())
                }
            },
            SubscriberId::unique(),
        );
        if case % 2 == 0 {
            list.set(1, "B1");
        }
        if is_add {
            list.push("G");
        } else {
            list.remove_at(5); // remove F
        }
        if case % 2 == 1 {
            list.set(1, "B1");
        }
        assert!(seen.read().unwrap().is_empty());
        sleep(SETTLE);
        let fired = seen.read().unwrap().clone();
        assert_eq!(fired.len(), 1, "case {case}");
        let mut expected = vec![
            SequenceChange::add(1, "B1"),
            SequenceChange::remove(1, "B"),
        ];
        expected.push(if is_add {
            SequenceChange::add(6, "G")
        } else {
            SequenceChange::remove(5, "F")
        });
        assert_eq!(
            normalized(fired[0].clone()),
            normalized(expected),
            "case {case}"
        );
    }
}
