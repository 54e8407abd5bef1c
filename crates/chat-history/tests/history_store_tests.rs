//! History store integration tests.

use std::sync::mpsc;

use chat_history::{
    HistoryEvent, HistoryId, HistoryStorage, MemoryHistoryStorage, SinkError, sink,
};

mod common;
use common::{apply, deletions, event_time, ids, msg};

fn boxed(messages: Vec<chat_history::Message>) -> Box<dyn HistoryStorage> {
    Box::new(MemoryHistoryStorage::with_messages(messages))
}

/// Scroll back twice, then page through what was loaded.
#[test]
fn test_scroll_back_then_paginate() {
    let mut store = boxed(vec![msg(100, "m10"), msg(110, "m11")]);

    store.receive_history_before(vec![msg(80, "m8"), msg(90, "m9")], true);
    store.receive_history_before(vec![msg(60, "m6"), msg(70, "m7")], false);
    assert!(store.reached_history_end());

    assert_eq!(ids(&store.get_latest(3)), ["m9", "m10", "m11"]);

    let page = store.get_before(&HistoryId::new(90, "m9"), 2).unwrap();
    assert_eq!(ids(&page), ["m7", "m8"]);

    let page = store.get_before(&HistoryId::new(70, "m7"), 2).unwrap();
    assert_eq!(ids(&page), ["m6"]);

    let page = store.get_before(&HistoryId::new(60, "m6"), 2).unwrap();
    assert!(page.is_empty());
}

#[test]
fn test_get_latest_sizes() {
    let store = boxed((1..=5).map(|t| msg(t * 10, &format!("m{t}"))).collect());
    for k in 0..8 {
        let page = store.get_latest(k);
        assert_eq!(page.len(), k.min(5));
        assert_eq!(page.as_slice(), &store.get_latest(5)[5 - k.min(5)..]);
    }
}

#[test]
fn test_get_before_edges() {
    let empty = boxed(Vec::new());
    assert_eq!(empty.get_before(&HistoryId::new(10, "x"), 5), Some(Vec::new()));

    let store = boxed(vec![msg(10, "a"), msg(20, "b")]);
    assert_eq!(store.get_before(&HistoryId::new(1, "x"), 5), Some(Vec::new()));
    assert_eq!(store.get_before(&HistoryId::new(15, "x"), 5), None);
}

/// Worked examples for each merge case.
#[test]
fn test_merge_examples() {
    // Replace.
    let mut store = boxed(vec![msg(10, "A"), msg(20, "B")]);
    let events = apply(store.as_mut(), vec![msg(20, "B2")], &[]);
    assert_eq!(ids(&store.get_latest(10)), ["A", "B2"]);
    assert_eq!(
        events,
        vec![
            HistoryEvent::Changed {
                message: msg(20, "B2")
            },
            HistoryEvent::EndOfBatch
        ]
    );

    // Insert before an anchor.
    let mut store = boxed(vec![msg(10, "A"), msg(30, "C")]);
    let events = apply(store.as_mut(), vec![msg(20, "X")], &[]);
    assert_eq!(ids(&store.get_latest(10)), ["A", "X", "C"]);
    assert_eq!(
        events[0],
        HistoryEvent::Added {
            message: msg(20, "X"),
            before: Some(HistoryId::new(30, "C")),
        }
    );

    // Drop before the first cached message.
    let mut store = boxed(vec![msg(30, "C")]);
    let events = apply(store.as_mut(), vec![msg(5, "X")], &[]);
    assert_eq!(ids(&store.get_latest(10)), ["C"]);
    assert_eq!(events, vec![HistoryEvent::EndOfBatch]);

    // Tail append.
    let mut store = boxed(vec![msg(10, "A")]);
    let events = apply(store.as_mut(), vec![msg(50, "Z")], &[]);
    assert_eq!(ids(&store.get_latest(10)), ["A", "Z"]);
    assert_eq!(
        events[0],
        HistoryEvent::Added {
            message: msg(50, "Z"),
            before: None,
        }
    );
}

#[test]
fn test_empty_batch_is_idempotent() {
    let mut store = boxed(vec![msg(10, "a"), msg(20, "b")]);
    for _ in 0..3 {
        let events = apply(store.as_mut(), Vec::new(), &[]);
        assert_eq!(events, vec![HistoryEvent::EndOfBatch]);
    }
    assert_eq!(ids(&store.get_latest(10)), ["a", "b"]);
}

#[test]
fn test_deletion_events() {
    let mut store = boxed(vec![msg(10, "a"), msg(20, "b"), msg(30, "c")]);
    let events = apply(store.as_mut(), Vec::new(), &["b", "ghost"]);
    assert_eq!(
        events,
        vec![
            HistoryEvent::Deleted { id: "b".into() },
            HistoryEvent::EndOfBatch
        ]
    );

    let events = apply(store.as_mut(), Vec::new(), &["a", "c"]);
    assert_eq!(events.len(), 3);
    assert!(store.get_latest(10).is_empty());
}

/// Deleted events come first, merge events follow in time order, one end marker.
#[test]
fn test_batch_event_sequencing() {
    let mut store = boxed((1..=10).map(|t| msg(t * 10, &format!("m{t}"))).collect());
    let events = apply(
        store.as_mut(),
        vec![
            msg(5, "early"),
            msg(25, "x"),
            msg(40, "m4-edit"),
            msg(45, "y"),
            msg(100, "m10-edit"),
            msg(120, "tail1"),
            msg(130, "tail2"),
        ],
        &["m2", "m5", "m9"],
    );

    let first_merge = events
        .iter()
        .position(|e| !matches!(e, HistoryEvent::Deleted { .. }))
        .unwrap();
    assert_eq!(first_merge, 3);
    assert!(
        events[first_merge..]
            .iter()
            .all(|e| !matches!(e, HistoryEvent::Deleted { .. }))
    );
    assert_eq!(events.iter().filter(|e| e.is_end_of_batch()).count(), 1);
    assert!(events.last().unwrap().is_end_of_batch());

    let times: Vec<i64> = events.iter().filter_map(event_time).collect();
    assert_eq!(times, [25, 40, 45, 100, 120, 130]);

    let latest = store.get_latest(100);
    assert_eq!(
        ids(&latest),
        [
            "m1", "x", "m3", "m4-edit", "y", "m6", "m7", "m8", "m10-edit", "tail1", "tail2"
        ]
    );
}

/// Small deterministic generator so the ordering test needs no extra crates.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

#[test]
fn test_cache_stays_sorted_across_batches() {
    let mut rng = Lcg(7);
    let mut store = boxed(vec![msg(500, "seed")]);

    for round in 0..50 {
        let cached = store.get_latest(usize::MAX);

        let mut times: Vec<i64> = (0..rng.next(6)).map(|_| rng.next(1000) as i64).collect();
        times.sort_unstable();
        times.dedup();
        let updates = times
            .iter()
            .map(|t| msg(*t, &format!("r{round}-{t}")))
            .collect();

        let doomed: Vec<String> = cached
            .iter()
            .filter(|_| rng.next(5) == 0)
            .map(|m| m.db_id.clone())
            .collect();
        let doomed: Vec<&str> = doomed.iter().map(String::as_str).collect();

        let events = apply(store.as_mut(), updates, &doomed);
        assert!(events.last().unwrap().is_end_of_batch());

        let after = store.get_latest(usize::MAX);
        assert!(
            after
                .windows(2)
                .all(|w| w[0].time_micros < w[1].time_micros),
            "round {round}: cache out of order"
        );
    }
}

#[test]
fn test_sink_failure_stops_batch() {
    let mut store = boxed(vec![msg(10, "a"), msg(20, "b"), msg(30, "c")]);
    let mut seen = Vec::new();
    let mut failing = sink::from_fn(|event| {
        if let HistoryEvent::Deleted { id } = &event
            && id == "b"
        {
            return Err(SinkError::Rejected("list detached".into()));
        }
        seen.push(event);
        Ok(())
    });

    let result =
        store.receive_history_update(vec![msg(40, "d")], &deletions(&["a", "b"]), &mut failing);
    drop(failing);

    assert_eq!(result, Err(SinkError::Rejected("list detached".into())));
    assert_eq!(seen, vec![HistoryEvent::Deleted { id: "a".into() }]);
    assert_eq!(ids(&store.get_latest(10)), ["c"]);
}

/// A UI thread can consume events through a channel.
#[test]
fn test_channel_sink_across_threads() {
    let (mut tx, rx) = mpsc::channel::<HistoryEvent>();
    let ui = std::thread::spawn(move || rx.iter().take_while(|e| !e.is_end_of_batch()).count());

    let mut store = MemoryHistoryStorage::with_messages(vec![msg(10, "a")]);
    store
        .receive_history_update(
            vec![msg(20, "b"), msg(30, "c")],
            &deletions(&["a"]),
            &mut tx,
        )
        .unwrap();

    assert_eq!(ui.join().unwrap(), 3);
    assert_eq!(ids(store.messages()), ["b", "c"]);
}

#[test]
fn test_closed_channel_aborts() {
    let (mut tx, rx) = mpsc::channel::<HistoryEvent>();
    drop(rx);
    let mut store = MemoryHistoryStorage::with_messages(vec![msg(10, "a")]);
    let result = store.receive_history_update(vec![msg(20, "b")], &deletions(&[]), &mut tx);
    assert_eq!(result, Err(SinkError::Closed));
    assert_eq!(ids(store.messages()), ["a"]);
}

#[test]
fn test_version_differs_per_instance() {
    let first = MemoryHistoryStorage::new();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let second = MemoryHistoryStorage::new();
    assert_ne!(first.major_version(), second.major_version());
}
