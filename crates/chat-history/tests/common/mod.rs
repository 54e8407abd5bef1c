//! Test utilities and common setup.
#![allow(dead_code)]

use std::collections::HashSet;

use chat_history::{HistoryEvent, HistoryStorage, Message};

/// Message with a predictable body.
pub fn msg(time_micros: i64, id: &str) -> Message {
    Message::new(id, time_micros, format!("body {id}")).with_sender("operator")
}

pub fn ids(messages: &[Message]) -> Vec<String> {
    messages.iter().map(|m| m.db_id.clone()).collect()
}

pub fn deletions(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

/// Apply a batch and collect the events it produced.
pub fn apply(
    store: &mut dyn HistoryStorage,
    updates: Vec<Message>,
    deleted: &[&str],
) -> Vec<HistoryEvent> {
    let mut events = Vec::new();
    store
        .receive_history_update(updates, &deletions(deleted), &mut events)
        .unwrap();
    events
}

/// Timestamp an event refers to, if any.
pub fn event_time(event: &HistoryEvent) -> Option<i64> {
    match event {
        HistoryEvent::Changed { message } | HistoryEvent::Added { message, .. } => {
            Some(message.time_micros)
        }
        HistoryEvent::Deleted { .. } | HistoryEvent::EndOfBatch => None,
    }
}
