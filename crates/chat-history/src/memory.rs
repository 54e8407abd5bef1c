//! In-memory history storage.
//!
//! Keeps the cached conversation as a vector ascending by `time_micros` and
//! folds server batches into it. Nothing survives the process; the major
//! version is taken from the wall clock at construction so every instance
//! looks like a fresh store to the caller.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::error::SinkError;
use crate::event::HistoryEvent;
use crate::message::{HistoryId, Message};
use crate::sink::HistorySink;
use crate::storage::HistoryStorage;

/// Per-batch counters, logged when the batch completes.
#[derive(Debug, Default)]
struct BatchStats {
    deleted: usize,
    changed: usize,
    added: usize,
    dropped: usize,
}

/// History storage that lives only as long as the session.
#[derive(Debug, Clone)]
pub struct MemoryHistoryStorage {
    major_version: i64,
    messages: Vec<Message>,
    reached_history_end: bool,
}

impl Default for MemoryHistoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHistoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::with_messages(Vec::new())
    }

    /// Create a store pre-seeded with `messages`, which must already be
    /// ascending by timestamp.
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            major_version: chrono::Utc::now().timestamp_micros(),
            messages,
            reached_history_end: false,
        }
    }

    /// Cached messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Remove every cached message whose id is in `deletions`.
    ///
    /// Each removal is applied before its event is emitted. On a sink error
    /// the entries not yet visited are put back untouched.
    fn delete_from_history(
        &mut self,
        deletions: &HashSet<String>,
        sink: &mut dyn HistorySink,
        stats: &mut BatchStats,
    ) -> Result<(), SinkError> {
        if deletions.is_empty() {
            return Ok(());
        }

        let cached = std::mem::take(&mut self.messages);
        let mut kept = Vec::with_capacity(cached.len());
        let mut remaining = cached.into_iter();

        while let Some(message) = remaining.next() {
            if !deletions.contains(&message.db_id) {
                kept.push(message);
                continue;
            }

            if let Err(err) = emit(sink, HistoryEvent::Deleted { id: message.db_id }) {
                kept.extend(remaining);
                self.messages = kept;
                return Err(err);
            }
            stats.deleted += 1;
        }

        self.messages = kept;
        Ok(())
    }

    /// Merge `updates` into the cache by timestamp.
    ///
    /// Updates older than the first cached message have no anchor to be
    /// inserted before and are dropped. An update with the same timestamp as a
    /// cached message replaces it. Updates newer than everything cached are
    /// appended at the tail. The cache is only replaced once the whole merge
    /// has been reported.
    fn merge_history_changes(
        &mut self,
        updates: Vec<Message>,
        sink: &mut dyn HistorySink,
        stats: &mut BatchStats,
    ) -> Result<(), SinkError> {
        if updates.is_empty() {
            return Ok(());
        }

        let mut result = Vec::with_capacity(self.messages.len() + updates.len());
        let mut updates = updates.into_iter().peekable();

        for cached in &self.messages {
            while let Some(update) = updates.next_if(|u| u.time_micros < cached.time_micros) {
                if result.is_empty() {
                    debug!(
                        db_id = %update.db_id,
                        time_micros = update.time_micros,
                        "dropping update older than cached history"
                    );
                    stats.dropped += 1;
                    continue;
                }

                emit(
                    sink,
                    HistoryEvent::Added {
                        message: update.clone(),
                        before: Some(cached.history_id()),
                    },
                )?;
                stats.added += 1;
                result.push(update);
            }

            match updates.next_if(|u| u.time_micros == cached.time_micros) {
                Some(update) => {
                    emit(
                        sink,
                        HistoryEvent::Changed {
                            message: update.clone(),
                        },
                    )?;
                    stats.changed += 1;
                    result.push(update);
                }
                None => result.push(cached.clone()),
            }
        }

        for update in updates {
            emit(
                sink,
                HistoryEvent::Added {
                    message: update.clone(),
                    before: None,
                },
            )?;
            stats.added += 1;
            result.push(update);
        }

        self.messages = result;
        Ok(())
    }
}

fn emit(sink: &mut dyn HistorySink, event: HistoryEvent) -> Result<(), SinkError> {
    trace!(kind = event.kind(), "history event");
    sink.on_event(event)
}

impl HistoryStorage for MemoryHistoryStorage {
    fn major_version(&self) -> i64 {
        self.major_version
    }

    fn set_reached_history_end(&mut self, reached: bool) {
        if reached {
            self.reached_history_end = true;
        }
    }

    fn reached_history_end(&self) -> bool {
        self.reached_history_end
    }

    fn get_latest(&self, limit: usize) -> Vec<Message> {
        let start = self.messages.len().saturating_sub(limit);
        self.messages[start..].to_vec()
    }

    fn get_before(&self, anchor: &HistoryId, limit: usize) -> Option<Vec<Message>> {
        // Addressed against a freshly sorted copy; pages prepended by the
        // network layer are not checked for order.
        let mut sorted = self.messages.clone();
        sorted.sort_by_key(|m| m.time_micros);

        match sorted.first() {
            None => return Some(Vec::new()),
            Some(first) if first.time_micros > anchor.time_micros => return Some(Vec::new()),
            Some(_) => {}
        }

        let Some(index) = sorted.iter().position(|m| m.is(anchor)) else {
            debug!(anchor = %anchor, "anchor not found in cached history");
            return None;
        };

        let start = index.saturating_sub(limit);
        sorted.truncate(index);
        sorted.drain(..start);
        Some(sorted)
    }

    fn receive_history_before(&mut self, page: Vec<Message>, has_more: bool) {
        if !has_more {
            self.reached_history_end = true;
        }

        debug!(
            received = page.len(),
            cached = self.messages.len(),
            has_more,
            "prepending older history"
        );

        let mut messages = page;
        messages.append(&mut self.messages);
        self.messages = messages;
    }

    fn receive_history_update(
        &mut self,
        updates: Vec<Message>,
        deletions: &HashSet<String>,
        sink: &mut dyn HistorySink,
    ) -> Result<(), SinkError> {
        let _span = tracing::debug_span!(
            "history_update",
            updates = updates.len(),
            deletions = deletions.len()
        )
        .entered();

        let mut stats = BatchStats::default();
        self.delete_from_history(deletions, sink, &mut stats)?;
        self.merge_history_changes(updates, sink, &mut stats)?;
        emit(sink, HistoryEvent::EndOfBatch)?;

        debug!(
            deleted = stats.deleted,
            changed = stats.changed,
            added = stats.added,
            dropped = stats.dropped,
            cached = self.messages.len(),
            "history batch applied"
        );
        Ok(())
    }
}
