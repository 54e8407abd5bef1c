//! The history storage contract shared by the network layer and the UI.

use std::collections::HashSet;

use crate::error::SinkError;
use crate::message::{HistoryId, Message};
use crate::sink::HistorySink;

/// Ordered message history for one chat session.
///
/// Implementations keep messages ascending by `time_micros`. All operations
/// are synchronous; callers serialize access to a single instance.
pub trait HistoryStorage: Send {
    /// Version stamp of this storage instance.
    ///
    /// Stable for the lifetime of the instance. A non-persistent store picks a
    /// fresh value on every construction so callers can tell that cached state
    /// did not survive a restart.
    fn major_version(&self) -> i64;

    /// Record that no older history exists on the server.
    ///
    /// The flag is a one-way latch: passing `false` never clears it.
    fn set_reached_history_end(&mut self, reached: bool);

    /// Whether the oldest message of the conversation is already cached.
    fn reached_history_end(&self) -> bool;

    /// The most recent `limit` messages, oldest first.
    fn get_latest(&self, limit: usize) -> Vec<Message>;

    /// Up to `limit` messages immediately preceding `anchor`, oldest first.
    ///
    /// Returns an empty page when the anchor predates all cached history and
    /// `None` when the anchor is not cached at all.
    fn get_before(&self, anchor: &HistoryId, limit: usize) -> Option<Vec<Message>>;

    /// Prepend a page of messages older than everything cached.
    fn receive_history_before(&mut self, page: Vec<Message>, has_more: bool);

    /// Apply a batch of server changes, reporting each one to `sink`.
    ///
    /// Deletions are applied first, then `updates` are merged by timestamp.
    /// The sink sees one event per change followed by a single
    /// [`EndOfBatch`](crate::event::HistoryEvent::EndOfBatch). A sink error
    /// is returned immediately; changes applied before it are kept.
    fn receive_history_update(
        &mut self,
        updates: Vec<Message>,
        deletions: &HashSet<String>,
        sink: &mut dyn HistorySink,
    ) -> Result<(), SinkError>;
}
