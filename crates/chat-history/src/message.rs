//! Cached message types.
//!
//! A message is addressed by its [`HistoryId`]: the server timestamp in
//! microseconds plus the persistent database id. Reconciliation treats two
//! messages with the same timestamp as the same slot in the conversation, so
//! the timestamp alone is the merge key while the full id is used for
//! deletion and pagination lookups.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Compound key addressing one message in the history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryId {
    /// Server timestamp, microseconds since the Unix epoch.
    pub time_micros: i64,

    /// Persistent server-side id.
    pub db_id: String,
}

impl HistoryId {
    pub fn new(time_micros: i64, db_id: impl Into<String>) -> Self {
        Self {
            time_micros,
            db_id: db_id.into(),
        }
    }
}

impl fmt::Display for HistoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.time_micros, self.db_id)
    }
}

/// A message as cached by the history store.
///
/// Messages are values: an edit from the server arrives as a new `Message`
/// with the same timestamp and replaces the cached one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Persistent server-side id.
    pub db_id: String,

    /// Server timestamp, microseconds since the Unix epoch.
    pub time_micros: i64,

    /// Display name of whoever sent the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,

    /// Message body.
    #[serde(default)]
    pub text: String,

    /// Attachments, quotes and other extras (forward-compatible).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Message {
    /// Create a plain text message.
    pub fn new(db_id: impl Into<String>, time_micros: i64, text: impl Into<String>) -> Self {
        Self {
            db_id: db_id.into(),
            time_micros,
            sender: None,
            text: text.into(),
            metadata: None,
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// The key this message is addressed by.
    pub fn history_id(&self) -> HistoryId {
        HistoryId::new(self.time_micros, self.db_id.clone())
    }

    /// Whether this message is the one `id` points at.
    pub fn is(&self, id: &HistoryId) -> bool {
        self.time_micros == id.time_micros && self.db_id == id.db_id
    }
}
