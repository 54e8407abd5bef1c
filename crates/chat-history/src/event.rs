//! Change notifications emitted while reconciling a history batch.
//!
//! A UI replays these in order to update a message list incrementally. Every
//! batch ends with exactly one [`HistoryEvent::EndOfBatch`].

use serde::{Deserialize, Serialize};

use crate::message::{HistoryId, Message};

/// One discrete change to the cached history, tagged by `event` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HistoryEvent {
    /// A cached message was removed.
    Deleted { id: String },

    /// A cached message was replaced by a newer version with the same timestamp.
    Changed { message: Message },

    /// A message was inserted.
    ///
    /// `before` is the message it now precedes, or `None` when it was
    /// appended at the tail.
    Added {
        message: Message,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        before: Option<HistoryId>,
    },

    /// The batch is complete.
    EndOfBatch,
}

impl HistoryEvent {
    /// Tag name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Deleted { .. } => "deleted",
            Self::Changed { .. } => "changed",
            Self::Added { .. } => "added",
            Self::EndOfBatch => "end_of_batch",
        }
    }

    pub fn is_end_of_batch(&self) -> bool {
        matches!(self, Self::EndOfBatch)
    }
}
