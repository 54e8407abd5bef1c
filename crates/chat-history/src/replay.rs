//! Scripted replay of history operations.
//!
//! A script is a JSON array of steps tagged by `op`, for example:
//!
//! ```json
//! [
//!   {"op": "seed", "messages": [{"db_id": "a", "time_micros": 10, "text": "hi"}]},
//!   {"op": "update", "messages": [{"db_id": "b", "time_micros": 20}], "deletions": ["a"]},
//!   {"op": "latest", "limit": 5}
//! ]
//! ```
//!
//! Steps are applied in order to one [`MemoryHistoryStorage`] and their results
//! are written as JSON lines, one [`ReplayOutput`] per line. Batch events are
//! written while the batch is applied, so a failed write aborts the batch the
//! same way a UI sink would.

use std::collections::HashSet;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ReplayError, SinkError};
use crate::event::HistoryEvent;
use crate::memory::MemoryHistoryStorage;
use crate::message::{HistoryId, Message};
use crate::sink;
use crate::storage::HistoryStorage;

/// One scripted operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReplayStep {
    /// Replace the store with one holding `messages`.
    Seed { messages: Vec<Message> },

    /// Prepend an older page.
    Prepend {
        messages: Vec<Message>,
        #[serde(default)]
        has_more: bool,
    },

    /// Apply a server batch.
    Update {
        #[serde(default)]
        messages: Vec<Message>,
        #[serde(default)]
        deletions: HashSet<String>,
    },

    /// Read the newest page.
    Latest {
        #[serde(default)]
        limit: Option<usize>,
    },

    /// Read the page before `anchor`.
    Before {
        anchor: HistoryId,
        #[serde(default)]
        limit: Option<usize>,
    },
}

impl ReplayStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Seed { .. } => "seed",
            Self::Prepend { .. } => "prepend",
            Self::Update { .. } => "update",
            Self::Latest { .. } => "latest",
            Self::Before { .. } => "before",
        }
    }
}

/// One output line, tagged by `output` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "output", rename_all = "snake_case")]
pub enum ReplayOutput {
    Seeded {
        step: usize,
        count: usize,
        major_version: i64,
    },
    Prepended {
        step: usize,
        count: usize,
        reached_end: bool,
    },
    Event {
        step: usize,
        event: HistoryEvent,
    },
    Page {
        step: usize,
        messages: Vec<Message>,
    },
    AnchorNotFound {
        step: usize,
        anchor: HistoryId,
    },
}

/// Parse a replay script.
pub fn parse_script<R: Read>(reader: R) -> Result<Vec<ReplayStep>, ReplayError> {
    Ok(serde_json::from_reader(reader)?)
}

fn write_line<W: Write>(out: &mut W, output: &ReplayOutput) -> Result<(), ReplayError> {
    serde_json::to_writer(&mut *out, output).map_err(std::io::Error::from)?;
    out.write_all(b"\n")?;
    Ok(())
}

/// Applies replay steps to a store and writes the results to `out`.
pub struct Replayer<W> {
    store: MemoryHistoryStorage,
    page_size: usize,
    out: W,
}

impl<W: Write> Replayer<W> {
    pub fn new(out: W, page_size: usize) -> Self {
        Self {
            store: MemoryHistoryStorage::new(),
            page_size,
            out,
        }
    }

    pub fn store(&self) -> &MemoryHistoryStorage {
        &self.store
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Apply every step in order, stopping at the first failure.
    pub fn run(&mut self, steps: Vec<ReplayStep>) -> Result<(), ReplayError> {
        let total = steps.len();
        for (index, step) in steps.into_iter().enumerate() {
            self.apply(index, step)?;
        }
        self.out.flush()?;
        info!(steps = total, cached = self.store.len(), "replay finished");
        Ok(())
    }

    pub fn apply(&mut self, step: usize, op: ReplayStep) -> Result<(), ReplayError> {
        debug!(step, op = op.name(), "replaying step");

        match op {
            ReplayStep::Seed { messages } => {
                self.store = MemoryHistoryStorage::with_messages(messages);
                let output = ReplayOutput::Seeded {
                    step,
                    count: self.store.len(),
                    major_version: self.store.major_version(),
                };
                write_line(&mut self.out, &output)
            }
            ReplayStep::Prepend { messages, has_more } => {
                let count = messages.len();
                self.store.receive_history_before(messages, has_more);
                let output = ReplayOutput::Prepended {
                    step,
                    count,
                    reached_end: self.store.reached_history_end(),
                };
                write_line(&mut self.out, &output)
            }
            ReplayStep::Update {
                messages,
                deletions,
            } => {
                let out = &mut self.out;
                let mut sink = sink::from_fn(|event| {
                    write_line(&mut *out, &ReplayOutput::Event { step, event })
                        .map_err(|err| SinkError::Rejected(err.to_string()))
                });
                self.store
                    .receive_history_update(messages, &deletions, &mut sink)
                    .map_err(|source| ReplayError::Sink { step, source })
            }
            ReplayStep::Latest { limit } => {
                let messages = self.store.get_latest(limit.unwrap_or(self.page_size));
                write_line(&mut self.out, &ReplayOutput::Page { step, messages })
            }
            ReplayStep::Before { anchor, limit } => {
                let output = match self
                    .store
                    .get_before(&anchor, limit.unwrap_or(self.page_size))
                {
                    Some(messages) => ReplayOutput::Page { step, messages },
                    None => ReplayOutput::AnchorNotFound { step, anchor },
                };
                write_line(&mut self.out, &output)
            }
        }
    }
}
