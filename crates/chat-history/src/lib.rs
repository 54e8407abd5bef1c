//! Local message history for a chat client.
//!
//! The store keeps a time-ordered cache of one conversation and reconciles it
//! against changes pushed by the server:
//!
//! ```text
//! network layer --[older pages]--> HistoryStorage --[HistoryEvent stream]--> UI
//!               --[batches: updates + deletions]-->
//! ```
//!
//! Older pages fetched on scroll-back are prepended silently. Live batches are
//! applied in two phases, deletions then a timestamp-keyed merge, and every
//! resulting change is reported to a [`HistorySink`] followed by a single
//! [`HistoryEvent::EndOfBatch`].
//!
//! ## Ordering rules
//!
//! 1. **Timestamps are the merge key.** An update with the same `time_micros`
//!    as a cached message replaces it; the database id is only used for
//!    deletion and pagination.
//! 2. **Nothing is inserted before the oldest cached message.** There is no
//!    anchor to insert it before, so such updates are dropped.
//! 3. **Newer messages go to the tail** and are reported without an anchor.

pub mod config;
pub mod error;
pub mod event;
pub mod fatal;
pub mod memory;
pub mod message;
pub mod replay;
pub mod sink;
pub mod storage;

pub use config::HistoryConfig;
pub use error::{ConfigError, ReplayError, SinkError};
pub use event::HistoryEvent;
pub use fatal::{FatalError, FatalErrorHandler, FatalErrorKind};
pub use memory::MemoryHistoryStorage;
pub use message::{HistoryId, Message};
pub use sink::HistorySink;
pub use storage::HistoryStorage;
