//! Receivers for history change notifications.
//!
//! The store calls the sink synchronously, in emission order, before
//! `receive_history_update` returns. The sink is borrowed mutably for the
//! whole batch, so it cannot reach back into the store.

use std::sync::mpsc;

use crate::error::SinkError;
use crate::event::HistoryEvent;

/// Receives the events of one history batch.
pub trait HistorySink {
    /// Handle one event. Returning an error aborts the batch.
    fn on_event(&mut self, event: HistoryEvent) -> Result<(), SinkError>;
}

/// Collects every event; never fails.
impl HistorySink for Vec<HistoryEvent> {
    fn on_event(&mut self, event: HistoryEvent) -> Result<(), SinkError> {
        self.push(event);
        Ok(())
    }
}

/// Forwards events to another thread. Fails once the receiver is dropped.
impl HistorySink for mpsc::Sender<HistoryEvent> {
    fn on_event(&mut self, event: HistoryEvent) -> Result<(), SinkError> {
        self.send(event).map_err(|_| SinkError::Closed)
    }
}

/// Sink backed by a closure. Built with [`from_fn`].
pub struct FnSink<F> {
    f: F,
}

impl<F> HistorySink for FnSink<F>
where
    F: FnMut(HistoryEvent) -> Result<(), SinkError>,
{
    fn on_event(&mut self, event: HistoryEvent) -> Result<(), SinkError> {
        (self.f)(event)
    }
}

/// Wrap a closure as a [`HistorySink`].
pub fn from_fn<F>(f: F) -> FnSink<F>
where
    F: FnMut(HistoryEvent) -> Result<(), SinkError>,
{
    FnSink { f }
}
