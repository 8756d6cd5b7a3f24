use ahash::AHashMap;

use crate::{
    error::{SourceError, WriteError},
    event::{Event, RawEvent},
};

/// Provider of input tables
pub trait EventSource {
    /// Load all rows of the named table in their stored order
    fn read_table(&mut self, name: &str) -> Result<Vec<RawEvent>, SourceError>;
}

/// Destination of output chunks
pub trait BatchSink {
    /// Persist `events` as one unit called `name`, replacing any
    /// previous unit of that name
    fn store(&mut self, name: &str, events: &[Event]) -> Result<(), WriteError>;
}

impl EventSource for AHashMap<String, Vec<RawEvent>> {
    fn read_table(&mut self, name: &str) -> Result<Vec<RawEvent>, SourceError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(name.to_owned()))
    }
}

impl BatchSink for Vec<(String, Vec<Event>)> {
    fn store(&mut self, name: &str, events: &[Event]) -> Result<(), WriteError> {
        self.retain(|(n, _)| n != name);
        self.push((name.to_owned(), events.to_vec()));
        Ok(())
    }
}

impl<T: EventSource + ?Sized> EventSource for &mut T {
    fn read_table(&mut self, name: &str) -> Result<Vec<RawEvent>, SourceError> {
        (**self).read_table(name)
    }
}

impl<T: BatchSink + ?Sized> BatchSink for &mut T {
    fn store(&mut self, name: &str, events: &[Event]) -> Result<(), WriteError> {
        (**self).store(name, events)
    }
}
