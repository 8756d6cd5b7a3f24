use std::num::NonZeroUsize;

use crate::event::Event;

/// Events collected for one output file
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Chunk {
    /// 0-based chunk number
    pub number: usize,
    pub events: Vec<Event>,
}

/// Bounded accumulator of transformed events
#[derive(Clone, Debug)]
pub struct Batch {
    events: Vec<Event>,
    max_size: NonZeroUsize,
    chunk: usize,
}

impl Batch {
    pub fn new(max_size: NonZeroUsize) -> Self {
        Self {
            events: Vec::new(),
            max_size,
            chunk: 0,
        }
    }

    /// Number of events in the current chunk, which is also the `idx`
    /// the next appended event gets
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.events.len() >= self.max_size.get()
    }

    /// Number of chunks flushed so far
    pub fn flushed(&self) -> usize {
        self.chunk
    }

    pub fn append(&mut self, event: Event) {
        debug_assert!(!self.is_full());
        self.events.push(event);
    }

    /// Hand out the current chunk and start the next one
    pub fn flush(&mut self) -> Chunk {
        let chunk = Chunk {
            number: self.chunk,
            events: std::mem::take(&mut self.events),
        };
        self.chunk += 1;
        chunk
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn fills_and_flushes() {
        let mut batch = Batch::new(size(2));
        assert!(batch.is_empty());
        batch.append(Event::default());
        assert_eq!(batch.len(), 1);
        assert!(!batch.is_full());
        batch.append(Event::default());
        assert!(batch.is_full());

        let chunk = batch.flush();
        assert_eq!(chunk.number, 0);
        assert_eq!(chunk.events.len(), 2);
        assert!(batch.is_empty());
        assert_eq!(batch.flushed(), 1);

        batch.append(Event::default());
        let chunk = batch.flush();
        assert_eq!(chunk.number, 1);
        assert_eq!(chunk.events.len(), 1);
    }

    #[test]
    fn empty_flush_still_numbers_chunk() {
        let mut batch = Batch::new(size(5));
        let chunk = batch.flush();
        assert_eq!(chunk.number, 0);
        assert!(chunk.events.is_empty());
        assert_eq!(batch.flush().number, 1);
    }
}
