// src/leaves/readings.rs

use crate::common::error::XerxesError;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// What a bounded buffer does with a reading that does not fit.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Overflow {
    /// Make room by discarding the oldest reading.
    DropOldest,
    /// Keep what is buffered and refuse the new reading.
    Reject,
}

/// Per-leaf queue of readings.
///
/// A poll cycle is the only writer; the caller drains it with [`pop`] or
/// [`pop_all`]. The internal lock only makes single operations atomic. If the
/// caller drains while a cycle is still fetching, a reading may land just
/// after the drain; sequencing the two is up to the caller (see
/// [`PollScheduler::wait`](crate::system::PollScheduler::wait)).
///
/// Unbounded unless built with [`ReadingsBuffer::bounded`].
///
/// [`pop`]: ReadingsBuffer::pop
/// [`pop_all`]: ReadingsBuffer::pop_all
#[derive(Debug)]
pub struct ReadingsBuffer<T> {
    readings: Mutex<VecDeque<T>>,
    bound: Option<(usize, Overflow)>,
}

impl<T> ReadingsBuffer<T> {
    pub fn unbounded() -> Self {
        ReadingsBuffer { readings: Mutex::new(VecDeque::new()), bound: None }
    }

    /// Holds at most `capacity` readings (at least one).
    pub fn bounded(capacity: usize, overflow: Overflow) -> Self {
        let capacity = capacity.max(1);
        ReadingsBuffer {
            readings: Mutex::new(VecDeque::with_capacity(capacity)),
            bound: Some((capacity, overflow)),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.bound.map(|(capacity, _)| capacity)
    }

    /// Appends a reading, applying the overflow policy when bounded.
    pub fn push(&self, reading: T) -> Result<(), XerxesError> {
        let mut readings = self.readings.lock();
        if let Some((capacity, overflow)) = self.bound {
            if readings.len() >= capacity {
                match overflow {
                    Overflow::Reject => return Err(XerxesError::BufferFull { capacity }),
                    Overflow::DropOldest => {
                        readings.pop_front();
                    }
                }
            }
        }
        readings.push_back(reading);
        Ok(())
    }

    /// Removes and returns the most recent reading.
    pub fn pop(&self) -> Result<T, XerxesError> {
        self.readings.lock().pop_back().ok_or(XerxesError::EmptyBuffer)
    }

    /// Takes every buffered reading, oldest first, leaving the buffer empty.
    pub fn pop_all(&self) -> Vec<T> {
        let drained = core::mem::take(&mut *self.readings.lock());
        drained.into()
    }

    pub fn len(&self) -> usize {
        self.readings.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.lock().is_empty()
    }
}

impl<T> Default for ReadingsBuffer<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}
