//! Double-ended event buffer with lookahead.
//!
//! The emitter buffers a resource's events here so it can look past a
//! mapping key to the end of its value before deciding whether to write
//! the key at all.

use std::collections::VecDeque;

use crate::events::{CompoundAttributeGatherer, HclEvent};

const DEFAULT_CAPACITY: usize = 8;

/// Error from an [`EmitterEventQueue`] operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Reached end of queue before condition was met")]
    EndOfQueue,
    #[error("index {index} out of range for queue of {count} elements")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("queue is empty")]
    Empty,
    #[error("capacity {requested} is smaller than the {count} queued elements")]
    CapacityTooSmall { requested: usize, count: usize },
    #[error("capacity must be greater than zero")]
    InvalidCapacity,
}

/// A growable double-ended queue.
///
/// The logical capacity doubles whenever a push would exceed it, so no
/// element is ever dropped. Out-of-range access is an error, never a
/// silent no-op.
#[derive(Debug, Clone)]
pub struct EmitterEventQueue<T = HclEvent> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> Default for EmitterEventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EmitterEventQueue<T> {
    /// An empty queue with a small initial capacity.
    pub fn new() -> Self {
        EmitterEventQueue {
            items: VecDeque::with_capacity(DEFAULT_CAPACITY),
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// An empty queue with room for `capacity` elements. Zero is rejected.
    pub fn with_capacity(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::InvalidCapacity);
        }
        Ok(EmitterEventQueue {
            items: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Logical capacity; always at least `len()`.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Resizes the queue. Shrinking below the current length is rejected.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<(), QueueError> {
        if capacity == 0 {
            return Err(QueueError::InvalidCapacity);
        }
        if capacity < self.items.len() {
            return Err(QueueError::CapacityTooSmall {
                requested: capacity,
                count: self.items.len(),
            });
        }
        if capacity > self.capacity {
            self.items.reserve(capacity - self.items.len());
        } else {
            self.items.shrink_to(capacity);
        }
        self.capacity = capacity;
        Ok(())
    }

    /// Number of queued elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drops every element. Capacity is kept.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn grow_for_one(&mut self) {
        if self.items.len() == self.capacity {
            let doubled = self.capacity * 2;
            self.items.reserve(doubled - self.items.len());
            self.capacity = doubled;
        }
    }

    fn out_of_range(&self, index: usize) -> QueueError {
        QueueError::IndexOutOfRange {
            index,
            count: self.items.len(),
        }
    }

    // ─── Indexed access ──────────────────────────────────────

    /// The element at `index`, counted from the front.
    pub fn get(&self, index: usize) -> Result<&T, QueueError> {
        self.items.get(index).ok_or_else(|| self.out_of_range(index))
    }

    /// Replaces the element at `index`, returning the old one.
    pub fn set(&mut self, index: usize, item: T) -> Result<T, QueueError> {
        let err = self.out_of_range(index);
        let slot = self.items.get_mut(index).ok_or(err)?;
        Ok(std::mem::replace(slot, item))
    }

    /// Inserts before `index`; `index == len()` appends.
    pub fn insert(&mut self, index: usize, item: T) -> Result<(), QueueError> {
        if index > self.items.len() {
            return Err(self.out_of_range(index));
        }
        self.grow_for_one();
        self.items.insert(index, item);
        Ok(())
    }

    /// Removes and returns the element at `index`.
    pub fn remove_at(&mut self, index: usize) -> Result<T, QueueError> {
        let err = self.out_of_range(index);
        self.items.remove(index).ok_or(err)
    }

    // ─── Both ends ───────────────────────────────────────────

    /// Appends at the back, doubling the capacity when full.
    pub fn push_back(&mut self, item: T) {
        self.grow_for_one();
        self.items.push_back(item);
    }

    /// Prepends at the front, doubling the capacity when full.
    pub fn push_front(&mut self, item: T) {
        self.grow_for_one();
        self.items.push_front(item);
    }

    /// Same as [`push_back`](Self::push_back).
    pub fn enqueue(&mut self, item: T) {
        self.push_back(item);
    }

    /// Same as [`pop_front`](Self::pop_front).
    pub fn dequeue(&mut self) -> Result<T, QueueError> {
        self.pop_front()
    }

    /// Removes the front element; [`QueueError::Empty`] when there is none.
    pub fn pop_front(&mut self) -> Result<T, QueueError> {
        self.items.pop_front().ok_or(QueueError::Empty)
    }

    /// Removes the back element; [`QueueError::Empty`] when there is none.
    pub fn pop_back(&mut self) -> Result<T, QueueError> {
        self.items.pop_back().ok_or(QueueError::Empty)
    }

    /// The front element, left in place.
    pub fn peek_front(&self) -> Result<&T, QueueError> {
        self.items.front().ok_or(QueueError::Empty)
    }

    /// The back element, left in place.
    pub fn peek_back(&self) -> Result<&T, QueueError> {
        self.items.back().ok_or(QueueError::Empty)
    }

    /// Elements from front to back.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    // ─── Lookahead ───────────────────────────────────────────

    /// Finds the end of the run starting at `start` that stops at the
    /// first element satisfying `predicate`.
    fn run_end<F>(&self, start: usize, mut predicate: F, include_last: bool) -> Result<usize, QueueError>
    where
        F: FnMut(&T) -> bool,
    {
        if start > self.items.len() {
            return Err(self.out_of_range(start));
        }
        let hit = self
            .items
            .iter()
            .skip(start)
            .position(|item| predicate(item))
            .ok_or(QueueError::EndOfQueue)?;
        Ok(start + hit + usize::from(include_last))
    }

    /// Returns the elements before the first one satisfying `predicate`,
    /// plus that element when `include_last` is set. Never mutates.
    pub fn peek_until<F>(&self, predicate: F, include_last: bool) -> Result<Vec<&T>, QueueError>
    where
        F: FnMut(&T) -> bool,
    {
        self.peek_until_from(0, predicate, include_last)
    }

    /// [`peek_until`](Self::peek_until) starting at index `start`.
    pub fn peek_until_from<F>(&self, start: usize, predicate: F, include_last: bool) -> Result<Vec<&T>, QueueError>
    where
        F: FnMut(&T) -> bool,
    {
        let end = self.run_end(start, predicate, include_last)?;
        Ok(self.items.range(start..end).collect())
    }

    /// Removes and returns exactly the run [`peek_until`](Self::peek_until)
    /// would return. On error the queue is unchanged.
    pub fn consume_until<F>(&mut self, predicate: F, include_last: bool) -> Result<Vec<T>, QueueError>
    where
        F: FnMut(&T) -> bool,
    {
        self.consume_until_from(0, predicate, include_last)
    }

    /// [`consume_until`](Self::consume_until) starting at index `start`.
    pub fn consume_until_from<F>(&mut self, start: usize, predicate: F, include_last: bool) -> Result<Vec<T>, QueueError>
    where
        F: FnMut(&T) -> bool,
    {
        let end = self.run_end(start, predicate, include_last)?;
        Ok(self.items.drain(start..end).collect())
    }
}

impl EmitterEventQueue<HclEvent> {
    /// The events of the value following the mapping key at `key_index`:
    /// a single scalar, or a start event through its matching end.
    pub fn peek_value(&self, key_index: usize) -> Result<Vec<&HclEvent>, QueueError> {
        let mut gatherer = CompoundAttributeGatherer::new();
        self.peek_until_from(key_index + 1, |e| gatherer.advance(e), true)
    }

    /// Removes the mapping key at the front and its value.
    pub fn consume_key(&mut self) -> Result<Vec<HclEvent>, QueueError> {
        let mut gatherer = CompoundAttributeGatherer::new();
        let value = self.consume_until_from(1, |e| gatherer.advance(e), true)?;
        let key = self.pop_front()?;
        let mut run = Vec::with_capacity(value.len() + 1);
        run.push(key);
        run.extend(value);
        Ok(run)
    }
}
