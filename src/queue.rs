//! A fixed-capacity FIFO used by the reachability traversal.
//!
//! The queue never grows: a push onto a full queue is refused. Callers that reuse one queue
//! across traversals must guarantee that they never hold more than `capacity` items at once.

use thiserror::Error;

/// Returned by [`WorkQueue::push`] when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("work queue is full")]
pub struct QueueFull;

/// A ring buffer of `Copy` items.
#[derive(Debug, Clone)]
pub struct WorkQueue<T: Copy> {
    slots: Vec<Option<T>>,
    head: usize,
    len: usize,
}

impl<T: Copy> WorkQueue<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            head: 0,
            len: 0,
        }
    }

    /// Appends an item at the back.
    pub fn push(&mut self, item: T) -> Result<(), QueueFull> {
        if self.len == self.slots.len() {
            return Err(QueueFull);
        }
        let tail = (self.head + self.len) % self.slots.len();
        self.slots[tail] = Some(item);
        self.len += 1;
        Ok(())
    }

    /// Removes the item at the front.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = (self.head + 1) % self.slots.len();
        self.len -= 1;
        item
    }

    /// Empties the queue, keeping its storage.
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
