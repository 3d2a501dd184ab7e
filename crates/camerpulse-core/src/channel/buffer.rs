use std::collections::VecDeque;

/// Number of recent notifications the channel keeps.
pub const EVENT_BUFFER_CAPACITY: usize = 50;

/// Fixed-capacity ring buffer of recent items, oldest evicted first.
#[derive(Debug, Clone)]
pub struct EventBuffer<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> EventBuffer<T> {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an item, evicting the oldest one if full.
    pub fn push(&mut self, item: T) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(item);
    }

    /// All buffered items in receipt order (oldest first).
    pub fn contents(&self) -> Vec<T> {
        self.buffer.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl<T: Clone> Default for EventBuffer<T> {
    fn default() -> Self {
        Self::new(EVENT_BUFFER_CAPACITY)
    }
}
