//! Ordering policy for the available set

use std::collections::VecDeque;

/// Where returned connections are placed relative to the next checkout.
///
/// LIFO hands out the most recently used connection and leaves idle ones at
/// the tail where pruning finds them. FIFO spreads use evenly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum QueueType {
    #[default]
    Lifo,
    Fifo,
}

/// Entries stored in a [`Queue`] are identified by a stable id.
pub(crate) trait Keyed {
    fn key(&self) -> u64;
}

/// Double-ended sequence; `add` honours the queue type, `remove` takes the head.
#[derive(Debug)]
pub(crate) struct Queue<T> {
    queue_type: QueueType,
    items: VecDeque<T>,
}

impl<T: Keyed> Queue<T> {
    pub fn new(queue_type: QueueType) -> Self {
        Self {
            queue_type,
            items: VecDeque::new(),
        }
    }

    pub fn add(&mut self, item: T) {
        match self.queue_type {
            QueueType::Lifo => self.items.push_front(item),
            QueueType::Fifo => self.items.push_back(item),
        }
    }

    pub fn remove(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn remove_key(&mut self, key: u64) -> Option<T> {
        let index = self.items.iter().position(|item| item.key() == key)?;
        self.items.remove(index)
    }

    pub fn contains_key(&self, key: u64) -> bool {
        self.items.iter().any(|item| item.key() == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.items.drain(..)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
