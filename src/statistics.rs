//! Per-connection lifecycle statistics

use crate::connection::Endpoint;
use std::collections::VecDeque;
use std::time::Instant;

/// Bounded history of the times a connection entered the available and the
/// active set. Older entries are discarded once `size` is reached.
#[derive(Debug, Clone)]
pub struct ConnectionStatistics {
    size: usize,
    available: VecDeque<Instant>,
    active: VecDeque<Instant>,
}

impl ConnectionStatistics {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            available: VecDeque::with_capacity(size),
            active: VecDeque::with_capacity(size),
        }
    }

    pub fn add_available_stat(&mut self) {
        Self::push(&mut self.available, self.size, Instant::now());
    }

    pub fn add_active_stat(&mut self) {
        Self::push(&mut self.active, self.size, Instant::now());
    }

    pub fn last_available_stat(&self) -> Option<Instant> {
        self.available.back().copied()
    }

    pub fn last_active_stat(&self) -> Option<Instant> {
        self.active.back().copied()
    }

    pub fn available_stats(&self) -> impl Iterator<Item = &Instant> {
        self.available.iter()
    }

    pub fn active_stats(&self) -> impl Iterator<Item = &Instant> {
        self.active.iter()
    }

    fn push(history: &mut VecDeque<Instant>, size: usize, at: Instant) {
        if size == 0 {
            return;
        }
        while history.len() >= size {
            history.pop_front();
        }
        history.push_back(at);
    }
}

/// Metadata the pool keeps for each pooled connection; this is what a
/// [`PruneStrategy`](crate::PruneStrategy) inspects.
#[derive(Debug)]
pub struct ConnectionMetadata {
    pub(crate) id: u64,
    pub(crate) created_at: Instant,
    pub(crate) endpoint: Option<Endpoint>,
    pub(crate) statistics: parking_lot::Mutex<ConnectionStatistics>,
}

impl ConnectionMetadata {
    pub(crate) fn new(id: u64, endpoint: Option<Endpoint>, statistics_size: usize) -> Self {
        Self {
            id,
            created_at: Instant::now(),
            endpoint,
            statistics: parking_lot::Mutex::new(ConnectionStatistics::new(statistics_size)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Endpoint the connection pointed at when it was created
    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    pub fn priority(&self) -> Option<u32> {
        self.endpoint.as_ref().and_then(|e| e.priority)
    }

    pub fn last_available(&self) -> Option<Instant> {
        self.statistics.lock().last_available_stat()
    }

    pub fn last_active(&self) -> Option<Instant> {
        self.statistics.lock().last_active_stat()
    }

    /// Copy of the timestamp history
    pub fn statistics(&self) -> ConnectionStatistics {
        self.statistics.lock().clone()
    }
}
