#![allow(dead_code)]

use esox_connpool::{Connection, ConnectionError, ConnectionFactory, Endpoint};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory connection that records how often it was opened and closed.
pub struct MockConnection {
    open: bool,
    endpoint: Option<Endpoint>,
    counters: Arc<Counters>,
}

#[derive(Default)]
pub struct Counters {
    pub created: AtomicUsize,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub fail_create: AtomicBool,
}

impl Connection for MockConnection {
    fn open(&mut self) -> Result<(), ConnectionError> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }
}

/// Factory whose counters stay observable after it is moved into a pool.
#[derive(Clone, Default)]
pub struct MockFactory {
    pub counters: Arc<Counters>,
    endpoint: Option<Endpoint>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(endpoint: Endpoint) -> Self {
        Self {
            counters: Arc::default(),
            endpoint: Some(endpoint),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.counters.fail_create.store(failing, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.counters.created.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }
}

impl ConnectionFactory<MockConnection> for MockFactory {
    fn create(&self) -> Result<MockConnection, ConnectionError> {
        if self.counters.fail_create.load(Ordering::SeqCst) {
            return Err(ConnectionError::Create("connection refused".into()));
        }
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        Ok(MockConnection {
            open: false,
            endpoint: self.endpoint.clone(),
            counters: Arc::clone(&self.counters),
        })
    }
}
