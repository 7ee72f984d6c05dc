//! Handle given to callers for a checked-out connection

use crate::connection::{Connection, Endpoint};
use crate::errors::ConnectionError;
use crate::pool::{PoolInner, PooledConnection};
use crate::statistics::ConnectionMetadata;

use parking_lot::MutexGuard;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A checked-out connection.
///
/// The proxy implements [`Connection`] itself: `close` returns the
/// connection to the pool instead of closing it, and `open` reopens the
/// underlying connection in place if it was closed. Dropping a proxy that
/// was not returned checks it in as well.
///
/// Use [`lock`](Self::lock) for exclusive access to the raw connection. Do
/// not hold the guard while returning the proxy to the pool. Once returned,
/// the proxy no longer reaches the raw connection: `lock` yields `None`,
/// `is_open` reports false and `open`/`reopen` fail with
/// [`ConnectionError::Returned`].
pub struct ConnectionProxy<C: Connection + 'static> {
    pool: Arc<PoolInner<C>>,
    pooled: Arc<PooledConnection<C>>,
    returned: AtomicBool,
}

impl<C: Connection + 'static> ConnectionProxy<C> {
    pub(crate) fn new(pool: Arc<PoolInner<C>>, pooled: Arc<PooledConnection<C>>) -> Self {
        Self {
            pool,
            pooled,
            returned: AtomicBool::new(false),
        }
    }

    /// Stable id of the pooled connection behind this proxy
    pub fn id(&self) -> u64 {
        self.pooled.meta.id()
    }

    pub fn metadata(&self) -> &ConnectionMetadata {
        &self.pooled.meta
    }

    /// Exclusive access to the underlying connection, or `None` once the
    /// proxy has been returned to the pool
    pub fn lock(&self) -> Option<MutexGuard<'_, C>> {
        if self.is_returned() {
            return None;
        }
        let guard = self.pooled.connection.lock();
        // a concurrent release may have won while we waited for the mutex
        if self.is_returned() {
            return None;
        }
        Some(guard)
    }

    pub fn is_returned(&self) -> bool {
        self.returned.load(Ordering::Acquire)
    }

    pub(crate) fn belongs_to(&self, pool: &Arc<PoolInner<C>>) -> bool {
        Arc::ptr_eq(&self.pool, pool)
    }

    /// Check the connection in, at most once per proxy
    pub(crate) fn release(&self) {
        if self.returned.swap(true, Ordering::AcqRel) {
            tracing::warn!(connection = self.id(), "connection has already been returned to the pool");
            return;
        }
        self.pool.check_in(&self.pooled);
    }
}

impl<C: Connection + 'static> Connection for ConnectionProxy<C> {
    fn open(&mut self) -> Result<(), ConnectionError> {
        let mut conn = self.lock().ok_or(ConnectionError::Returned)?;
        if conn.is_open() {
            return Ok(());
        }
        tracing::debug!(connection = self.pooled.meta.id(), "reopening closed pooled connection");
        conn.open()
    }

    /// Returns the connection to the pool
    fn close(&mut self) {
        self.release();
    }

    fn is_open(&self) -> bool {
        self.lock().is_some_and(|conn| conn.is_open())
    }

    fn reopen(&mut self) -> Result<(), ConnectionError> {
        self.lock().ok_or(ConnectionError::Returned)?.reopen()
    }

    fn endpoint(&self) -> Option<&Endpoint> {
        self.pooled.meta.endpoint()
    }
}

impl<C: Connection + 'static> Drop for ConnectionProxy<C> {
    fn drop(&mut self) {
        if !*self.returned.get_mut() {
            *self.returned.get_mut() = true;
            self.pool.check_in(&self.pooled);
        }
    }
}

impl<C: Connection + 'static> fmt::Debug for ConnectionProxy<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProxy")
            .field("id", &self.id())
            .field("returned", &self.is_returned())
            .finish()
    }
}
