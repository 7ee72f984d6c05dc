//! Interfaces the pool consumes from the protocol layer

use crate::errors::ConnectionError;

/// Descriptor of the server a connection talks to.
///
/// `priority` is optional; lower values are preferred. The
/// [`AgePruneStrategy`](crate::AgePruneStrategy) can rotate connections to
/// less preferred endpoints faster.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub address: String,
    pub priority: Option<u32>,
}

impl Endpoint {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            priority: None,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// A stateful network connection that can be pooled.
///
/// # Examples
///
/// ```
/// use esox_connpool::{Connection, ConnectionError};
///
/// struct Socket { open: bool }
///
/// impl Connection for Socket {
///     fn open(&mut self) -> Result<(), ConnectionError> {
///         self.open = true;
///         Ok(())
///     }
///     fn close(&mut self) { self.open = false; }
///     fn is_open(&self) -> bool { self.open }
/// }
///
/// let mut socket = Socket { open: false };
/// socket.reopen().unwrap();
/// assert!(socket.is_open());
/// ```
pub trait Connection: Send {
    /// Establish the connection.
    fn open(&mut self) -> Result<(), ConnectionError>;

    /// Tear the connection down. Must be safe to call on a closed connection.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Close and open again.
    fn reopen(&mut self) -> Result<(), ConnectionError> {
        self.close();
        self.open()
    }

    fn endpoint(&self) -> Option<&Endpoint> {
        None
    }
}

/// Creates raw, not yet opened, connections for the pool.
pub trait ConnectionFactory<C>: Send + Sync {
    fn create(&self) -> Result<C, ConnectionError>;
}

impl<C, F> ConnectionFactory<C> for F
where
    F: Fn() -> Result<C, ConnectionError> + Send + Sync,
{
    fn create(&self) -> Result<C, ConnectionError> {
        self()
    }
}
