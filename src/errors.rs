//! Error types for the connection pool

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Invalid pool configuration: {0}")]
    Configuration(String),

    #[error("Pool configuration is frozen and can no longer be modified")]
    ConfigFrozen,

    #[error("Pool has already been initialized")]
    AlreadyInitialized,

    #[error("Pool has not been initialized")]
    NotInitialized,

    #[error("Pool has been closed")]
    Closed,

    #[error("Pool initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Pool is empty and connection creation failed")]
    PoolExhausted,

    #[error("Block time of {0:?} exceeded while waiting for a connection")]
    BlockingTimeout(std::time::Duration),

    #[error("Activation of connection failed")]
    ActivationFailed,

    #[error("Validation of connection failed")]
    ValidationFailed,

    #[error("Interrupted while waiting for an available connection")]
    Interrupted,
}

pub type PoolResult<T> = Result<T, PoolError>;

/// Failure reported by a [`Connection`](crate::Connection) or
/// [`ConnectionFactory`](crate::ConnectionFactory) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Could not create connection: {0}")]
    Create(String),

    #[error("Could not open connection: {0}")]
    Open(String),

    #[error("Connection has already been returned to the pool")]
    Returned,
}
