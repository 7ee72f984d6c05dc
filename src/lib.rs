//! # esox_connpool
//!
//! Thread-safe pool for expensive, stateful network connections such as
//! directory protocol connections. The pool owns connection lifecycle so the
//! protocol client only checks connections out and back in.
//!
//! ## Features
//!
//! - Checkout with reuse, on-demand growth and bounded blocking
//! - Strict-limit and elastic sizing policies
//! - Activation, passivation and validation hooks
//! - Background pruning (idle or age based) and periodic validation
//! - LIFO or FIFO reuse order
//! - Connection proxies that check themselves in on `close` or drop
//! - Metrics, Prometheus export and health status
//! - Async checkout
//!
//! ## Quick Start
//!
//! ```rust
//! use esox_connpool::{Connection, ConnectionError, ConnectionPool, PoolConfig, SizingPolicy};
//! use std::time::Duration;
//!
//! struct DirectoryConnection { open: bool }
//!
//! impl Connection for DirectoryConnection {
//!     fn open(&mut self) -> Result<(), ConnectionError> { self.open = true; Ok(()) }
//!     fn close(&mut self) { self.open = false; }
//!     fn is_open(&self) -> bool { self.open }
//! }
//!
//! let pool = ConnectionPool::builder(|| Ok::<_, ConnectionError>(DirectoryConnection { open: false }))
//!     .name("directory")
//!     .config(PoolConfig::new().with_min_pool_size(1).with_max_pool_size(5))
//!     .sizing(SizingPolicy::StrictLimit)
//!     .block_wait_time(Duration::from_secs(5))
//!     .build();
//! pool.initialize().unwrap();
//!
//! {
//!     let conn = pool.get_connection().unwrap();
//!     assert!(conn.lock().unwrap().is_open());
//!     // Connection automatically checked in when `conn` goes out of scope
//! }
//! assert_eq!(pool.available_count(), 1);
//! pool.close();
//! ```

mod config;
mod connection;
mod errors;
mod health;
mod lifecycle;
mod metrics;
mod pool;
mod proxy;
mod prune;
mod queue;
mod scheduler;
mod sizing;
mod statistics;

pub use config::PoolConfig;
pub use connection::{Connection, ConnectionFactory, Endpoint};
pub use errors::{ConnectionError, PoolError, PoolResult};
pub use health::HealthStatus;
pub use lifecycle::{ConnectionActivator, ConnectionPassivator, ConnectionValidator};
pub use metrics::{MetricsExporter, PoolMetrics};
pub use pool::{ConnectionPool, PoolBuilder};
pub use proxy::ConnectionProxy;
pub use prune::{AgePruneStrategy, IdlePruneStrategy, PruneStrategy};
pub use queue::QueueType;
pub use sizing::SizingPolicy;
pub use statistics::{ConnectionMetadata, ConnectionStatistics};
