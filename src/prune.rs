//! Prune strategies deciding which idle connections to evict

use crate::statistics::ConnectionMetadata;
use std::fmt::Debug;
use std::time::{Duration, Instant};

const DEFAULT_PRUNE_PERIOD: Duration = Duration::from_secs(5 * 60);
const DEFAULT_IDLE_TIME: Duration = Duration::from_secs(10 * 60);
const DEFAULT_AGE_TIME: Duration = Duration::from_secs(60 * 60);

/// Decides whether an available connection should be removed from the pool.
///
/// Strategies are stateless; the pool calls [`prune`](Self::prune) for every
/// available connection each time the prune task runs.
pub trait PruneStrategy: Debug + Send + Sync {
    /// Whether the connection should be evicted at `now`
    fn prune(&self, conn: &ConnectionMetadata, now: Instant) -> bool;

    /// How often the pool's prune task runs
    fn prune_period(&self) -> Duration;

    /// Number of available/active timestamps to keep per connection
    fn statistics_size(&self) -> usize {
        1
    }
}

/// Evicts connections that have been sitting in the available set longer
/// than `idle_time`. An `idle_time` of zero disables eviction.
///
/// # Examples
///
/// ```
/// use esox_connpool::{IdlePruneStrategy, PruneStrategy};
/// use std::time::Duration;
///
/// let strategy = IdlePruneStrategy::new(Duration::from_secs(60), Duration::from_secs(300));
/// assert_eq!(strategy.prune_period(), Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct IdlePruneStrategy {
    prune_period: Duration,
    idle_time: Duration,
}

impl Default for IdlePruneStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_PRUNE_PERIOD, DEFAULT_IDLE_TIME)
    }
}

impl IdlePruneStrategy {
    pub fn new(prune_period: Duration, idle_time: Duration) -> Self {
        Self {
            prune_period,
            idle_time,
        }
    }

    pub fn idle_time(&self) -> Duration {
        self.idle_time
    }
}

impl PruneStrategy for IdlePruneStrategy {
    fn prune(&self, conn: &ConnectionMetadata, now: Instant) -> bool {
        if self.idle_time.is_zero() {
            return false;
        }
        let available_since = conn.last_available().unwrap_or(conn.created_at());
        now.saturating_duration_since(available_since) > self.idle_time
    }

    fn prune_period(&self) -> Duration {
        self.prune_period
    }
}

/// Evicts connections older than `age_time`, regardless of use.
///
/// With a priority threshold set, connections to endpoints whose priority is
/// at or above the threshold age out after
/// `age_time / (priority_factor * (priority + 1))`, so less preferred servers
/// are rotated away sooner.
///
/// # Examples
///
/// ```
/// use esox_connpool::AgePruneStrategy;
/// use std::time::Duration;
///
/// let strategy = AgePruneStrategy::new(Duration::from_secs(60), Duration::from_secs(3600))
///     .with_priority_threshold(1, 2);
///
/// assert_eq!(strategy.age_window(None), Duration::from_secs(3600));
/// assert_eq!(strategy.age_window(Some(0)), Duration::from_secs(3600));
/// // 3600 / (2 * (1 + 1))
/// assert_eq!(strategy.age_window(Some(1)), Duration::from_secs(900));
/// ```
#[derive(Debug, Clone)]
pub struct AgePruneStrategy {
    prune_period: Duration,
    age_time: Duration,
    priority_threshold: Option<u32>,
    priority_factor: u32,
}

impl Default for AgePruneStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_PRUNE_PERIOD, DEFAULT_AGE_TIME)
    }
}

impl AgePruneStrategy {
    pub fn new(prune_period: Duration, age_time: Duration) -> Self {
        Self {
            prune_period,
            age_time,
            priority_threshold: None,
            priority_factor: 1,
        }
    }

    /// Shorten the age window for endpoints with priority `>= threshold`
    pub fn with_priority_threshold(mut self, threshold: u32, factor: u32) -> Self {
        self.priority_threshold = Some(threshold);
        self.priority_factor = factor.max(1);
        self
    }

    pub fn age_time(&self) -> Duration {
        self.age_time
    }

    /// Effective maximum age for a connection with the given endpoint priority
    pub fn age_window(&self, priority: Option<u32>) -> Duration {
        match (self.priority_threshold, priority) {
            (Some(threshold), Some(priority)) if priority >= threshold => {
                let divisor = self.priority_factor.saturating_mul(priority.saturating_add(1));
                self.age_time / divisor.max(1)
            }
            _ => self.age_time,
        }
    }
}

impl PruneStrategy for AgePruneStrategy {
    fn prune(&self, conn: &ConnectionMetadata, now: Instant) -> bool {
        if self.age_time.is_zero() {
            return false;
        }
        now.saturating_duration_since(conn.created_at()) > self.age_window(conn.priority())
    }

    fn prune_period(&self) -> Duration {
        self.prune_period
    }
}
