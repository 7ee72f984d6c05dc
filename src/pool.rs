//! Core connection pool engine

use crate::config::PoolConfig;
use crate::connection::{Connection, ConnectionFactory};
use crate::errors::{ConnectionError, PoolError, PoolResult};
use crate::health::HealthStatus;
use crate::lifecycle::{ConnectionActivator, ConnectionPassivator, ConnectionValidator, LifecycleHooks};
use crate::metrics::{MetricsExporter, MetricsTracker, PoolMetrics};
use crate::proxy::ConnectionProxy;
use crate::prune::{IdlePruneStrategy, PruneStrategy};
use crate::queue::{Keyed, Queue, QueueType};
use crate::scheduler::{PeriodicTask, Scheduler};
use crate::sizing::SizingPolicy;
use crate::statistics::ConnectionMetadata;

use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

static POOL_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A raw connection owned by the pool together with its metadata
pub(crate) struct PooledConnection<C> {
    pub meta: ConnectionMetadata,
    pub connection: Mutex<C>,
}

impl<C> Keyed for Arc<PooledConnection<C>> {
    fn key(&self) -> u64 {
        self.meta.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Initialized,
    Closed,
}

struct PoolState<C> {
    phase: Phase,
    available: Queue<Arc<PooledConnection<C>>>,
    active: Queue<Arc<PooledConnection<C>>>,
}

impl<C> PoolState<C> {
    fn total(&self) -> usize {
        self.available.len() + self.active.len()
    }

    fn check_usable(&self) -> PoolResult<()> {
        match self.phase {
            Phase::Initialized => Ok(()),
            Phase::Uninitialized => Err(PoolError::NotInitialized),
            Phase::Closed => Err(PoolError::Closed),
        }
    }

    /// Move the head of the available set to the active set
    fn checkout_available(&mut self) -> Option<Arc<PooledConnection<C>>> {
        let pc = self.available.remove()?;
        self.add_active(Arc::clone(&pc));
        Some(pc)
    }

    fn add_active(&mut self, pc: Arc<PooledConnection<C>>) {
        pc.meta.statistics.lock().add_active_stat();
        self.active.add(pc);
    }

    fn add_available(&mut self, pc: Arc<PooledConnection<C>>) {
        pc.meta.statistics.lock().add_available_stat();
        self.available.add(pc);
    }

    fn remove(&mut self, id: u64) -> Option<Arc<PooledConnection<C>>> {
        self.available.remove_key(id).or_else(|| self.active.remove_key(id))
    }
}

/// Remaining wait budget of a single checkout
#[derive(Debug, Clone, Copy)]
struct Deadline(Option<Instant>);

impl Deadline {
    fn after(wait: Duration) -> Self {
        if wait.is_zero() {
            Deadline(None)
        } else {
            Deadline(Some(Instant::now() + wait))
        }
    }

    /// `None` means wait forever
    fn remaining(&self) -> Option<Duration> {
        self.0.map(|at| at.saturating_duration_since(Instant::now()))
    }
}

pub(crate) struct PoolInner<C: Connection + 'static> {
    name: String,
    config: RwLock<PoolConfig>,
    factory: Box<dyn ConnectionFactory<C>>,
    hooks: LifecycleHooks<C>,
    prune_strategy: OnceLock<Arc<dyn PruneStrategy>>,
    sizing: SizingPolicy,
    block_wait_time: Duration,
    fail_fast_initialize: bool,
    state: Mutex<PoolState<C>>,
    available_cond: Condvar,
    create_lock: Mutex<()>,
    lifecycle_lock: Mutex<()>,
    scheduler: Mutex<Option<Scheduler>>,
    metrics: MetricsTracker,
    next_id: AtomicU64,
}

impl<C: Connection + 'static> PoolInner<C> {
    fn prune_strategy(&self) -> Option<&Arc<dyn PruneStrategy>> {
        self.prune_strategy.get()
    }

    fn statistics_size(&self) -> usize {
        self.prune_strategy().map_or(1, |s| s.statistics_size())
    }

    fn create_connection(&self) -> Result<Arc<PooledConnection<C>>, ConnectionError> {
        let result = self.factory.create().and_then(|mut conn| {
            conn.open()?;
            Ok(conn)
        });
        let conn = match result {
            Ok(conn) => conn,
            Err(e) => {
                MetricsTracker::increment(&self.metrics.creation_failures);
                warn!(pool = %self.name, error = %e, "unable to create connection");
                return Err(e);
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let meta = ConnectionMetadata::new(id, conn.endpoint().cloned(), self.statistics_size());
        MetricsTracker::increment(&self.metrics.connections_created);
        trace!(pool = %self.name, connection = id, "created connection");

        Ok(Arc::new(PooledConnection {
            meta,
            connection: Mutex::new(conn),
        }))
    }

    fn destroy(&self, pc: &PooledConnection<C>) {
        pc.connection.lock().close();
        MetricsTracker::increment(&self.metrics.connections_destroyed);
        trace!(pool = %self.name, connection = pc.meta.id, "destroyed connection");
    }

    /// Remove a connection from both sets and close it, unless someone
    /// else already did.
    fn remove_and_destroy(&self, pc: &PooledConnection<C>) {
        let removed = self.state.lock().remove(pc.meta.id);
        if let Some(pc) = removed {
            self.destroy(&pc);
            self.available_cond.notify_one();
        }
    }

    /// Add available connections until the pool holds `size` of them, making
    /// at most `size * 2` attempts.
    fn grow(&self, size: usize, throw_on_failure: bool) -> Result<usize, ConnectionError> {
        let validate_new = self.config.read().validate_periodically();
        let max_attempts = size.saturating_mul(2);
        let mut attempts = 0;
        let mut total = self.state.lock().total();

        trace!(pool = %self.name, total, size, "checking pool size");
        while total < size && attempts < max_attempts {
            attempts += 1;
            let _create = self.create_lock.lock();
            {
                let state = self.state.lock();
                if state.phase == Phase::Closed || state.total() >= size {
                    break;
                }
            }

            match self.create_connection() {
                Ok(pc) => {
                    if validate_new && !self.hooks.validate(&mut pc.connection.lock()) {
                        MetricsTracker::increment(&self.metrics.validation_failures);
                        warn!(pool = %self.name, connection = pc.meta.id, "new connection failed validation");
                        self.destroy(&pc);
                    } else {
                        let mut state = self.state.lock();
                        if state.phase == Phase::Closed {
                            drop(state);
                            self.destroy(&pc);
                            break;
                        }
                        state.add_available(pc);
                        drop(state);
                        self.available_cond.notify_one();
                    }
                }
                Err(e) if throw_on_failure => return Err(e),
                Err(_) => {}
            }

            total = self.state.lock().total();
            if total < size {
                debug!(pool = %self.name, total, size, "pool size below target");
            }
        }
        Ok(self.state.lock().total())
    }

    /// Wait on the condvar until a connection is checked in.
    ///
    /// Returns `Ok(None)` when a wake-up finds the available set empty but
    /// the sizing policy now leaves room to create a connection.
    fn block_available(
        &self,
        mut state: MutexGuard<'_, PoolState<C>>,
        max_pool_size: usize,
        deadline: Deadline,
    ) -> PoolResult<Option<Arc<PooledConnection<C>>>> {
        let mut woken = false;
        loop {
            if let Some(pc) = state.checkout_available() {
                return Ok(Some(pc));
            }
            if state.phase == Phase::Closed {
                return Err(PoolError::Interrupted);
            }
            if woken && self.sizing.may_create(state.active.len(), state.total(), max_pool_size) {
                debug!(pool = %self.name, "pool has room again, retrying creation");
                return Ok(None);
            }

            trace!(pool = %self.name, "available pool is empty, waiting");
            match deadline.remaining() {
                None => self.available_cond.wait(&mut state),
                Some(remaining) => {
                    let timed_out =
                        remaining.is_zero() || self.available_cond.wait_for(&mut state, remaining).timed_out();
                    if timed_out {
                        if let Some(pc) = state.checkout_available() {
                            return Ok(Some(pc));
                        }
                        MetricsTracker::increment(&self.metrics.blocking_timeouts);
                        debug!(pool = %self.name, wait = ?self.block_wait_time, "block time exceeded");
                        return Err(PoolError::BlockingTimeout(self.block_wait_time));
                    }
                }
            }
            woken = true;
        }
    }

    /// Create a new active connection for a checkout that missed; falls back
    /// to blocking when creation is not possible. `Ok(None)` asks the caller
    /// to start over.
    fn grow_active(&self, max_pool_size: usize, deadline: Deadline) -> PoolResult<Option<Arc<PooledConnection<C>>>> {
        let create_guard = match deadline.remaining() {
            None => self.create_lock.lock(),
            Some(remaining) => match self.create_lock.try_lock_for(remaining) {
                Some(guard) => guard,
                None => {
                    MetricsTracker::increment(&self.metrics.blocking_timeouts);
                    return Err(PoolError::BlockingTimeout(self.block_wait_time));
                }
            },
        };

        let has_room = {
            let mut state = self.state.lock();
            state.check_usable()?;
            if let Some(pc) = state.checkout_available() {
                return Ok(Some(pc));
            }
            self.sizing.may_commit(state.total(), max_pool_size)
        };

        if has_room && let Ok(pc) = self.create_connection() {
            let mut state = self.state.lock();
            if state.phase != Phase::Initialized {
                drop(state);
                self.destroy(&pc);
                return Err(PoolError::Closed);
            }
            state.add_active(Arc::clone(&pc));
            trace!(pool = %self.name, connection = pc.meta.id, "created new active connection");
            return Ok(Some(pc));
        }
        drop(create_guard);

        let state = self.state.lock();
        if state.available.is_empty() && state.active.is_empty() {
            return Err(PoolError::PoolExhausted);
        }
        debug!(pool = %self.name, "no connection created, blocking until one is available");
        self.block_available(state, max_pool_size, deadline)
    }

    /// Take an available connection or create one, blocking until the
    /// deadline when neither is possible
    fn acquire(&self, max_pool_size: usize, deadline: Deadline) -> PoolResult<Arc<PooledConnection<C>>> {
        loop {
            let waited = {
                let mut state = self.state.lock();
                state.check_usable()?;
                if let Some(pc) = state.checkout_available() {
                    trace!(pool = %self.name, connection = pc.meta.id, "reusing available connection");
                    return Ok(pc);
                }
                if self.sizing.may_create(state.active.len(), state.total(), max_pool_size) {
                    None
                } else {
                    Some(self.block_available(state, max_pool_size, deadline)?)
                }
            };

            let acquired = match waited {
                Some(waited) => waited,
                None => self.grow_active(max_pool_size, deadline)?,
            };
            if let Some(pc) = acquired {
                return Ok(pc);
            }
        }
    }

    fn activate_and_validate(&self, pc: &PooledConnection<C>, validate_on_check_out: bool) -> PoolResult<()> {
        let (activated, valid) = {
            let mut conn = pc.connection.lock();
            let activated = self.hooks.activate(&mut conn);
            let valid = !activated || !validate_on_check_out || self.hooks.validate(&mut conn);
            (activated, valid)
        };

        if !activated {
            MetricsTracker::increment(&self.metrics.activation_failures);
            warn!(pool = %self.name, connection = pc.meta.id, "connection failed activation");
            self.remove_and_destroy(pc);
            return Err(PoolError::ActivationFailed);
        }
        if !valid {
            MetricsTracker::increment(&self.metrics.validation_failures);
            warn!(pool = %self.name, connection = pc.meta.id, "connection failed check out validation");
            self.remove_and_destroy(pc);
            return Err(PoolError::ValidationFailed);
        }
        Ok(())
    }

    fn checkout(self: &Arc<Self>) -> PoolResult<ConnectionProxy<C>> {
        let (max_pool_size, validate_on_check_out) = {
            let config = self.config.read();
            (config.max_pool_size(), config.validate_on_check_out())
        };
        let deadline = Deadline::after(self.block_wait_time);
        let pc = self.acquire(max_pool_size, deadline)?;

        self.activate_and_validate(&pc, validate_on_check_out)?;
        MetricsTracker::increment(&self.metrics.total_checked_out);
        Ok(ConnectionProxy::new(Arc::clone(self), pc))
    }

    fn validate_and_passivate(&self, pc: &PooledConnection<C>, validate_on_check_in: bool) -> bool {
        let mut conn = pc.connection.lock();
        if !conn.is_open() {
            debug!(pool = %self.name, connection = pc.meta.id, "returned connection is not open");
            return false;
        }
        if validate_on_check_in && !self.hooks.validate(&mut conn) {
            MetricsTracker::increment(&self.metrics.validation_failures);
            warn!(pool = %self.name, connection = pc.meta.id, "connection failed check in validation");
            return false;
        }
        if !self.hooks.passivate(&mut conn) {
            MetricsTracker::increment(&self.metrics.passivation_failures);
            warn!(pool = %self.name, connection = pc.meta.id, "connection failed passivation");
            return false;
        }
        true
    }

    pub(crate) fn check_in(&self, pc: &Arc<PooledConnection<C>>) {
        let id = pc.meta.id;
        {
            let state = self.state.lock();
            if state.phase == Phase::Closed {
                debug!(pool = %self.name, connection = id, "pool is closed, ignoring returned connection");
                return;
            }
            if !state.active.contains_key(id) {
                if state.available.contains_key(id) {
                    warn!(pool = %self.name, connection = id, "returned connection is already available");
                } else {
                    warn!(pool = %self.name, connection = id, "attempt to return unknown connection");
                }
                return;
            }
        }

        let validate_on_check_in = self.config.read().validate_on_check_in();
        let valid = self.validate_and_passivate(pc, validate_on_check_in);

        let mut state = self.state.lock();
        let Some(pc) = state.active.remove_key(id) else {
            debug!(pool = %self.name, connection = id, "connection left the active set during check in");
            return;
        };
        if valid && state.phase == Phase::Initialized {
            state.add_available(pc);
            drop(state);
            MetricsTracker::increment(&self.metrics.total_checked_in);
            trace!(pool = %self.name, connection = id, "checked in connection");
            self.available_cond.notify_one();
        } else {
            drop(state);
            self.destroy(&pc);
            self.available_cond.notify_one();
        }
    }

    fn prune(&self) {
        let Some(strategy) = self.prune_strategy() else {
            return;
        };
        let min_pool_size = self.config.read().min_pool_size();

        let mut state = self.state.lock();
        if state.phase != Phase::Initialized {
            return;
        }
        if state.available.is_empty() {
            debug!(pool = %self.name, "no available connections, no pruning needed");
            return;
        }
        let mut total = state.total();
        if total <= min_pool_size {
            return;
        }

        debug!(pool = %self.name, available = state.available.len(), "pruning available pool");
        let now = Instant::now();
        let snapshot: Vec<_> = state.available.iter().cloned().collect();
        for pc in snapshot {
            if strategy.prune(&pc.meta, now)
                && let Some(pc) = state.available.remove_key(pc.meta.id)
            {
                self.destroy(&pc);
                MetricsTracker::increment(&self.metrics.connections_pruned);
                total -= 1;
            }
            if total <= min_pool_size {
                break;
            }
        }
        debug!(pool = %self.name, available = state.available.len(), "available pool pruned");
    }

    fn validate(&self) {
        let (validate_periodically, min_pool_size) = {
            let config = self.config.read();
            (config.validate_periodically(), config.min_pool_size())
        };

        {
            let mut state = self.state.lock();
            if state.phase != Phase::Initialized {
                return;
            }
            if validate_periodically && !state.available.is_empty() {
                debug!(pool = %self.name, available = state.available.len(), "validating available pool");
                let snapshot: Vec<_> = state.available.iter().cloned().collect();
                for pc in snapshot {
                    if !self.hooks.validate(&mut pc.connection.lock()) {
                        MetricsTracker::increment(&self.metrics.validation_failures);
                        warn!(pool = %self.name, connection = pc.meta.id, "connection failed periodic validation");
                        if let Some(pc) = state.available.remove_key(pc.meta.id) {
                            self.destroy(&pc);
                        }
                    }
                }
            }
        }

        // throw_on_failure is false, so this cannot fail
        let _ = self.grow(min_pool_size, false);
    }

    fn close(&self) {
        let _lifecycle = self.lifecycle_lock.lock();
        let (connections, scheduler) = {
            let mut state = self.state.lock();
            if state.phase == Phase::Closed {
                return;
            }
            state.phase = Phase::Closed;
            let mut connections: Vec<_> = state.available.drain().collect();
            connections.extend(state.active.drain());
            (connections, self.scheduler.lock().take())
        };
        self.available_cond.notify_all();

        debug!(pool = %self.name, connections = connections.len(), "closing connections");
        for pc in &connections {
            self.destroy(pc);
        }
        if let Some(mut scheduler) = scheduler {
            scheduler.shutdown();
        }
        info!(pool = %self.name, "pool closed");
    }

    fn run_task(&self, task: &str, f: impl FnOnce(&Self)) {
        trace!(pool = %self.name, task, "begin task");
        if panic::catch_unwind(AssertUnwindSafe(|| f(self))).is_err() {
            error!(pool = %self.name, task, "maintenance task panicked");
        }
        trace!(pool = %self.name, task, "end task");
    }
}

impl<C: Connection + 'static> Drop for PoolInner<C> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.phase == Phase::Closed {
            return;
        }
        state.phase = Phase::Closed;
        let connections: Vec<_> = state.available.drain().chain(state.active.drain()).collect();
        for pc in connections {
            pc.connection.lock().close();
        }
    }
}

/// Pool of stateful network connections
///
/// Connections are created by a [`ConnectionFactory`], handed out as
/// [`ConnectionProxy`] handles and pruned or validated in the background.
/// The pool must be [initialized](Self::initialize) before use.
///
/// # Examples
///
/// ```
/// use esox_connpool::{Connection, ConnectionError, ConnectionPool, PoolConfig};
///
/// struct Socket { open: bool }
///
/// impl Connection for Socket {
///     fn open(&mut self) -> Result<(), ConnectionError> { self.open = true; Ok(()) }
///     fn close(&mut self) { self.open = false; }
///     fn is_open(&self) -> bool { self.open }
/// }
///
/// let pool = ConnectionPool::new(
///     || Ok::<_, ConnectionError>(Socket { open: false }),
///     PoolConfig::new().with_min_pool_size(2).with_max_pool_size(4),
/// );
/// pool.initialize().unwrap();
/// assert_eq!(pool.available_count(), 2);
///
/// {
///     let conn = pool.get_connection().unwrap();
///     assert!(conn.is_open());
///     assert_eq!(pool.active_count(), 1);
///     // returned to the pool when dropped
/// }
/// assert_eq!(pool.available_count(), 2);
/// pool.close();
/// ```
pub struct ConnectionPool<C: Connection + 'static> {
    inner: Arc<PoolInner<C>>,
}

impl<C: Connection + 'static> Clone for ConnectionPool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connection + 'static> ConnectionPool<C> {
    /// Create a strict-limit pool with default settings
    pub fn new<F>(factory: F, config: PoolConfig) -> Self
    where
        F: ConnectionFactory<C> + 'static,
    {
        Self::builder(factory).config(config).build()
    }

    pub fn builder<F>(factory: F) -> PoolBuilder<C>
    where
        F: ConnectionFactory<C> + 'static,
    {
        PoolBuilder::new(factory)
    }

    /// Validate the configuration, fill the pool to its minimum size and
    /// start the background prune and validate tasks.
    pub fn initialize(&self) -> PoolResult<()> {
        let inner = &self.inner;
        let lifecycle = inner.lifecycle_lock.lock();
        match inner.state.lock().phase {
            Phase::Initialized => return Err(PoolError::AlreadyInitialized),
            Phase::Closed => return Err(PoolError::Closed),
            Phase::Uninitialized => {}
        }

        debug!(pool = %inner.name, "beginning pool initialization");
        let config = {
            let mut config = inner.config.write();
            check_consistency(&config, inner.hooks.has_validator())?;
            config.freeze();
            config.clone()
        };

        let strategy = Arc::clone(inner.prune_strategy.get_or_init(|| {
            debug!(pool = %inner.name, "no prune strategy configured, using idle prune strategy");
            let strategy: Arc<dyn PruneStrategy> = Arc::new(IdlePruneStrategy::default());
            strategy
        }));

        let min_pool_size = config.min_pool_size();
        let failure = match inner.grow(min_pool_size, inner.fail_fast_initialize) {
            Ok(size) if size < min_pool_size => Some(format!("pool size {size} is below minimum {min_pool_size}")),
            Ok(_) => None,
            Err(e) => Some(e.to_string()),
        };
        if let Some(reason) = failure {
            if inner.fail_fast_initialize {
                error!(pool = %inner.name, %reason, "pool initialization failed");
                drop(lifecycle);
                inner.close();
                return Err(PoolError::InitializationFailed(reason));
            }
            warn!(pool = %inner.name, %reason, "continuing with an undersized pool");
        }

        inner.state.lock().phase = Phase::Initialized;

        let prune_target = Arc::downgrade(inner);
        let validate_target = Arc::downgrade(inner);
        let tasks = vec![
            PeriodicTask::new("prune", strategy.prune_period(), move || {
                if let Some(pool) = Weak::upgrade(&prune_target) {
                    pool.run_task("prune", PoolInner::prune);
                }
            }),
            PeriodicTask::new("validate", config.validate_period(), move || {
                if let Some(pool) = Weak::upgrade(&validate_target) {
                    pool.run_task("validate", PoolInner::validate);
                }
            }),
        ];
        match Scheduler::start(format!("{}-maintenance", inner.name), tasks) {
            Ok(scheduler) => *inner.scheduler.lock() = Some(scheduler),
            Err(e) => {
                drop(lifecycle);
                inner.close();
                return Err(PoolError::InitializationFailed(e.to_string()));
            }
        }

        info!(
            pool = %inner.name,
            available = self.available_count(),
            min = min_pool_size,
            max = config.max_pool_size(),
            "pool initialized"
        );
        Ok(())
    }

    /// Check out a connection.
    ///
    /// Reuses an available connection, grows the pool when the sizing policy
    /// allows, and otherwise blocks for up to the configured block wait time.
    pub fn get_connection(&self) -> PoolResult<ConnectionProxy<C>> {
        self.inner.checkout()
    }

    /// Check out a connection without blocking the async runtime
    pub async fn get_connection_async(&self) -> PoolResult<ConnectionProxy<C>> {
        let pool = self.clone();
        tokio::task::spawn_blocking(move || pool.get_connection())
            .await
            .map_err(|_| PoolError::Interrupted)?
    }

    /// Return a connection to the pool.
    ///
    /// Returning the same proxy twice, or a proxy from another pool, is
    /// logged and otherwise ignored.
    pub fn put_connection(&self, proxy: &ConnectionProxy<C>) {
        if !proxy.belongs_to(&self.inner) {
            warn!(pool = %self.inner.name, connection = proxy.id(), "attempt to return connection from another pool");
            return;
        }
        proxy.release();
    }

    /// Evict available connections flagged by the prune strategy, never
    /// going below the minimum pool size.
    pub fn prune(&self) {
        self.inner.prune();
    }

    /// Validate available connections (when periodic validation is enabled)
    /// and grow back to the minimum pool size.
    pub fn validate(&self) {
        self.inner.validate();
    }

    /// Destroy every pooled connection and stop background tasks. The pool
    /// cannot be used afterwards.
    pub fn close(&self) {
        self.inner.close();
    }

    pub fn available_count(&self) -> usize {
        self.inner.state.lock().available.len()
    }

    pub fn active_count(&self) -> usize {
        self.inner.state.lock().active.len()
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.state.lock().phase == Phase::Initialized
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().phase == Phase::Closed
    }

    pub fn sizing(&self) -> SizingPolicy {
        self.inner.sizing
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> PoolConfig {
        self.inner.config.read().clone()
    }

    /// Modify the configuration; the setters fail once the pool is initialized.
    ///
    /// ```
    /// # use esox_connpool::{Connection, ConnectionError, ConnectionPool, PoolConfig, PoolError};
    /// # struct Socket;
    /// # impl Connection for Socket {
    /// #     fn open(&mut self) -> Result<(), ConnectionError> { Ok(()) }
    /// #     fn close(&mut self) {}
    /// #     fn is_open(&self) -> bool { true }
    /// # }
    /// let pool = ConnectionPool::new(|| Ok::<_, ConnectionError>(Socket), PoolConfig::new());
    /// pool.configure(|config| config.set_min_pool_size(1)).unwrap();
    /// pool.initialize().unwrap();
    ///
    /// let result = pool.configure(|config| config.set_max_pool_size(20));
    /// assert_eq!(result, Err(PoolError::ConfigFrozen));
    /// # pool.close();
    /// ```
    pub fn configure<R>(&self, f: impl FnOnce(&mut PoolConfig) -> PoolResult<R>) -> PoolResult<R> {
        f(&mut self.inner.config.write())
    }

    pub fn get_metrics(&self) -> PoolMetrics {
        let (available, active) = {
            let state = self.inner.state.lock();
            (state.available.len(), state.active.len())
        };
        let max_pool_size = self.inner.config.read().max_pool_size();
        self.inner.metrics.get_metrics(active, available, max_pool_size)
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format, labelled with the pool name
    pub fn export_metrics_prometheus(&self, tags: Option<&HashMap<String, String>>) -> String {
        MetricsExporter::export_prometheus(&self.get_metrics(), &self.inner.name, tags)
    }

    pub fn get_health_status(&self) -> HealthStatus {
        let metrics = self.get_metrics();
        HealthStatus::new(metrics.available_connections, metrics.active_connections, metrics.max_pool_size)
    }
}

fn check_consistency(config: &PoolConfig, has_validator: bool) -> PoolResult<()> {
    if config.max_pool_size() == 0 {
        return Err(PoolError::Configuration("max pool size must be greater than zero".into()));
    }
    if config.min_pool_size() > config.max_pool_size() {
        return Err(PoolError::Configuration(format!(
            "min pool size {} exceeds max pool size {}",
            config.min_pool_size(),
            config.max_pool_size()
        )));
    }
    if config.is_validation_enabled() && !has_validator {
        return Err(PoolError::Configuration(
            "validation is enabled but no validator has been configured".into(),
        ));
    }
    if has_validator && !config.is_validation_enabled() {
        return Err(PoolError::Configuration(
            "validator configured but no validate flag has been set".into(),
        ));
    }
    Ok(())
}

/// Builder for [`ConnectionPool`]
pub struct PoolBuilder<C: Connection + 'static> {
    name: Option<String>,
    config: PoolConfig,
    factory: Box<dyn ConnectionFactory<C>>,
    hooks: LifecycleHooks<C>,
    prune_strategy: Option<Arc<dyn PruneStrategy>>,
    sizing: SizingPolicy,
    queue_type: QueueType,
    block_wait_time: Duration,
    fail_fast_initialize: bool,
}

impl<C: Connection + 'static> PoolBuilder<C> {
    fn new<F>(factory: F) -> Self
    where
        F: ConnectionFactory<C> + 'static,
    {
        Self {
            name: None,
            config: PoolConfig::default(),
            factory: Box::new(factory),
            hooks: LifecycleHooks::default(),
            prune_strategy: None,
            sizing: SizingPolicy::default(),
            queue_type: QueueType::default(),
            block_wait_time: Duration::ZERO,
            fail_fast_initialize: true,
        }
    }

    /// Name used in log events and for the maintenance thread
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sizing(mut self, sizing: SizingPolicy) -> Self {
        self.sizing = sizing;
        self
    }

    pub fn queue_type(mut self, queue_type: QueueType) -> Self {
        self.queue_type = queue_type;
        self
    }

    /// Longest time a checkout waits for a connection; zero waits forever
    pub fn block_wait_time(mut self, wait: Duration) -> Self {
        self.block_wait_time = wait;
        self
    }

    /// Whether `initialize` fails when the minimum pool size cannot be reached
    pub fn fail_fast_initialize(mut self, fail_fast: bool) -> Self {
        self.fail_fast_initialize = fail_fast;
        self
    }

    pub fn prune_strategy(mut self, strategy: impl PruneStrategy + 'static) -> Self {
        self.prune_strategy = Some(Arc::new(strategy));
        self
    }

    pub fn activator(mut self, activator: impl ConnectionActivator<C> + 'static) -> Self {
        self.hooks.activator = Some(Arc::new(activator));
        self
    }

    pub fn passivator(mut self, passivator: impl ConnectionPassivator<C> + 'static) -> Self {
        self.hooks.passivator = Some(Arc::new(passivator));
        self
    }

    pub fn validator(mut self, validator: impl ConnectionValidator<C> + 'static) -> Self {
        self.hooks.validator = Some(Arc::new(validator));
        self
    }

    pub fn build(self) -> ConnectionPool<C> {
        let name = self
            .name
            .unwrap_or_else(|| format!("connpool-{}", POOL_COUNTER.fetch_add(1, Ordering::Relaxed)));
        let prune_strategy = OnceLock::new();
        if let Some(strategy) = self.prune_strategy {
            let _ = prune_strategy.set(strategy);
        }

        ConnectionPool {
            inner: Arc::new(PoolInner {
                name,
                config: RwLock::new(self.config),
                factory: self.factory,
                hooks: self.hooks,
                prune_strategy,
                sizing: self.sizing,
                block_wait_time: self.block_wait_time,
                fail_fast_initialize: self.fail_fast_initialize,
                state: Mutex::new(PoolState {
                    phase: Phase::Uninitialized,
                    available: Queue::new(self.queue_type),
                    active: Queue::new(self.queue_type),
                }),
                available_cond: Condvar::new(),
                create_lock: Mutex::new(()),
                lifecycle_lock: Mutex::new(()),
                scheduler: Mutex::new(None),
                metrics: MetricsTracker::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }
}
