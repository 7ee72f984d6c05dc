mod common;

use common::{MockConnection, MockFactory};
use esox_connpool::{
    AgePruneStrategy, Connection, ConnectionError, ConnectionPool, Endpoint, IdlePruneStrategy, PoolConfig, PoolError,
    QueueType, SizingPolicy,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

fn config(min: usize, max: usize) -> PoolConfig {
    PoolConfig::new().with_min_pool_size(min).with_max_pool_size(max)
}

fn strict_pool(factory: &MockFactory, min: usize, max: usize, wait: Duration) -> ConnectionPool<MockConnection> {
    ConnectionPool::builder(factory.clone())
        .config(config(min, max))
        .block_wait_time(wait)
        .build()
}

#[test]
fn test_fixed_size_pool_counts() {
    let factory = MockFactory::new();
    let pool = strict_pool(&factory, 2, 2, Duration::from_millis(50));
    pool.initialize().unwrap();
    assert_eq!(pool.available_count(), 2);
    assert_eq!(pool.active_count(), 0);

    let first = pool.get_connection().unwrap();
    let second = pool.get_connection().unwrap();
    assert_eq!(pool.available_count(), 0);
    assert_eq!(pool.active_count(), 2);
    assert_ne!(first.id(), second.id());

    let third = pool.get_connection();
    assert_eq!(third.err(), Some(PoolError::BlockingTimeout(Duration::from_millis(50))));
    assert_eq!(factory.created(), 2);
    pool.close();
}

#[test]
fn test_blocking_timeout_boundary() {
    let factory = MockFactory::new();
    let pool = strict_pool(&factory, 1, 1, Duration::from_millis(100));
    pool.initialize().unwrap();

    let start = Instant::now();
    let held = pool.get_connection().unwrap();
    assert!(start.elapsed() < Duration::from_millis(100));

    let waiter = pool.clone();
    let handle = thread::spawn(move || {
        let start = Instant::now();
        let result = waiter.get_connection().map(|c| c.id());
        (result, start.elapsed())
    });
    let (result, elapsed) = handle.join().unwrap();

    assert_eq!(result, Err(PoolError::BlockingTimeout(Duration::from_millis(100))));
    assert!(elapsed >= Duration::from_millis(90), "gave up after {elapsed:?}");
    assert_eq!(pool.get_metrics().blocking_timeouts, 1);
    drop(held);
    pool.close();
}

#[test]
fn test_blocked_checkout_wakes_on_check_in() {
    let factory = MockFactory::new();
    let pool = strict_pool(&factory, 1, 1, Duration::ZERO);
    pool.initialize().unwrap();

    let held = pool.get_connection().unwrap();
    let held_id = held.id();
    let waiter = pool.clone();
    let handle = thread::spawn(move || waiter.get_connection().map(|c| c.id()));

    thread::sleep(Duration::from_millis(50));
    pool.put_connection(&held);
    assert_eq!(handle.join().unwrap(), Ok(held_id));
    pool.close();
}

#[test]
fn test_round_trip_returns_same_connection() {
    let factory = MockFactory::new();
    let pool = strict_pool(&factory, 1, 3, Duration::ZERO);
    pool.initialize().unwrap();

    let conn = pool.get_connection().unwrap();
    let id = conn.id();
    pool.put_connection(&conn);
    assert_eq!(pool.available_count(), 1);
    assert_eq!(pool.active_count(), 0);

    let again = pool.get_connection().unwrap();
    assert_eq!(again.id(), id);
    assert_eq!(factory.created(), 1);
    drop(again);
    drop(conn);
    pool.close();
}

#[test]
fn test_double_check_in_is_ignored() {
    let factory = MockFactory::new();
    let pool = strict_pool(&factory, 1, 3, Duration::ZERO);
    pool.initialize().unwrap();

    let conn = pool.get_connection().unwrap();
    pool.put_connection(&conn);
    pool.put_connection(&conn);
    drop(conn);

    assert_eq!(pool.available_count(), 1);
    assert_eq!(pool.active_count(), 0);
    assert_eq!(pool.get_metrics().total_checked_in, 1);
    pool.close();
}

#[test]
fn test_proxy_close_checks_in() {
    let factory = MockFactory::new();
    let pool = strict_pool(&factory, 1, 3, Duration::ZERO);
    pool.initialize().unwrap();

    let mut conn = pool.get_connection().unwrap();
    Connection::close(&mut conn);
    assert!(conn.is_returned());
    assert_eq!(pool.available_count(), 1);
    assert_eq!(factory.closed(), 0);
    pool.close();
    assert_eq!(factory.closed(), 1);
}

#[test]
fn test_proxy_open_reopens_in_place() {
    let factory = MockFactory::new();
    let pool = strict_pool(&factory, 1, 1, Duration::ZERO);
    pool.initialize().unwrap();

    let mut conn = pool.get_connection().unwrap();
    let id = conn.id();
    conn.lock().unwrap().close();
    assert!(!conn.is_open());

    conn.open().unwrap();
    assert!(conn.is_open());
    assert_eq!(conn.id(), id);
    drop(conn);

    assert_eq!(pool.available_count(), 1);
    pool.close();
}

#[test]
fn test_returned_proxy_cannot_reach_connection() {
    let factory = MockFactory::new();
    let pool = strict_pool(&factory, 1, 1, Duration::from_millis(100));
    pool.initialize().unwrap();

    let mut first = pool.get_connection().unwrap();
    pool.put_connection(&first);
    let second = pool.get_connection().unwrap();
    assert_eq!(first.id(), second.id());

    assert!(first.lock().is_none());
    assert!(!first.is_open());
    assert_eq!(first.open(), Err(ConnectionError::Returned));
    assert_eq!(first.reopen(), Err(ConnectionError::Returned));

    assert!(second.is_open());
    assert!(second.lock().is_some());
    assert_eq!(factory.closed(), 0);
    drop(second);
    drop(first);
    assert_eq!(pool.available_count(), 1);
    pool.close();
}

#[test]
fn test_destroyed_check_in_lets_waiter_grow() {
    let factory = MockFactory::new();
    let pool = strict_pool(&factory, 0, 1, Duration::from_secs(5));
    pool.initialize().unwrap();

    let held = pool.get_connection().unwrap();
    let waiter = pool.clone();
    let handle = thread::spawn(move || {
        let start = Instant::now();
        let result = waiter.get_connection().map(|c| c.id());
        (result, start.elapsed())
    });

    thread::sleep(Duration::from_millis(50));
    let held_id = held.id();
    held.lock().unwrap().close();
    drop(held);

    let (result, elapsed) = handle.join().unwrap();
    let id = result.unwrap();
    assert_ne!(id, held_id);
    assert!(elapsed < Duration::from_secs(2), "waited {elapsed:?}");
    assert_eq!(factory.created(), 2);
    assert_eq!(pool.get_metrics().blocking_timeouts, 0);
    pool.close();
}

#[test]
fn test_failed_activation_wakes_other_waiter() {
    let activations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&activations);
    let factory = MockFactory::new();
    let pool = ConnectionPool::builder(factory.clone())
        .config(config(0, 1))
        .block_wait_time(Duration::from_secs(5))
        // the second activation rejects the connection
        .activator(move |_: &mut MockConnection| counter.fetch_add(1, Ordering::SeqCst) != 1)
        .build();
    pool.initialize().unwrap();

    let held = pool.get_connection().unwrap();
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let waiter = pool.clone();
            thread::spawn(move || {
                let start = Instant::now();
                let result = waiter.get_connection().map(|c| c.id());
                (result, start.elapsed())
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(100));
    drop(held);

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let failed = results
        .iter()
        .filter(|(r, _)| *r == Err(PoolError::ActivationFailed))
        .count();
    let served = results.iter().filter(|(r, _)| r.is_ok()).count();
    assert_eq!((failed, served), (1, 1), "{results:?}");
    assert!(results.iter().all(|(_, elapsed)| *elapsed < Duration::from_secs(2)));
    assert_eq!(activations.load(Ordering::SeqCst), 3);
    pool.close();
}

#[test]
fn test_closed_connection_destroyed_on_check_in() {
    let factory = MockFactory::new();
    let pool = strict_pool(&factory, 1, 2, Duration::ZERO);
    pool.initialize().unwrap();

    let conn = pool.get_connection().unwrap();
    conn.lock().unwrap().close();
    drop(conn);

    assert_eq!(pool.available_count() + pool.active_count(), 0);
    assert_eq!(pool.get_metrics().connections_destroyed, 1);

    pool.validate();
    assert_eq!(pool.available_count(), 1);
    pool.close();
}

#[test]
fn test_failing_checkout_validator() {
    let factory = MockFactory::new();
    let pool = ConnectionPool::builder(factory.clone())
        .config(config(3, 5).with_validate_on_check_out(true))
        .validator(|_: &mut MockConnection| false)
        .build();
    pool.initialize().unwrap();
    assert_eq!(pool.available_count(), 3);

    for expected in [2, 1, 0, 0] {
        assert_eq!(pool.get_connection().err(), Some(PoolError::ValidationFailed));
        assert_eq!(pool.available_count(), expected);
        assert_eq!(pool.active_count(), 0);
    }

    pool.validate();
    assert_eq!(pool.available_count(), 3);
    assert_eq!(pool.get_metrics().validation_failures, 4);
    pool.close();
}

#[test]
fn test_activation_failure_destroys_connection() {
    let factory = MockFactory::new();
    let pool = ConnectionPool::builder(factory.clone())
        .config(config(1, 2))
        .activator(|_: &mut MockConnection| false)
        .build();
    pool.initialize().unwrap();

    assert_eq!(pool.get_connection().err(), Some(PoolError::ActivationFailed));
    assert_eq!(pool.available_count() + pool.active_count(), 0);
    assert_eq!(factory.closed(), 1);
    pool.close();
}

#[test]
fn test_check_in_validation_failure_destroys_connection() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let factory = MockFactory::new();
    let pool = ConnectionPool::builder(factory.clone())
        .config(config(1, 2).with_validate_on_check_in(true))
        .validator(move |_: &mut MockConnection| {
            counter.fetch_add(1, Ordering::SeqCst);
            false
        })
        .build();
    pool.initialize().unwrap();

    drop(pool.get_connection().unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(pool.available_count(), 0);
    assert_eq!(factory.closed(), 1);
    pool.close();
}

#[test]
fn test_pool_exhausted_when_creation_fails() {
    let factory = MockFactory::new();
    factory.set_failing(true);
    let pool = ConnectionPool::builder(factory.clone())
        .config(config(1, 2))
        .fail_fast_initialize(false)
        .build();
    pool.initialize().unwrap();
    assert_eq!(pool.available_count(), 0);

    assert_eq!(pool.get_connection().err(), Some(PoolError::PoolExhausted));
    assert!(pool.get_metrics().creation_failures >= 2);

    factory.set_failing(false);
    assert!(pool.get_connection().is_ok());
    pool.close();
}

#[test]
fn test_fail_fast_initialize() {
    let factory = MockFactory::new();
    factory.set_failing(true);
    let pool = strict_pool(&factory, 2, 4, Duration::ZERO);

    assert!(matches!(pool.initialize(), Err(PoolError::InitializationFailed(_))));
    assert!(pool.is_closed());
}

#[test]
fn test_strict_and_elastic_diverge_under_burst() {
    let strict_factory = MockFactory::new();
    let strict = strict_pool(&strict_factory, 1, 2, Duration::from_millis(20));
    let elastic_factory = MockFactory::new();
    let elastic = ConnectionPool::builder(elastic_factory.clone())
        .config(config(1, 2))
        .sizing(SizingPolicy::Elastic)
        .prune_strategy(IdlePruneStrategy::new(Duration::from_secs(3600), Duration::from_millis(5)))
        .build();
    strict.initialize().unwrap();
    elastic.initialize().unwrap();

    let strict_held: Vec<_> = (0..5).filter_map(|_| strict.get_connection().ok()).collect();
    let elastic_held: Vec<_> = (0..5).filter_map(|_| elastic.get_connection().ok()).collect();

    assert_eq!(strict_held.len(), 2);
    assert_eq!(strict.available_count() + strict.active_count(), 2);
    assert_eq!(elastic_held.len(), 5);
    assert_eq!(elastic.active_count(), 5);

    drop(elastic_held);
    assert_eq!(elastic.available_count(), 5);
    thread::sleep(Duration::from_millis(30));
    elastic.prune();
    assert_eq!(elastic.available_count() + elastic.active_count(), 1);

    drop(strict_held);
    strict.close();
    elastic.close();
}

#[test]
fn test_idle_strategy_zero_never_prunes() {
    let factory = MockFactory::new();
    let pool = ConnectionPool::builder(factory.clone())
        .config(config(1, 4))
        .prune_strategy(IdlePruneStrategy::new(Duration::from_secs(3600), Duration::ZERO))
        .build();
    pool.initialize().unwrap();

    let held: Vec<_> = (0..4).map(|_| pool.get_connection().unwrap()).collect();
    drop(held);
    thread::sleep(Duration::from_millis(20));
    pool.prune();
    assert_eq!(pool.available_count(), 4);
    pool.close();
}

#[test]
fn test_scheduled_prune_shrinks_to_minimum() {
    let factory = MockFactory::new();
    let pool = ConnectionPool::builder(factory.clone())
        .config(config(2, 6))
        .prune_strategy(IdlePruneStrategy::new(Duration::from_millis(20), Duration::from_millis(10)))
        .build();
    pool.initialize().unwrap();

    let held: Vec<_> = (0..6).map(|_| pool.get_connection().unwrap()).collect();
    drop(held);
    assert_eq!(pool.available_count(), 6);

    let deadline = Instant::now() + Duration::from_secs(5);
    while pool.available_count() > 2 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(pool.available_count(), 2);
    assert_eq!(pool.get_metrics().connections_pruned, 4);
    pool.close();
}

#[test]
fn test_age_strategy_rotates_low_priority_endpoints() {
    let factory = MockFactory::with_endpoint(Endpoint::new("ldap://replica.example.com").with_priority(3));
    let pool = ConnectionPool::builder(factory.clone())
        .config(config(0, 4))
        .prune_strategy(
            AgePruneStrategy::new(Duration::from_secs(3600), Duration::from_secs(2)).with_priority_threshold(1, 10),
        )
        .build();
    pool.initialize().unwrap();

    drop(pool.get_connection().unwrap());
    assert_eq!(pool.available_count(), 1);

    // window is 2s / (10 * 4) = 50ms
    thread::sleep(Duration::from_millis(80));
    pool.prune();
    assert_eq!(pool.available_count(), 0);
    pool.close();
}

#[test]
fn test_periodic_validation_runs_in_background() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let factory = MockFactory::new();
    let pool = ConnectionPool::builder(factory.clone())
        .config(
            config(2, 4)
                .with_validate_periodically(true)
                .with_validate_period(Duration::from_millis(20)),
        )
        .validator(move |_: &mut MockConnection| {
            counter.fetch_add(1, Ordering::SeqCst) % 2 == 0
        })
        .build();
    pool.initialize().unwrap();

    thread::sleep(Duration::from_millis(200));
    assert!(calls.load(Ordering::SeqCst) > 2);
    assert!(pool.get_metrics().validation_failures > 0);
    pool.close();
    assert_eq!(pool.available_count(), 0);
}

#[test]
fn test_queue_type_controls_reuse_order() {
    let lifo = ConnectionPool::builder(MockFactory::new())
        .config(config(2, 2))
        .queue_type(QueueType::Lifo)
        .build();
    let fifo = ConnectionPool::builder(MockFactory::new())
        .config(config(2, 2))
        .queue_type(QueueType::Fifo)
        .build();
    lifo.initialize().unwrap();
    fifo.initialize().unwrap();

    let first = lifo.get_connection().unwrap().id();
    let second = lifo.get_connection().unwrap().id();
    assert_eq!(first, second);

    let first = fifo.get_connection().unwrap().id();
    let second = fifo.get_connection().unwrap().id();
    assert_ne!(first, second);

    lifo.close();
    fifo.close();
}

#[test]
fn test_close_interrupts_blocked_checkout() {
    let factory = MockFactory::new();
    let pool = strict_pool(&factory, 1, 1, Duration::ZERO);
    pool.initialize().unwrap();

    let held = pool.get_connection().unwrap();
    let waiter = pool.clone();
    let handle = thread::spawn(move || waiter.get_connection().map(|c| c.id()));

    thread::sleep(Duration::from_millis(50));
    pool.close();
    assert_eq!(handle.join().unwrap(), Err(PoolError::Interrupted));
    assert!(!held.is_open());
}

#[test]
fn test_config_frozen_after_initialize() {
    let pool = strict_pool(&MockFactory::new(), 1, 2, Duration::ZERO);
    pool.configure(|c| c.set_max_pool_size(3)).unwrap();
    pool.initialize().unwrap();

    assert_eq!(pool.configure(|c| c.set_max_pool_size(8)), Err(PoolError::ConfigFrozen));
    assert_eq!(pool.config().max_pool_size(), 3);
    assert!(pool.config().is_frozen());
    pool.close();
}

#[test]
fn test_metrics_and_health() {
    let factory = MockFactory::new();
    let pool = ConnectionPool::builder(factory.clone())
        .name("directory")
        .config(config(1, 2))
        .build();
    pool.initialize().unwrap();

    let conn = pool.get_connection().unwrap();
    let metrics = pool.get_metrics();
    assert_eq!(metrics.total_checked_out, 1);
    assert_eq!(metrics.active_connections, 1);
    assert_eq!(metrics.connections_created, 1);

    let output = pool.export_metrics_prometheus(None);
    assert!(output.contains("connpool_connections_active{pool=\"directory\"} 1"));
    assert!(pool.get_health_status().is_healthy());

    drop(conn);
    assert_eq!(pool.export_metrics()["total_checked_in"], "1");
    pool.close();
}

#[test]
fn test_proxy_from_another_pool_is_ignored() {
    let a = strict_pool(&MockFactory::new(), 1, 1, Duration::ZERO);
    let b = strict_pool(&MockFactory::new(), 1, 1, Duration::ZERO);
    a.initialize().unwrap();
    b.initialize().unwrap();

    let conn = a.get_connection().unwrap();
    b.put_connection(&conn);
    assert!(!conn.is_returned());
    assert_eq!(a.active_count(), 1);
    assert_eq!(b.available_count(), 1);

    drop(conn);
    assert_eq!(a.available_count(), 1);
    a.close();
    b.close();
}
