//! Basic usage of the connection pool

use esox_connpool::{Connection, ConnectionError, ConnectionPool, Endpoint, PoolConfig, PoolError};
use std::time::Duration;

struct DirectoryConnection {
    endpoint: Endpoint,
    open: bool,
    binds: usize,
}

impl DirectoryConnection {
    fn connect(address: &str) -> Result<Self, ConnectionError> {
        Ok(Self {
            endpoint: Endpoint::new(address),
            open: false,
            binds: 0,
        })
    }

    fn bind(&mut self) {
        self.binds += 1;
    }
}

impl Connection for DirectoryConnection {
    fn open(&mut self) -> Result<(), ConnectionError> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn endpoint(&self) -> Option<&Endpoint> {
        Some(&self.endpoint)
    }
}

fn main() {
    println!("=== esox_connpool - Basic Examples ===\n");

    // Example 1: Checkout and automatic return
    simple_pool();

    // Example 2: Lifecycle hooks
    lifecycle_hooks();

    // Example 3: Bounded blocking
    bounded_blocking();

    // Example 4: Metrics and health
    metrics_and_health();
}

fn simple_pool() {
    println!("1. Simple Pool:");
    let pool = ConnectionPool::new(
        || DirectoryConnection::connect("ldap://localhost:389"),
        PoolConfig::new().with_min_pool_size(2).with_max_pool_size(5),
    );
    if let Err(e) = pool.initialize() {
        println!("   Initialization failed: {e}");
        return;
    }

    {
        let conn = pool.get_connection().unwrap();
        if let Some(mut raw) = conn.lock() {
            raw.bind();
        }
        println!("   Got connection {} to {:?}", conn.id(), conn.endpoint().map(|e| &e.address));
        // Connection automatically returned when dropped
    }

    println!("   Available after return: {}\n", pool.available_count());
    pool.close();
}

fn lifecycle_hooks() {
    println!("2. Lifecycle Hooks:");
    let pool = ConnectionPool::builder(|| DirectoryConnection::connect("ldap://localhost:389"))
        .config(
            PoolConfig::new()
                .with_min_pool_size(1)
                .with_max_pool_size(3)
                .with_validate_on_check_out(true),
        )
        .activator(|conn: &mut DirectoryConnection| {
            conn.bind();
            true
        })
        .passivator(|conn: &mut DirectoryConnection| {
            conn.binds = 0;
            true
        })
        .validator(|conn: &mut DirectoryConnection| conn.is_open())
        .build();
    pool.initialize().unwrap();

    {
        let conn = pool.get_connection().unwrap();
        println!("   Binds after activation: {}", conn.lock().map_or(0, |raw| raw.binds));
    }
    {
        let conn = pool.get_connection().unwrap();
        println!("   Binds after passivation and reactivation: {}\n", conn.lock().map_or(0, |raw| raw.binds));
    }
    pool.close();
}

fn bounded_blocking() {
    println!("3. Bounded Blocking:");
    let pool = ConnectionPool::builder(|| DirectoryConnection::connect("ldap://localhost:389"))
        .config(PoolConfig::new().with_min_pool_size(1).with_max_pool_size(1))
        .block_wait_time(Duration::from_millis(100))
        .build();
    pool.initialize().unwrap();

    let held = pool.get_connection().unwrap();
    match pool.get_connection() {
        Err(PoolError::BlockingTimeout(wait)) => println!("   Gave up after {wait:?}"),
        Err(e) => println!("   Unexpected error: {e}"),
        Ok(_) => println!("   Unexpectedly got a second connection"),
    }
    drop(held);

    let conn = pool.get_connection().unwrap();
    println!("   Got connection {} after return\n", conn.id());
    drop(conn);
    pool.close();
}

fn metrics_and_health() {
    println!("4. Metrics and Health:");
    let pool = ConnectionPool::builder(|| DirectoryConnection::connect("ldap://localhost:389"))
        .name("directory")
        .config(PoolConfig::new().with_min_pool_size(2).with_max_pool_size(4))
        .build();
    pool.initialize().unwrap();

    let _conn1 = pool.get_connection().unwrap();
    let _conn2 = pool.get_connection().unwrap();

    let metrics = pool.get_metrics();
    println!("   Checked out: {}", metrics.total_checked_out);
    println!("   Active: {}", metrics.active_connections);
    println!("   Utilization: {:.1}%", metrics.utilization * 100.0);

    let health = pool.get_health_status();
    println!("   Healthy: {}", health.is_healthy());
    for warning in &health.warnings {
        println!("   Warning: {warning}");
    }
    println!();
    pool.close();
}
