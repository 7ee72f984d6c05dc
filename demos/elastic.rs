//! Elastic sizing, pruning and async checkout

use esox_connpool::{
    AgePruneStrategy, Connection, ConnectionError, ConnectionPool, Endpoint, IdlePruneStrategy, PoolConfig,
    QueueType, SizingPolicy,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

struct ReplicaConnection {
    endpoint: Endpoint,
    open: bool,
}

impl Connection for ReplicaConnection {
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

fn replica() -> Result<ReplicaConnection, ConnectionError> {
    Ok(ReplicaConnection {
        endpoint: Endpoint::new("ldap://replica.example.com:389"),
        open: false,
    })
}

#[tokio::main]
async fn main() {
    println!("=== esox_connpool - Elastic Pools ===\n");

    // Example 1: Elastic burst and idle pruning
    elastic_burst();

    // Example 2: Age pruning with endpoint priorities
    age_pruning();

    // Example 3: Async checkout
    async_checkout().await;

    // Example 4: Prometheus export
    prometheus_export();
}

fn elastic_burst() {
    println!("1. Elastic Burst:");
    let pool = ConnectionPool::builder(replica)
        .config(PoolConfig::new().with_min_pool_size(1).with_max_pool_size(2))
        .sizing(SizingPolicy::Elastic)
        .queue_type(QueueType::Fifo)
        .prune_strategy(IdlePruneStrategy::new(Duration::from_millis(50), Duration::from_millis(100)))
        .build();
    pool.initialize().unwrap();

    let burst: Vec<_> = (0..6).filter_map(|_| pool.get_connection().ok()).collect();
    println!("   Active during burst: {} (max {})", pool.active_count(), pool.config().max_pool_size());
    drop(burst);
    println!("   Available after burst: {}", pool.available_count());

    thread::sleep(Duration::from_millis(400));
    println!("   Available after pruning: {}\n", pool.available_count());
    pool.close();
}

fn age_pruning() {
    println!("2. Age Pruning:");
    let next_priority = AtomicU32::new(0);
    let pool = ConnectionPool::builder(move || {
        let priority = next_priority.fetch_add(1, Ordering::Relaxed) % 3;
        Ok::<_, ConnectionError>(ReplicaConnection {
            endpoint: Endpoint::new(format!("ldap://server{priority}.example.com")).with_priority(priority),
            open: false,
        })
    })
    .config(PoolConfig::new().with_min_pool_size(0).with_max_pool_size(3))
    .prune_strategy(AgePruneStrategy::new(Duration::from_secs(3600), Duration::from_secs(1)).with_priority_threshold(1, 4))
    .build();
    pool.initialize().unwrap();

    let held: Vec<_> = (0..3).filter_map(|_| pool.get_connection().ok()).collect();
    drop(held);
    thread::sleep(Duration::from_millis(200));
    pool.prune();
    println!("   Connections left after pruning secondary servers: {}\n", pool.available_count());
    pool.close();
}

async fn async_checkout() {
    println!("3. Async Checkout:");
    let pool = ConnectionPool::new(replica, PoolConfig::new().with_min_pool_size(2).with_max_pool_size(4));
    pool.initialize().unwrap();

    let mut tasks = Vec::new();
    for i in 0..4 {
        let pool = pool.clone();
        tasks.push(tokio::spawn(async move {
            match pool.get_connection_async().await {
                Ok(conn) => println!("   Task {i} got connection {}", conn.id()),
                Err(e) => println!("   Task {i} failed: {e}"),
            }
        }));
    }
    for task in tasks {
        let _ = task.await;
    }
    println!("   Available: {}\n", pool.available_count());
    pool.close();
}

fn prometheus_export() {
    println!("4. Prometheus Export:");
    let pool = ConnectionPool::builder(replica).name("replica").build();
    pool.initialize().unwrap();
    let _conn = pool.get_connection().unwrap();

    let mut tags = HashMap::new();
    tags.insert("region".to_string(), "eu-west".to_string());
    for line in pool.export_metrics_prometheus(Some(&tags)).lines().take(6) {
        println!("   {line}");
    }
    pool.close();
}
