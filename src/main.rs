// esox_connpool - connection pool demo binary
// Run the demos with: cargo run --example basic

use esox_connpool::{Connection, ConnectionError, ConnectionPool, PoolConfig};

struct LoopbackConnection {
    open: bool,
}

impl Connection for LoopbackConnection {
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
}

fn main() {
    println!("=== esox_connpool ===");
    println!("See demos/ directory for usage examples");
    println!("Run: cargo run --example basic");
    println!();

    let pool = ConnectionPool::new(
        || Ok::<_, ConnectionError>(LoopbackConnection { open: false }),
        PoolConfig::new().with_min_pool_size(2).with_max_pool_size(4),
    );
    if let Err(e) = pool.initialize() {
        eprintln!("  Could not initialize pool: {e}");
        return;
    }

    println!("Quick Demo:");
    match pool.get_connection() {
        Ok(conn) => println!("  Checked out connection {}", conn.id()),
        Err(e) => println!("  Checkout failed: {e}"),
    }

    println!("  Available after return: {}", pool.available_count());
    pool.close();
}
