//! Health monitoring for connection pools

/// Health status of a connection pool
///
/// # Examples
///
/// ```
/// use esox_connpool::HealthStatus;
///
/// let health = HealthStatus::new(3, 1, 10);
/// assert!(health.is_healthy());
/// assert_eq!(health.available_connections, 3);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HealthStatus {
    /// Whether the pool is healthy
    pub is_healthy: bool,

    /// Number of warnings detected
    pub warning_count: usize,

    /// Active connections relative to the maximum pool size
    pub utilization: f64,

    pub available_connections: usize,

    pub active_connections: usize,

    pub max_pool_size: usize,

    /// Warning messages
    pub warnings: Vec<String>,
}

impl HealthStatus {
    /// Create a new health status
    pub fn new(available: usize, active: usize, max_pool_size: usize) -> Self {
        let utilization = if max_pool_size > 0 {
            active as f64 / max_pool_size as f64
        } else {
            0.0
        };

        let mut warnings = Vec::new();
        let mut is_healthy = true;

        if utilization > 0.9 {
            warnings.push(format!("High utilization: {:.1}%", utilization * 100.0));
            is_healthy = false;
        }

        if available + active > max_pool_size {
            warnings.push(format!(
                "Pool grew past its maximum size: {} > {}",
                available + active,
                max_pool_size
            ));
        }

        if available == 0 && max_pool_size > 0 {
            warnings.push("No available connections".to_string());
        }

        Self {
            is_healthy,
            warning_count: warnings.len(),
            utilization,
            available_connections: available,
            active_connections: active,
            max_pool_size,
            warnings,
        }
    }

    /// Check if the pool is healthy
    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }
}
