//! Metrics collection and export for connection pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Metrics data for a pool
///
/// # Examples
///
/// ```
/// use esox_connpool::PoolMetrics;
///
/// let metrics = PoolMetrics::default();
/// let exported = metrics.export();
/// assert_eq!(exported["connections_created"], "0");
/// ```
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Connections opened by the pool
    pub connections_created: usize,

    /// Connections closed by the pool
    pub connections_destroyed: usize,

    /// Successful checkouts
    pub total_checked_out: usize,

    /// Successful check-ins
    pub total_checked_in: usize,

    /// Connection create/open failures
    pub creation_failures: usize,

    pub activation_failures: usize,

    /// Checkout, check-in and periodic validation failures
    pub validation_failures: usize,

    pub passivation_failures: usize,

    /// Checkouts that gave up after the block wait time
    pub blocking_timeouts: usize,

    /// Connections evicted by the prune strategy
    pub connections_pruned: usize,

    /// Current active connections
    pub active_connections: usize,

    /// Current available connections
    pub available_connections: usize,

    /// Active connections relative to the configured maximum (may exceed 1.0
    /// for an elastic pool)
    pub utilization: f64,

    pub max_pool_size: usize,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("connections_created".to_string(), self.connections_created.to_string());
        metrics.insert("connections_destroyed".to_string(), self.connections_destroyed.to_string());
        metrics.insert("total_checked_out".to_string(), self.total_checked_out.to_string());
        metrics.insert("total_checked_in".to_string(), self.total_checked_in.to_string());
        metrics.insert("creation_failures".to_string(), self.creation_failures.to_string());
        metrics.insert("activation_failures".to_string(), self.activation_failures.to_string());
        metrics.insert("validation_failures".to_string(), self.validation_failures.to_string());
        metrics.insert("passivation_failures".to_string(), self.passivation_failures.to_string());
        metrics.insert("blocking_timeouts".to_string(), self.blocking_timeouts.to_string());
        metrics.insert("connections_pruned".to_string(), self.connections_pruned.to_string());
        metrics.insert("active_connections".to_string(), self.active_connections.to_string());
        metrics.insert("available_connections".to_string(), self.available_connections.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics.insert("max_pool_size".to_string(), self.max_pool_size.to_string());
        metrics
    }
}

/// Metrics exporter for Prometheus format
pub struct MetricsExporter;

impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_connpool::{MetricsExporter, PoolMetrics};
    /// use std::collections::HashMap;
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "directory".to_string());
    ///
    /// let output = MetricsExporter::export_prometheus(&PoolMetrics::default(), "ldap", Some(&tags));
    /// assert!(output.contains("connpool_connections_active"));
    /// assert!(output.contains("service=\"directory\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        let mut output = String::new();
        let labels = Self::format_labels(pool_name, tags);

        let gauges: [(&str, &str, String); 3] = [
            ("connpool_connections_active", "Current active connections", metrics.active_connections.to_string()),
            ("connpool_connections_available", "Current available connections", metrics.available_connections.to_string()),
            ("connpool_utilization", "Active connections relative to max pool size", format!("{:.2}", metrics.utilization)),
        ];
        for (name, help, value) in &gauges {
            Self::push_metric(&mut output, name, help, "gauge", &labels, value);
        }

        let counters: [(&str, &str, usize); 10] = [
            ("connpool_connections_created_total", "Connections created", metrics.connections_created),
            ("connpool_connections_destroyed_total", "Connections destroyed", metrics.connections_destroyed),
            ("connpool_checkouts_total", "Successful checkouts", metrics.total_checked_out),
            ("connpool_checkins_total", "Successful check-ins", metrics.total_checked_in),
            ("connpool_creation_failures_total", "Connection creation failures", metrics.creation_failures),
            ("connpool_activation_failures_total", "Activation failures", metrics.activation_failures),
            ("connpool_validation_failures_total", "Validation failures", metrics.validation_failures),
            ("connpool_passivation_failures_total", "Passivation failures", metrics.passivation_failures),
            ("connpool_blocking_timeouts_total", "Checkouts that exceeded the block wait time", metrics.blocking_timeouts),
            ("connpool_connections_pruned_total", "Connections evicted by pruning", metrics.connections_pruned),
        ];
        for (name, help, value) in &counters {
            Self::push_metric(&mut output, name, help, "counter", &labels, &value.to_string());
        }

        output
    }

    /// Register a snapshot of the metrics as gauges in a Prometheus registry
    #[cfg(feature = "prometheus")]
    pub fn register(
        metrics: &PoolMetrics,
        pool_name: &str,
        registry: &prometheus::Registry,
    ) -> prometheus::Result<()> {
        use prometheus::{IntGauge, Opts};

        let values: [(&str, &str, usize); 6] = [
            ("connpool_connections_active", "Current active connections", metrics.active_connections),
            ("connpool_connections_available", "Current available connections", metrics.available_connections),
            ("connpool_connections_created", "Connections created", metrics.connections_created),
            ("connpool_connections_destroyed", "Connections destroyed", metrics.connections_destroyed),
            ("connpool_validation_failures", "Validation failures", metrics.validation_failures),
            ("connpool_blocking_timeouts", "Checkouts that exceeded the block wait time", metrics.blocking_timeouts),
        ];
        for (name, help, value) in values {
            let gauge = IntGauge::with_opts(Opts::new(name, help).const_label("pool", pool_name))?;
            gauge.set(i64::try_from(value).unwrap_or(i64::MAX));
            registry.register(Box::new(gauge))?;
        }
        Ok(())
    }

    fn push_metric(output: &mut String, name: &str, help: &str, kind: &str, labels: &str, value: &str) {
        output.push_str(&format!("# HELP {} {}\n", name, help));
        output.push_str(&format!("# TYPE {} {}\n", name, kind));
        output.push_str(&format!("{}{{{}}} {}\n", name, labels, value));
    }

    fn format_labels(pool_name: &str, tags: Option<&HashMap<String, String>>) -> String {
        let mut labels = vec![format!("pool=\"{}\"", pool_name)];

        if let Some(tags) = tags {
            let mut sorted: Vec<_> = tags.iter().collect();
            sorted.sort();
            for (key, value) in sorted {
                labels.push(format!("{}=\"{}\"", key, value));
            }
        }

        labels.join(",")
    }
}

/// Internal metrics tracker
#[derive(Debug, Default)]
pub(crate) struct MetricsTracker {
    pub connections_created: AtomicUsize,
    pub connections_destroyed: AtomicUsize,
    pub total_checked_out: AtomicUsize,
    pub total_checked_in: AtomicUsize,
    pub creation_failures: AtomicUsize,
    pub activation_failures: AtomicUsize,
    pub validation_failures: AtomicUsize,
    pub passivation_failures: AtomicUsize,
    pub blocking_timeouts: AtomicUsize,
    pub connections_pruned: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_metrics(&self, active: usize, available: usize, max_pool_size: usize) -> PoolMetrics {
        let utilization = if max_pool_size > 0 {
            active as f64 / max_pool_size as f64
        } else {
            0.0
        };

        PoolMetrics {
            connections_created: self.connections_created.load(Ordering::Relaxed),
            connections_destroyed: self.connections_destroyed.load(Ordering::Relaxed),
            total_checked_out: self.total_checked_out.load(Ordering::Relaxed),
            total_checked_in: self.total_checked_in.load(Ordering::Relaxed),
            creation_failures: self.creation_failures.load(Ordering::Relaxed),
            activation_failures: self.activation_failures.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            passivation_failures: self.passivation_failures.load(Ordering::Relaxed),
            blocking_timeouts: self.blocking_timeouts.load(Ordering::Relaxed),
            connections_pruned: self.connections_pruned.load(Ordering::Relaxed),
            active_connections: active,
            available_connections: available,
            utilization,
            max_pool_size,
        }
    }
}
