//! Pool configuration options

use crate::errors::{PoolError, PoolResult};
use std::time::Duration;

/// Configuration for connection pool sizing and validation
///
/// The pool freezes its configuration when it is initialized; after that
/// every `set_*` call fails with [`PoolError::ConfigFrozen`].
///
/// # Examples
///
/// ```
/// use esox_connpool::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::new()
///     .with_min_pool_size(2)
///     .with_max_pool_size(20)
///     .with_validate_periodically(true)
///     .with_validate_period(Duration::from_secs(60));
///
/// assert_eq!(config.min_pool_size(), 2);
/// assert_eq!(config.max_pool_size(), 20);
/// assert!(config.is_validation_enabled());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolConfig {
    min_pool_size: usize,
    max_pool_size: usize,
    validate_on_check_in: bool,
    validate_on_check_out: bool,
    validate_periodically: bool,
    validate_period: Duration,
    #[cfg_attr(feature = "serde", serde(skip))]
    frozen: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_pool_size: 3,
            max_pool_size: 10,
            validate_on_check_in: false,
            validate_on_check_out: false,
            validate_periodically: false,
            validate_period: Duration::from_secs(30 * 60),
            frozen: false,
        }
    }
}

impl PoolConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_pool_size(mut self, size: usize) -> Self {
        self.min_pool_size = size;
        self
    }

    pub fn with_max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    pub fn with_validate_on_check_in(mut self, enabled: bool) -> Self {
        self.validate_on_check_in = enabled;
        self
    }

    pub fn with_validate_on_check_out(mut self, enabled: bool) -> Self {
        self.validate_on_check_out = enabled;
        self
    }

    pub fn with_validate_periodically(mut self, enabled: bool) -> Self {
        self.validate_periodically = enabled;
        self
    }

    /// Set how often the background task validates idle connections
    pub fn with_validate_period(mut self, period: Duration) -> Self {
        self.validate_period = period;
        self
    }

    pub fn min_pool_size(&self) -> usize {
        self.min_pool_size
    }

    pub fn max_pool_size(&self) -> usize {
        self.max_pool_size
    }

    pub fn validate_on_check_in(&self) -> bool {
        self.validate_on_check_in
    }

    pub fn validate_on_check_out(&self) -> bool {
        self.validate_on_check_out
    }

    pub fn validate_periodically(&self) -> bool {
        self.validate_periodically
    }

    pub fn validate_period(&self) -> Duration {
        self.validate_period
    }

    /// Whether any of the three validation flags is set
    pub fn is_validation_enabled(&self) -> bool {
        self.validate_on_check_in || self.validate_on_check_out || self.validate_periodically
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn set_min_pool_size(&mut self, size: usize) -> PoolResult<()> {
        self.check_mutable()?;
        self.min_pool_size = size;
        Ok(())
    }

    pub fn set_max_pool_size(&mut self, size: usize) -> PoolResult<()> {
        self.check_mutable()?;
        self.max_pool_size = size;
        Ok(())
    }

    pub fn set_validate_on_check_in(&mut self, enabled: bool) -> PoolResult<()> {
        self.check_mutable()?;
        self.validate_on_check_in = enabled;
        Ok(())
    }

    pub fn set_validate_on_check_out(&mut self, enabled: bool) -> PoolResult<()> {
        self.check_mutable()?;
        self.validate_on_check_out = enabled;
        Ok(())
    }

    pub fn set_validate_periodically(&mut self, enabled: bool) -> PoolResult<()> {
        self.check_mutable()?;
        self.validate_periodically = enabled;
        Ok(())
    }

    pub fn set_validate_period(&mut self, period: Duration) -> PoolResult<()> {
        self.check_mutable()?;
        self.validate_period = period;
        Ok(())
    }

    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
    }

    fn check_mutable(&self) -> PoolResult<()> {
        if self.frozen {
            return Err(PoolError::ConfigFrozen);
        }
        Ok(())
    }
}
