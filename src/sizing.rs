//! Pool sizing policies

/// How the pool reacts when no connection is available at checkout.
///
/// # Examples
///
/// ```
/// use esox_connpool::SizingPolicy;
///
/// // Strict: 10 live connections out of a max of 10, no more growth
/// assert!(!SizingPolicy::StrictLimit.may_create(10, 10, 10));
/// // Elastic: grows past max under load
/// assert!(SizingPolicy::Elastic.may_create(10, 10, 10));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SizingPolicy {
    /// Never exceed `max_pool_size`; block when exhausted.
    #[default]
    StrictLimit,

    /// Create connections past `max_pool_size` on demand; pruning shrinks
    /// the pool back afterwards.
    Elastic,
}

impl SizingPolicy {
    /// Whether a checkout miss should try to create a connection.
    ///
    /// Decided under the pool lock, before the creation lock is taken.
    pub fn may_create(&self, active: usize, _total: usize, max_pool_size: usize) -> bool {
        match self {
            SizingPolicy::StrictLimit => active < max_pool_size,
            SizingPolicy::Elastic => true,
        }
    }

    /// Whether a connection may be added to a pool currently holding `total`
    /// live connections. Checked again while holding the creation lock.
    pub fn may_commit(&self, total: usize, max_pool_size: usize) -> bool {
        match self {
            SizingPolicy::StrictLimit => total < max_pool_size,
            SizingPolicy::Elastic => true,
        }
    }
}
