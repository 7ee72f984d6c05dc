//! Lifecycle hooks run when connections change hands

use std::sync::Arc;

/// Prepares a connection before it is handed to a caller.
pub trait ConnectionActivator<C>: Send + Sync {
    fn activate(&self, conn: &mut C) -> bool;
}

/// Prepares a connection to sit idle in the pool.
pub trait ConnectionPassivator<C>: Send + Sync {
    fn passivate(&self, conn: &mut C) -> bool;
}

/// Liveness probe against an open connection.
pub trait ConnectionValidator<C>: Send + Sync {
    fn validate(&self, conn: &mut C) -> bool;
}

impl<C, F> ConnectionActivator<C> for F
where
    F: Fn(&mut C) -> bool + Send + Sync,
{
    fn activate(&self, conn: &mut C) -> bool {
        self(conn)
    }
}

impl<C, F> ConnectionPassivator<C> for F
where
    F: Fn(&mut C) -> bool + Send + Sync,
{
    fn passivate(&self, conn: &mut C) -> bool {
        self(conn)
    }
}

impl<C, F> ConnectionValidator<C> for F
where
    F: Fn(&mut C) -> bool + Send + Sync,
{
    fn validate(&self, conn: &mut C) -> bool {
        self(conn)
    }
}

/// The optional hooks of a pool. A missing hook always succeeds.
pub(crate) struct LifecycleHooks<C> {
    pub activator: Option<Arc<dyn ConnectionActivator<C>>>,
    pub passivator: Option<Arc<dyn ConnectionPassivator<C>>>,
    pub validator: Option<Arc<dyn ConnectionValidator<C>>>,
}

impl<C> Default for LifecycleHooks<C> {
    fn default() -> Self {
        Self {
            activator: None,
            passivator: None,
            validator: None,
        }
    }
}

impl<C> LifecycleHooks<C> {
    pub fn activate(&self, conn: &mut C) -> bool {
        self.activator.as_ref().is_none_or(|a| a.activate(conn))
    }

    pub fn passivate(&self, conn: &mut C) -> bool {
        self.passivator.as_ref().is_none_or(|p| p.passivate(conn))
    }

    pub fn validate(&self, conn: &mut C) -> bool {
        self.validator.as_ref().is_none_or(|v| v.validate(conn))
    }

    pub fn has_validator(&self) -> bool {
        self.validator.is_some()
    }
}
