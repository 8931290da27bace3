//! Error types for the resource pool

use std::time::Duration;

use thiserror::Error;

/// Boxed error carried through from caller-supplied code (resource factories
/// and resource shutdown).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Pool is closed")]
    Closed,

    #[error("Pool exhausted - all resources checked out and waiting is disabled")]
    Exhausted,

    #[error("No factory configured and no idle resource available")]
    NoFactory,

    #[error("Timed out after {0:?} waiting for a free resource")]
    WaitTimedOut(Duration),

    #[error("Pool has already been shut down")]
    AlreadyClosed,

    #[error("Resource factory failed")]
    Factory(#[source] BoxError),

    #[error("Resource shutdown failed")]
    Resource(#[source] BoxError),
}

pub type PoolResult<T> = Result<T, PoolError>;
