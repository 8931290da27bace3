//! The resource capability contract and factory plumbing

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::BoxError;

/// A value the pool can manage.
///
/// The pool never inspects a resource beyond this single capability: it must
/// be able to release whatever underlying handle the resource wraps. The
/// call consumes the resource, so the pool invokes it at most once per
/// instance. Implementations should not block indefinitely; the pool does
/// not impose its own timeout on the call.
///
/// # Examples
///
/// ```
/// use repool::{BoxError, PoolResource};
/// use async_trait::async_trait;
///
/// struct Conn;
///
/// #[async_trait]
/// impl PoolResource for Conn {
///     async fn shutdown(self) -> Result<(), BoxError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait PoolResource: Send + 'static {
    /// Release the underlying handle.
    async fn shutdown(self) -> Result<(), BoxError>;
}

pub(crate) type FactoryFuture<T> = Pin<Box<dyn Future<Output = Result<T, BoxError>> + Send>>;

/// Stored construction function. Cloned out of the pool before invocation so
/// the pool lock is never held while caller code runs; must tolerate
/// concurrent calls from multiple tasks.
pub(crate) type Factory<T> = Arc<dyn Fn() -> FactoryFuture<T> + Send + Sync>;

pub(crate) fn boxed_factory<T, F, Fut>(factory: F) -> Factory<T>
where
    T: PoolResource,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
{
    Arc::new(move || -> FactoryFuture<T> { Box::pin(factory()) })
}
