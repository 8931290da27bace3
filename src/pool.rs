//! Core resource pool implementation

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, trace};

use crate::config::PoolConfig;
use crate::errors::{BoxError, PoolError, PoolResult};
use crate::eviction;
use crate::resource::{Factory, PoolResource, boxed_factory};

/// An idle list entry: a cached resource stamped with the moment it was
/// returned to the pool.
pub(crate) struct Idle<T> {
    pub(crate) resource: T,
    returned_at: Instant,
}

impl<T> Idle<T> {
    fn new(resource: T) -> Self {
        Self {
            resource,
            returned_at: Instant::now(),
        }
    }

    /// A zero timeout means idle resources never expire.
    pub(crate) fn expired(&self, timeout: Duration) -> bool {
        !timeout.is_zero() && self.returned_at.elapsed() > timeout
    }
}

/// Mutable pool state. Every field is guarded by the one lock in
/// [`PoolInner`]; the lock is never held across an `.await`.
pub(crate) struct PoolState<T> {
    pub(crate) config: PoolConfig,
    /// Front = most recently returned. `get` consumes from the front so a
    /// small working set stays warm; the reaper evicts from the back where
    /// staleness is monotonic.
    pub(crate) idle: VecDeque<Idle<T>>,
    /// Resources that exist and have not been shut down: every idle entry
    /// plus every checked-out one.
    pub(crate) active: usize,
    /// Flips to true exactly once, on shutdown.
    pub(crate) closed: bool,
}

pub(crate) struct PoolInner<T> {
    pub(crate) state: Mutex<PoolState<T>>,
    factory: Option<Factory<T>>,
    /// Wakes at most one blocked `get` per freed slot. A notification sent
    /// with no waiter registered is stored as a single permit, so the
    /// release/wait race cannot lose the signal outright; ordering among
    /// waiters is best-effort, not FIFO.
    pub(crate) freed: Notify,
    /// Reaper wake-up; also signalled on reload and shutdown.
    pub(crate) reap: Arc<Notify>,
}

impl<T> Drop for PoolInner<T> {
    fn drop(&mut self) {
        // let the reaper notice the pool is gone without waiting a full tick
        self.reap.notify_one();
    }
}

/// Outcome of one locked pass over the pool state.
enum Acquire<T> {
    /// A warm idle resource, ready to hand out.
    Ready(T),
    /// An expired idle resource, already removed from the bookkeeping; shut
    /// it down and scan again.
    Stale(T),
    /// A capacity slot was claimed; run the factory.
    Create(Factory<T>, CapacityClaim<T>),
    /// Saturated and configured to wait.
    Wait,
}

/// A claimed-but-unfilled capacity increment. Dropping the claim without
/// committing it (factory failure, or the `get` future being dropped
/// mid-construction) releases the slot and signals a waiter, so cancellation
/// cannot leak `active`.
struct CapacityClaim<T> {
    inner: Arc<PoolInner<T>>,
    armed: bool,
}

impl<T> CapacityClaim<T> {
    fn new(inner: Arc<PoolInner<T>>) -> Self {
        Self { inner, armed: true }
    }

    /// The slot is now filled by a live resource; keep the increment.
    fn commit(mut self) {
        self.armed = false;
    }
}

impl<T> Drop for CapacityClaim<T> {
    fn drop(&mut self) {
        if self.armed {
            {
                let mut state = self.inner.state.lock();
                state.active = state.active.saturating_sub(1);
            }
            self.inner.freed.notify_one();
        }
    }
}

/// Concurrency-safe pool of reusable, shutdownable resources.
///
/// Cloning the pool is cheap and yields another handle to the same state.
/// Must be created within a Tokio runtime: construction spawns the
/// background reaper task.
pub struct Pool<T: PoolResource> {
    inner: Arc<PoolInner<T>>,
}

impl<T: PoolResource> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: PoolResource> Pool<T> {
    /// Create a pool with no factory. `get` can only fail with
    /// [`PoolError::NoFactory`] until one is supplied via a factory-bearing
    /// constructor; useful mostly for wiring tests.
    pub fn new(config: PoolConfig) -> Self {
        Self::build(None, config)
    }

    /// Create a pool that constructs resources on demand.
    ///
    /// The factory is invoked at most once per successful capacity
    /// increment and may be called concurrently from multiple tasks. A
    /// factory error is propagated to the `get` caller verbatim.
    pub fn with_factory<F, Fut>(factory: F, config: PoolConfig) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        Self::build(Some(boxed_factory(factory)), config)
    }

    fn build(factory: Option<Factory<T>>, config: PoolConfig) -> Self {
        let inner = Arc::new(PoolInner {
            state: Mutex::new(PoolState {
                config,
                idle: VecDeque::new(),
                active: 0,
                closed: false,
            }),
            factory,
            freed: Notify::new(),
            reap: Arc::new(Notify::new()),
        });
        eviction::spawn_reaper(&inner);
        Self { inner }
    }

    /// Acquire a resource: reuse the most recently returned idle one, build
    /// a new one if under the `active` ceiling, or wait for a slot.
    ///
    /// Expired idle resources encountered on the way are shut down and
    /// skipped. When the pool is saturated and waiting is disabled
    /// (`wait == false` and `wait_timeout` zero) this fails immediately with
    /// [`PoolError::Exhausted`]; otherwise it blocks until a slot frees up,
    /// bounded by `wait_timeout` when non-zero. Callers wanting their own
    /// deadline can wrap the call in `tokio::time::timeout`; dropping the
    /// returned future at any point is safe and releases anything claimed.
    ///
    /// Ownership of the resource transfers to the caller until [`put`]
    /// hands it back. A caller that drops a resource without `put` leaks
    /// one unit of `active` capacity.
    ///
    /// [`put`]: Pool::put
    pub async fn get(&self) -> PoolResult<T> {
        let wait_timeout = self.inner.state.lock().config.wait_timeout;
        let deadline = (!wait_timeout.is_zero()).then(|| Instant::now() + wait_timeout);

        loop {
            match self.try_acquire()? {
                Acquire::Ready(resource) => return Ok(resource),
                Acquire::Stale(resource) => {
                    self.inner.freed.notify_one();
                    trace!("discarding expired idle resource");
                    let _ = resource.shutdown().await;
                }
                Acquire::Create(factory, claim) => return self.create(factory, claim).await,
                Acquire::Wait => {
                    trace!("pool saturated, waiting for a free slot");
                    match deadline {
                        Some(at) => {
                            if timeout_at(at, self.inner.freed.notified()).await.is_err() {
                                return Err(PoolError::WaitTimedOut(wait_timeout));
                            }
                        }
                        None => self.inner.freed.notified().await,
                    }
                }
            }
        }
    }

    /// One pass over the state under the lock. Any follow-up that can block
    /// (factory, shutdown, waiting) happens after the lock is released.
    fn try_acquire(&self) -> PoolResult<Acquire<T>> {
        let mut state = self.inner.state.lock();
        if state.closed {
            return Err(PoolError::Closed);
        }

        let idle_timeout = state.config.idle_timeout;
        if let Some(item) = state.idle.pop_front() {
            if !item.expired(idle_timeout) {
                trace!(idle = state.idle.len(), "reusing idle resource");
                return Ok(Acquire::Ready(item.resource));
            }
            state.active = state.active.saturating_sub(1);
            return Ok(Acquire::Stale(item.resource));
        }

        if state.config.active == 0 || state.active < state.config.active {
            let Some(factory) = self.inner.factory.clone() else {
                return Err(PoolError::NoFactory);
            };
            state.active += 1;
            return Ok(Acquire::Create(
                factory,
                CapacityClaim::new(Arc::clone(&self.inner)),
            ));
        }

        if !state.config.wait && state.config.wait_timeout.is_zero() {
            return Err(PoolError::Exhausted);
        }
        Ok(Acquire::Wait)
    }

    async fn create(&self, factory: Factory<T>, claim: CapacityClaim<T>) -> PoolResult<T> {
        match factory().await {
            Ok(resource) => {
                claim.commit();
                debug!("created new pooled resource");
                Ok(resource)
            }
            // the claim drops here, releasing the slot and waking a waiter
            Err(err) => Err(PoolError::Factory(err)),
        }
    }

    /// Return a resource to the pool.
    ///
    /// While the pool is open and `force_close` is false the resource goes
    /// to the front of the idle list; if that pushes the list past
    /// `config.idle`, the oldest idle resource is evicted and shut down.
    /// With `force_close`, or once the pool is closed, the passed resource
    /// itself is shut down instead; returning to a closed pool is expected
    /// during teardown and is not an error. An error from the evicted
    /// resource's shutdown is reported to this caller; pool bookkeeping has
    /// already completed by then.
    pub async fn put(&self, resource: T, force_close: bool) -> PoolResult<()> {
        let doomed = {
            let mut state = self.inner.state.lock();
            if state.closed || force_close {
                state.active = state.active.saturating_sub(1);
                Some(resource)
            } else {
                state.idle.push_front(Idle::new(resource));
                if state.idle.len() > state.config.idle {
                    state.active = state.active.saturating_sub(1);
                    state.idle.pop_back().map(|item| item.resource)
                } else {
                    None
                }
            }
        };

        self.inner.freed.notify_one();
        match doomed {
            Some(resource) => {
                trace!("closing returned resource");
                resource.shutdown().await.map_err(PoolError::Resource)
            }
            None => Ok(()),
        }
    }

    /// Shut the pool down: close every idle resource and refuse further
    /// `get`s. Resources currently checked out are not touched; returning
    /// them through [`put`](Pool::put) closes them.
    ///
    /// Only the first call performs teardown; later calls fail with
    /// [`PoolError::AlreadyClosed`] without re-running it. Errors from
    /// individual resource shutdowns are logged and do not fail the call.
    pub async fn shutdown(&self) -> PoolResult<()> {
        let drained: Vec<T> = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(PoolError::AlreadyClosed);
            }
            state.closed = true;
            let drained: Vec<T> = state.idle.drain(..).map(|item| item.resource).collect();
            state.active = state.active.saturating_sub(drained.len());
            drained
        };

        // unblock every waiter so they observe the closed flag, and let the
        // reaper exit without waiting out its tick
        self.inner.freed.notify_waiters();
        self.inner.reap.notify_one();

        debug!(drained = drained.len(), "shutting down pool");
        for resource in drained {
            if let Err(err) = resource.shutdown().await {
                debug!(error = %err, "resource shutdown failed during pool drain");
            }
        }
        Ok(())
    }

    /// Replace the configuration. Takes effect immediately for new `get`s;
    /// the reaper is nudged so a shortened `idle_timeout` is applied without
    /// waiting out the previous tick. Idle resources beyond a lowered `idle`
    /// cap are evicted lazily as they are touched.
    pub fn reload(&self, config: PoolConfig) {
        {
            let mut state = self.inner.state.lock();
            state.config = config;
        }
        self.inner.reap.notify_one();
        // capacity may have grown; let a blocked get re-check
        self.inner.freed.notify_one();
    }

    /// Pre-create up to `count` idle resources, stopping early at the
    /// `idle` or `active` cap.
    pub async fn warmup(&self, count: usize) -> PoolResult<()> {
        for _ in 0..count {
            let (factory, claim) = {
                let mut state = self.inner.state.lock();
                if state.closed {
                    return Err(PoolError::Closed);
                }
                if state.idle.len() >= state.config.idle {
                    break;
                }
                if state.config.active != 0 && state.active >= state.config.active {
                    break;
                }
                let Some(factory) = self.inner.factory.clone() else {
                    return Err(PoolError::NoFactory);
                };
                state.active += 1;
                (factory, CapacityClaim::new(Arc::clone(&self.inner)))
            };

            let resource = factory().await.map_err(PoolError::Factory)?;

            let doomed = {
                let mut state = self.inner.state.lock();
                if state.closed || state.idle.len() >= state.config.idle {
                    // raced with shutdown or a concurrent fill
                    Some(resource)
                } else {
                    state.idle.push_front(Idle::new(resource));
                    None
                }
            };
            match doomed {
                Some(resource) => {
                    drop(claim);
                    let _ = resource.shutdown().await;
                    break;
                }
                None => claim.commit(),
            }
        }
        Ok(())
    }

    /// Number of live resources: idle plus checked out.
    pub fn active_count(&self) -> usize {
        self.inner.state.lock().active
    }

    /// Number of cached idle resources.
    pub fn idle_count(&self) -> usize {
        self.inner.state.lock().idle.len()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }
}
