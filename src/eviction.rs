//! Background reaper evicting idle resources past their age limit

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::trace;

use crate::pool::PoolInner;
use crate::resource::PoolResource;

/// Floor on the reaper tick so a misconfigured tiny `idle_timeout` cannot
/// turn the task into a busy loop.
const MIN_REAP_TICK: Duration = Duration::from_millis(100);

/// Re-check cadence while idle expiry is disabled. The task still has to
/// notice a `reload` that enables it, shutdown, and pool drop.
const DISABLED_TICK: Duration = Duration::from_secs(60);

/// Spawn the reaper for a pool. The task holds only a weak handle to the
/// pool state, so it cannot keep a dropped pool alive; it exits once the
/// pool is closed or every handle is gone.
pub(crate) fn spawn_reaper<T: PoolResource>(inner: &Arc<PoolInner<T>>) {
    let weak = Arc::downgrade(inner);
    let wake = Arc::clone(&inner.reap);
    tokio::spawn(run(weak, wake));
}

async fn run<T: PoolResource>(weak: Weak<PoolInner<T>>, wake: Arc<Notify>) {
    loop {
        let tick = {
            let Some(inner) = weak.upgrade() else { return };
            let state = inner.state.lock();
            if state.closed {
                return;
            }
            if state.config.idle_timeout.is_zero() {
                DISABLED_TICK
            } else {
                state.config.idle_timeout.max(MIN_REAP_TICK)
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(tick) => {}
            _ = wake.notified() => {}
        }

        if !reap_pass(&weak).await {
            return;
        }
    }
}

/// One scan from the stale end of the idle list, stopping at the first
/// fresh item (recency order makes staleness monotonic from the back).
/// Returns false once the pool is closed or gone.
async fn reap_pass<T: PoolResource>(weak: &Weak<PoolInner<T>>) -> bool {
    loop {
        let Some(inner) = weak.upgrade() else {
            return false;
        };
        let resource = {
            let mut state = inner.state.lock();
            if state.closed {
                return false;
            }
            let timeout = state.config.idle_timeout;
            if timeout.is_zero() {
                return true;
            }
            let stale = state
                .idle
                .back()
                .is_some_and(|item| item.expired(timeout));
            if !stale {
                return true;
            }
            let Some(item) = state.idle.pop_back() else {
                return true;
            };
            state.active = state.active.saturating_sub(1);
            item.resource
        };

        // bookkeeping is done; the shutdown outcome cannot corrupt it
        inner.freed.notify_one();
        trace!("reaper evicting expired idle resource");
        let _ = resource.shutdown().await;
    }
}
