//! # repool
//!
//! Concurrency-safe pool for expensive-to-create, explicitly shutdownable
//! resources: connections, sessions, handles. Idle resources are cached in
//! recency order and reused warm-first, new ones are built on demand up to a
//! configurable ceiling, and a background reaper evicts the ones that sit
//! idle too long.
//!
//! ## Features
//!
//! - Bounded active count with an ordered idle cache (most recently
//!   returned resource is handed out first)
//! - Idle expiry, enforced both opportunistically on `get` and by a
//!   background reaper task
//! - Optional bounded waiting when the pool is saturated
//! - Graceful, idempotent shutdown that drains the idle list
//! - Runtime configuration reload
//!
//! ## Quick Start
//!
//! ```
//! use repool::{BoxError, Pool, PoolConfig, PoolResource};
//! use async_trait::async_trait;
//!
//! struct Conn;
//!
//! #[async_trait]
//! impl PoolResource for Conn {
//!     async fn shutdown(self) -> Result<(), BoxError> {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), BoxError> {
//! let pool = Pool::with_factory(
//!     || async { Ok::<_, BoxError>(Conn) },
//!     PoolConfig::new().with_active(8).with_idle(4),
//! );
//!
//! let conn = pool.get().await?;
//! // ... use the connection ...
//! pool.put(conn, false).await?;
//!
//! pool.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod errors;
mod eviction;
mod pool;
mod resource;

pub use config::PoolConfig;
pub use errors::{BoxError, PoolError, PoolResult};
pub use pool::Pool;
pub use resource::PoolResource;
