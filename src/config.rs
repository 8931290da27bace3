//! Pool configuration options

use std::time::Duration;

/// Configuration for pool capacity, idle expiry, and saturation behavior
///
/// # Examples
///
/// ```
/// use repool::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::new()
///     .with_active(50)
///     .with_idle(10)
///     .with_idle_timeout(Duration::from_secs(300))
///     .with_wait(Duration::from_secs(5));
///
/// assert_eq!(config.active, 50);
/// assert_eq!(config.idle, 10);
/// assert!(config.wait);
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of resources that may exist at once, counting both
    /// idle and checked-out ones. Zero means unbounded.
    pub active: usize,

    /// Maximum number of idle resources kept cached for reuse. Returning a
    /// resource beyond this limit evicts the least recently returned one.
    pub idle: usize,

    /// How long a resource may sit idle before it is evicted. Zero means
    /// idle resources never expire.
    pub idle_timeout: Duration,

    /// Whether `get` blocks when the pool is saturated instead of failing
    /// with [`PoolError::Exhausted`](crate::PoolError::Exhausted).
    pub wait: bool,

    /// Upper bound on how long a saturated `get` blocks. Zero means no
    /// pool-imposed bound (callers may still wrap `get` in their own
    /// timeout).
    pub wait_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            active: 0,
            idle: 8,
            idle_timeout: Duration::ZERO,
            wait: false,
            wait_timeout: Duration::ZERO,
        }
    }
}

impl PoolConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of live resources (0 = unbounded)
    ///
    /// # Examples
    ///
    /// ```
    /// use repool::PoolConfig;
    ///
    /// let config = PoolConfig::new().with_active(16);
    /// assert_eq!(config.active, 16);
    /// ```
    pub fn with_active(mut self, active: usize) -> Self {
        self.active = active;
        self
    }

    /// Set the maximum number of cached idle resources
    pub fn with_idle(mut self, idle: usize) -> Self {
        self.idle = idle;
        self
    }

    /// Set the idle expiry age (0 = never expire)
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Block on saturation, for at most `timeout` (0 = no bound)
    ///
    /// # Examples
    ///
    /// ```
    /// use repool::PoolConfig;
    /// use std::time::Duration;
    ///
    /// let config = PoolConfig::new().with_wait(Duration::from_secs(30));
    /// assert!(config.wait);
    /// assert_eq!(config.wait_timeout, Duration::from_secs(30));
    /// ```
    pub fn with_wait(mut self, timeout: Duration) -> Self {
        self.wait = true;
        self.wait_timeout = timeout;
        self
    }
}
