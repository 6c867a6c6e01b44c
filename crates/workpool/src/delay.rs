use core::time::Duration;
use rand::{Rng, rng};
use std::sync::Arc;

/// A source of per-task processing delays.
///
/// Workers ask the strategy for a fresh delay before each task and sleep for
/// that long to simulate variable-latency work. This abstraction allows you to
/// plug in a random source in production and a deterministic one in tests.
///
/// # Example
/// ```
/// use core::time::Duration;
/// use workpool::DelayStrategy;
///
/// struct Instant;
/// impl DelayStrategy for Instant {
///     fn next_delay(&self) -> Duration {
///         Duration::ZERO
///     }
/// }
///
/// assert_eq!(Instant.next_delay(), Duration::ZERO);
/// ```
pub trait DelayStrategy: Send + Sync + 'static {
    /// Returns how long the next task should take.
    fn next_delay(&self) -> Duration;
}

impl<D: DelayStrategy + ?Sized> DelayStrategy for Arc<D> {
    fn next_delay(&self) -> Duration {
        (**self).next_delay()
    }
}

/// A delay drawn uniformly from `[0, max)` with millisecond resolution.
///
/// Uses the thread-local RNG (`rand::rng()`) on each call, so the strategy
/// itself holds no generator and may be shared freely across workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformDelay {
    max: Duration,
}

impl UniformDelay {
    pub const fn new(max: Duration) -> Self {
        Self { max }
    }

    pub const fn max(&self) -> Duration {
        self.max
    }
}

impl Default for UniformDelay {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl DelayStrategy for UniformDelay {
    fn next_delay(&self) -> Duration {
        let max_ms = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng().random_range(0..max_ms))
    }
}

/// A constant delay. Useful for deterministic tests and benchmarks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FixedDelay(pub Duration);

impl DelayStrategy for FixedDelay {
    fn next_delay(&self) -> Duration {
        self.0
    }
}
