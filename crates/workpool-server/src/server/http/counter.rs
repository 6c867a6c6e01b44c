use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A cheaply cloneable handle on a shared request count.
///
/// Every clone observes and increments the same value. The counter is handed
/// to the router as state instead of living in a process-wide static, so each
/// server (and each test) gets its own.
#[derive(Clone, Debug, Default)]
pub struct RequestCounter {
    count: Arc<AtomicU64>,
}

impl RequestCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one request and returns its 1-based sequence number.
    pub fn increment(&self) -> u64 {
        self.count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn value(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}
