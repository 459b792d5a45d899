use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Controllable wall clock for record creation timestamps.
///
/// Passed to the vault via `with_time_provider()`. Independent of the
/// tokio clock, which the runner pauses for deferred refreshes.
#[derive(Clone)]
pub struct MockClock {
    current: Arc<AtomicI64>,
}

impl MockClock {
    /// Creates a time provider function suitable for passing to the vault.
    pub fn as_provider(&self) -> impl Fn() -> i64 + Send + Sync + 'static {
        let current = self.current.clone();
        move || current.load(Ordering::SeqCst)
    }
}

impl MockClock {
    /// Create a clock fixed at 2024-05-01T10:00:00Z
    pub fn new() -> Self {
        Self::at(1_714_557_600)
    }

    /// Create a clock fixed at a Unix timestamp
    pub fn at(secs: i64) -> Self {
        Self {
            current: Arc::new(AtomicI64::new(secs)),
        }
    }

    /// Current Unix timestamp
    pub fn now(&self) -> i64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        self.current
            .fetch_add(duration.as_secs() as i64, Ordering::SeqCst);
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}
