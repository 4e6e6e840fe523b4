use std::sync::{Mutex, MutexGuard, PoisonError};

/// Shared per-cycle score total.
///
/// Workers call [`add`](Self::add) concurrently; the dispatcher calls
/// [`reset`](Self::reset) before releasing a cycle and [`read`](Self::read)
/// only after the barrier reports every worker done, so neither ever races
/// with an `add`.
#[derive(Debug, Default)]
pub struct ScoreAccumulator {
    total: Mutex<i64>,
}

impl ScoreAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zeros the total. Dispatcher only, between cycles.
    pub fn reset(&self) {
        *self.lock() = 0;
    }

    /// Adds one worker's weight. Saturates instead of overflowing.
    pub fn add(&self, weight: i64) {
        let mut total = self.lock();
        *total = total.saturating_add(weight);
    }

    /// Current total. Meaningful only once the cycle has completed.
    pub fn read(&self) -> i64 {
        *self.lock()
    }

    // A poisoned total is still a plain integer; nothing can be half-written
    fn lock(&self) -> MutexGuard<'_, i64> {
        self.total.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
