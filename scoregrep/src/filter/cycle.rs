use std::sync::{PoisonError, RwLock};

use super::accumulator::ScoreAccumulator;
use super::barrier::CycleBarrier;

/// State shared by the dispatcher and every worker for the life of one run.
///
/// Handed out as an `Arc` at pool construction. Only the dispatcher re-arms
/// it between cycles; workers only read the line, add to the score, and
/// report completion.
#[derive(Debug)]
pub struct CycleShared {
    pub barrier: CycleBarrier,
    pub scores: ScoreAccumulator,
    line: RwLock<String>,
}

impl CycleShared {
    pub fn new(workers: usize) -> Self {
        Self {
            barrier: CycleBarrier::new(workers),
            scores: ScoreAccumulator::new(),
            line: RwLock::new(String::new()),
        }
    }

    /// Re-arms the cycle state for `line`. Must run while every worker is
    /// parked at its gate.
    pub fn begin_cycle(&self, line: String) {
        self.scores.reset();
        self.barrier.reset_completion();
        *self.line.write().unwrap_or_else(PoisonError::into_inner) = line;
    }

    /// Drops the current line once the cycle's decision is made
    pub fn end_cycle(&self) {
        let mut line = self.line.write().unwrap_or_else(PoisonError::into_inner);
        *line = String::new();
    }

    /// Runs `f` against the current line under a shared borrow
    pub fn with_line<T>(&self, f: impl FnOnce(&str) -> T) -> T {
        let line = self.line.read().unwrap_or_else(PoisonError::into_inner);
        f(&line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_cycle_rearms_state() {
        let shared = CycleShared::new(1);
        shared.scores.add(9);
        shared.barrier.complete(false);

        shared.begin_cycle("next".to_string());
        assert_eq!(shared.scores.read(), 0);
        assert_eq!(shared.with_line(str::to_owned), "next");

        // Completion counter was zeroed too: one completion finishes the cycle
        shared.barrier.complete(false);
        assert!(shared.barrier.await_completion(1).is_ok());
    }

    #[test]
    fn test_end_cycle_releases_line() {
        let shared = CycleShared::new(1);
        shared.begin_cycle("abc".to_string());
        shared.end_cycle();
        assert_eq!(shared.with_line(str::len), 0);
    }
}
