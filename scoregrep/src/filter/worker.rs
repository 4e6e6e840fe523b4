use std::sync::Arc;
use std::thread;
use tracing::{debug, trace};

use super::barrier::{CycleBarrier, GateSignal};
use super::cycle::CycleShared;
use super::matcher::LineScorer;
use crate::errors::{FilterError, FilterResult};
use crate::metrics::FilterMetrics;

/// Evaluates one weighted pattern against every line of the run.
///
/// Loop: wait at the start gate, exit if the stream has finished, otherwise
/// whole-line match the current line, add the weight on a match, report
/// completion, repeat.
#[derive(Debug)]
pub struct PatternWorker<M> {
    id: usize,
    matcher: M,
    shared: Arc<CycleShared>,
    metrics: FilterMetrics,
}

impl<M: LineScorer> PatternWorker<M> {
    pub fn new(
        id: usize,
        matcher: M,
        shared: Arc<CycleShared>,
        metrics: FilterMetrics,
    ) -> Self {
        Self {
            id,
            matcher,
            shared,
            metrics,
        }
    }

    /// Runs until the barrier is shut down. Returns the number of lines
    /// this worker evaluated.
    pub fn run(self) -> u64 {
        debug!(
            "Pattern worker #{} started for {:?}",
            self.id,
            self.matcher.label()
        );

        let mut evaluated = 0;
        while self.shared.barrier.wait_for_release(self.id) == GateSignal::Proceed {
            self.evaluate_current_line();
            evaluated += 1;
        }

        debug!(
            "Pattern worker #{} exiting after {} lines",
            self.id, evaluated
        );
        evaluated
    }

    fn evaluate_current_line(&self) {
        // Reports completion even if matching unwinds
        let _done = CompletionGuard {
            barrier: &self.shared.barrier,
        };

        if let Some(weight) = self.shared.with_line(|line| self.matcher.score(line)) {
            self.shared.scores.add(weight);
            self.metrics.record_match();
            trace!("Worker #{} matched, +{}", self.id, weight);
        }
    }
}

struct CompletionGuard<'a> {
    barrier: &'a CycleBarrier,
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        self.barrier.complete(thread::panicking());
    }
}

/// Outcome of stopping the pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolShutdown {
    pub joined: usize,
    pub panicked: usize,
}

/// The fixed set of worker threads for one run, one per pattern.
///
/// Threads are created once in [`spawn`](Self::spawn) and joined once in
/// [`shutdown_and_join`](Self::shutdown_and_join). Dropping a pool that was
/// not shut down does both, so an early return from the dispatcher never
/// leaves a worker blocked at its gate.
#[derive(Debug)]
pub struct WorkerPool {
    shared: Arc<CycleShared>,
    workers: Vec<thread::JoinHandle<u64>>,
    spawned: usize,
}

impl WorkerPool {
    pub fn spawn<M: LineScorer + Clone>(
        matchers: &[M],
        shared: Arc<CycleShared>,
        metrics: &FilterMetrics,
    ) -> FilterResult<Self> {
        debug_assert_eq!(matchers.len(), shared.barrier.worker_count());

        let mut pool = Self {
            shared: shared.clone(),
            workers: Vec::with_capacity(matchers.len()),
            spawned: 0,
        };

        for (id, matcher) in matchers.iter().enumerate() {
            let worker = PatternWorker::new(id, matcher.clone(), shared.clone(), metrics.clone());
            // On failure `pool` drops here, which stops the workers already running
            let handle = thread::Builder::new()
                .name(format!("pattern-worker-{}", id))
                .spawn(move || worker.run())
                .map_err(|source| FilterError::WorkerSpawn { id, source })?;
            pool.workers.push(handle);
            pool.spawned += 1;
        }

        debug!("Spawned {} pattern workers", pool.spawned);
        Ok(pool)
    }

    /// Number of threads started for this pool
    pub fn spawned(&self) -> usize {
        self.spawned
    }

    /// Raises the finished flag, wakes every worker, and waits for each one
    pub fn shutdown_and_join(&mut self) -> PoolShutdown {
        self.shared.barrier.shutdown();

        let mut report = PoolShutdown::default();
        for handle in self.workers.drain(..) {
            match handle.join() {
                Ok(lines) => trace!("Joined worker after {} lines", lines),
                Err(_) => report.panicked += 1,
            }
            report.joined += 1;
        }
        debug!(
            "Joined {} pattern workers ({} panicked)",
            report.joined, report.panicked
        );
        report
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.shutdown_and_join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PatternEntry;
    use crate::filter::matcher::{compile_entries, WeightedMatcher};

    fn matchers(entries: &[(&str, i64)]) -> Vec<WeightedMatcher> {
        let entries: Vec<_> = entries
            .iter()
            .map(|&(p, w)| PatternEntry::new(p, w))
            .collect();
        compile_entries(&entries, &FilterMetrics::new()).unwrap()
    }

    fn run_cycle(shared: &CycleShared, line: &str) -> i64 {
        shared.begin_cycle(line.to_string());
        shared.barrier.release_all();
        shared
            .barrier
            .await_completion(shared.barrier.worker_count())
            .unwrap();
        shared.scores.read()
    }

    #[test]
    fn test_pool_scores_lines() {
        let matchers = matchers(&[("^a.*", 3), (".*c$", 3), ("zzz", 100)]);
        let shared = Arc::new(CycleShared::new(matchers.len()));
        let mut pool = WorkerPool::spawn(&matchers, shared.clone(), &FilterMetrics::new()).unwrap();
        assert_eq!(pool.spawned(), 3);

        assert_eq!(run_cycle(&shared, "abc"), 6);
        assert_eq!(run_cycle(&shared, "ab"), 3);
        assert_eq!(run_cycle(&shared, "xc"), 3);
        assert_eq!(run_cycle(&shared, "zzz"), 100);
        assert_eq!(run_cycle(&shared, "nothing"), 0);

        let report = pool.shutdown_and_join();
        assert_eq!(report, PoolShutdown { joined: 3, panicked: 0 });
    }

    #[test]
    fn test_worker_records_matches() {
        let metrics = FilterMetrics::new();
        let matchers = matchers(&[("x", 1), ("x", 1)]);
        let shared = Arc::new(CycleShared::new(matchers.len()));
        let mut pool = WorkerPool::spawn(&matchers, shared.clone(), &metrics).unwrap();

        run_cycle(&shared, "x");
        run_cycle(&shared, "y");
        pool.shutdown_and_join();

        assert_eq!(metrics.get_stats().pattern_matches, 2);
    }

    #[test]
    fn test_drop_joins_workers() {
        let matchers = matchers(&[("a", 1), ("b", 2)]);
        let shared = Arc::new(CycleShared::new(matchers.len()));
        let pool = WorkerPool::spawn(&matchers, shared.clone(), &FilterMetrics::new()).unwrap();

        run_cycle(&shared, "a");
        drop(pool);

        assert!(shared.barrier.is_finished());
        // Only the test's handle remains once every worker has exited
        assert_eq!(Arc::strong_count(&shared), 1);
    }

    #[test]
    fn test_worker_run_returns_line_count() {
        let matchers = matchers(&[("a", 1)]);
        let shared = Arc::new(CycleShared::new(1));
        let worker = PatternWorker::new(0, matchers[0].clone(), shared.clone(), FilterMetrics::new());
        let handle = thread::spawn(move || worker.run());

        run_cycle(&shared, "a");
        run_cycle(&shared, "b");
        shared.barrier.shutdown();

        assert_eq!(handle.join().unwrap(), 2);
    }
}
